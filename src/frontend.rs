use axum::{extract::State, response::Html, routing::get, Router};
use serde_json::Value;
use tracing::instrument;

use crate::{
    auth::extractors::MaybeCaller,
    error::ApiError,
    format::{item_value, Format},
    state::AppState,
    users::handlers::present,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(homepage))
}

/// Makes a JSON document safe to inline in a `<script>` element. `<` only
/// occurs inside JSON strings, where `\u003c` decodes to the same text.
fn script_safe(json: &str) -> String {
    json.replace('<', "\\u003c")
}

fn page(user_json: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Cheese Whiz</title>
</head>
<body>
    <div id="app"></div>
    <script>
        window.user = {user_json};
    </script>
</body>
</html>
"#
    )
}

#[instrument(skip(state, caller))]
pub async fn homepage(State(state): State<AppState>, MaybeCaller(caller): MaybeCaller) -> Result<Html<String>, ApiError> {
    let user = match &caller {
        Some(user) => item_value(Format::JsonLd, &present(state.repo.as_ref(), caller.as_ref(), user).await?),
        None => Value::Null,
    };
    Ok(Html(page(&script_safe(&user.to_string()))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markup_in_values_is_escaped() {
        let user = serde_json::json!({ "username": "</script><!--<b>" });
        let escaped = script_safe(&user.to_string());
        assert!(!escaped.contains('<'));
        assert!(escaped.contains(r#"\u003c/script>\u003c!--\u003cb>"#));

        let decoded: Value = serde_json::from_str(&escaped).unwrap();
        assert_eq!(decoded, user);

        let html = page(&escaped);
        assert_eq!(html.matches("</script>").count(), 1);
        assert!(!html.contains("<!--"));
    }

    #[test]
    fn anonymous_page_embeds_null() {
        assert!(page("null").contains("window.user = null;"));
    }
}
