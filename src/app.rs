use std::net::SocketAddr;
use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::state::AppState;
use crate::{auth, cheeses, frontend, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest("/api",
              Router::new()
                  .merge(auth::router())
                  .merge(users::router())
                  .merge(cheeses::router())
                  .route("/health", get(|| async { "ok" }))
        )
        .merge(frontend::router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
        .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::access::EDIT_LISTING_DENIED;
    use crate::auth::jwt::JwtKeys;
    use crate::users::model::{NewUser, User, ROLE_ADMIN};
    use axum::extract::FromRef;

    struct Harness {
        state: AppState,
        app: Router,
    }

    impl Harness {
        fn new() -> Self {
            let state = AppState::fake();
            let app = build_app(state.clone());
            Self { state, app }
        }

        async fn user(&self, name: &str, roles: &[&str]) -> (User, String) {
            let user = self
                .state
                .repo
                .insert_user(NewUser {
                    email: format!("{name}@example.com"),
                    username: name.into(),
                    password_hash: crate::auth::password::hash_password("secret").unwrap(),
                    phone_number: Some("555-0100".into()),
                    roles: roles.iter().map(|r| r.to_string()).collect(),
                })
                .await
                .unwrap();
            let token = JwtKeys::from_ref(&self.state).sign(user.id).unwrap();
            (user, token)
        }

        async fn call(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, String) {
            let mut req = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::ACCEPT, "application/ld+json");
            if let Some(t) = token {
                req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
            }
            let req = match body {
                Some(b) => req
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(b.to_string())),
                None => req.body(Body::empty()),
            }
            .unwrap();

            let res = self.app.clone().oneshot(req).await.unwrap();
            let status = res.status();
            let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
            (status, String::from_utf8(bytes.to_vec()).unwrap())
        }
    }

    fn parse(body: &str) -> Value {
        serde_json::from_str(body).unwrap()
    }

    #[tokio::test]
    async fn health() {
        let h = Harness::new();
        let (status, body) = h.call(Method::GET, "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn register_then_login() {
        let h = Harness::new();
        let (status, body) = h
            .call(
                Method::POST,
                "/api/users",
                None,
                Some(json!({"email": "cheese@example.com", "username": "cheesehead", "password": "brie"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(!body.contains("password"));
        assert!(!body.contains("brie"));
        let v = parse(&body);
        assert_eq!(v["@type"], "User");
        assert_eq!(v["username"], "cheesehead");
        let iri = v["@id"].as_str().unwrap().to_string();

        let (status, body) = h
            .call(
                Method::POST,
                "/api/login",
                None,
                Some(json!({"email": "cheese@example.com", "password": "brie"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let v = parse(&body);
        assert_eq!(v["user"], iri);
        assert!(v["token"].as_str().is_some_and(|t| !t.is_empty()));

        let (status, _) = h
            .call(
                Method::POST,
                "/api/login",
                None,
                Some(json!({"email": "cheese@example.com", "password": "gouda"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn anonymous_create_is_401() {
        let h = Harness::new();
        let (status, body) = h
            .call(
                Method::POST,
                "/api/cheeses",
                None,
                Some(json!({"title": "Brie", "description": "soft", "price": 1000})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(parse(&body)["title"], "An error occurred");
    }

    #[tokio::test]
    async fn foreign_owner_is_422() {
        let h = Harness::new();
        let (_, token) = h.user("alice", &[]).await;
        let (bob, _) = h.user("bob", &[]).await;
        let (status, body) = h
            .call(
                Method::POST,
                "/api/cheeses",
                Some(&token),
                Some(json!({"title": "Brie", "description": "soft", "price": 1000, "owner": bob.iri()})),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let v = parse(&body);
        assert_eq!(v["violations"][0]["propertyPath"], "owner");
    }

    #[tokio::test]
    async fn non_owner_put_is_403() {
        let h = Harness::new();
        let (_, alice) = h.user("alice", &[]).await;
        let (_, bob) = h.user("bob", &[]).await;
        let (status, body) = h
            .call(
                Method::POST,
                "/api/cheeses",
                Some(&alice),
                Some(json!({"title": "Brie", "description": "soft", "price": 1000})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let iri = parse(&body)["@id"].as_str().unwrap().to_string();

        let (status, body) = h
            .call(Method::PUT, &iri, Some(&bob), Some(json!({"title": "Mine"})))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(parse(&body)["detail"], EDIT_LISTING_DENIED);

        let (status, _) = h
            .call(Method::PUT, &iri, Some(&alice), Some(json!({"title": "Brie de Meaux"})))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn published_listings_show_on_owner() {
        let h = Harness::new();
        let (alice, token) = h.user("alice", &[]).await;
        let (_, viewer) = h.user("bob", &[]).await;
        let (_, body) = h
            .call(
                Method::POST,
                "/api/cheeses",
                Some(&token),
                Some(json!({"title": "Brie", "description": "soft", "price": 1000})),
            )
            .await;
        let cheese = parse(&body)["@id"].as_str().unwrap().to_string();

        let (status, body) = h.call(Method::GET, &alice.iri(), Some(&viewer), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(parse(&body)["cheeseListings"], json!([]));

        let (status, _) = h
            .call(Method::PUT, &cheese, Some(&token), Some(json!({"isPublished": true})))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = h.call(Method::GET, &alice.iri(), Some(&viewer), None).await;
        let v = parse(&body);
        assert_eq!(v["cheeseListings"][0]["@id"], cheese);
        assert_eq!(v["cheeseListings"][0]["title"], "Brie");
        assert!(v.get("phoneNumber").is_none());

        let (_, body) = h.call(Method::GET, &alice.iri(), Some(&token), None).await;
        assert_eq!(parse(&body)["phoneNumber"], "555-0100");
    }

    #[tokio::test]
    async fn huge_page_is_empty() {
        let h = Harness::new();
        let (status, body) = h
            .call(Method::GET, "/api/cheeses?page=9223372036854775807", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let v = parse(&body);
        assert_eq!(v["hydra:member"], json!([]));
        assert_eq!(v["hydra:totalItems"], 0);
    }

    #[tokio::test]
    async fn mistyped_body_gets_error_document() {
        let h = Harness::new();
        let (status, body) = h
            .call(
                Method::POST,
                "/api/users",
                None,
                Some(json!({"email": "a@example.com", "username": "alice", "password": "x", "phoneNumber": 5})),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let v = parse(&body);
        assert_eq!(v["title"], "An error occurred");
        assert!(v["detail"].as_str().unwrap().contains("phoneNumber"));

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/cheeses")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = h.app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(parse(std::str::from_utf8(&bytes).unwrap())["title"], "An error occurred");
    }

    #[tokio::test]
    async fn item_get_embeds_owner_username() {
        let h = Harness::new();
        let (_, token) = h.user("alice", &[]).await;
        let (_, body) = h
            .call(
                Method::POST,
                "/api/cheeses",
                Some(&token),
                Some(json!({"title": "Brie", "description": "soft", "price": 1000})),
            )
            .await;
        let cheese = parse(&body)["@id"].as_str().unwrap().to_string();

        let (status, body) = h.call(Method::GET, &cheese, None, None).await;
        assert_eq!(status, StatusCode::OK);
        let v = parse(&body);
        assert_eq!(v["owner"]["username"], "alice");
        assert!(v["owner"].get("email").is_none());

        let (_, body) = h.call(Method::GET, "/api/cheeses", None, None).await;
        let v = parse(&body);
        assert_eq!(v["hydra:totalItems"], 1);
        assert_eq!(v["hydra:member"][0]["owner"], "/api/users/1");
    }

    #[tokio::test]
    async fn csv_listings() {
        let h = Harness::new();
        let (_, token) = h.user("alice", &[]).await;
        h.call(
            Method::POST,
            "/api/cheeses",
            Some(&token),
            Some(json!({"title": "Brie", "description": "soft", "price": 1000})),
        )
        .await;

        let req = Request::builder()
            .uri("/api/cheeses")
            .header(header::ACCEPT, "text/csv")
            .body(Body::empty())
            .unwrap();
        let res = h.app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv"));
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.starts_with("id,title,shortDescription,price,owner,createdAtAgo"));
    }

    #[tokio::test]
    async fn admin_deletes() {
        let h = Harness::new();
        let (_, admin) = h.user("admin", &[ROLE_ADMIN]).await;
        let (alice, token) = h.user("alice", &[]).await;
        let (_, body) = h
            .call(
                Method::POST,
                "/api/cheeses",
                Some(&token),
                Some(json!({"title": "Brie", "description": "soft", "price": 1000})),
            )
            .await;
        let cheese = parse(&body)["@id"].as_str().unwrap().to_string();

        let (status, _) = h.call(Method::DELETE, &cheese, Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = h.call(Method::DELETE, &cheese, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = h.call(Method::GET, &cheese, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = h.call(Method::DELETE, &alice.iri(), Some(&admin), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn homepage_embeds_caller() {
        let h = Harness::new();
        let (_, body) = h.call(Method::GET, "/", None, None).await;
        assert!(body.contains("window.user = null;"));

        let (_, token) = h.user("alice", &[]).await;
        let (status, body) = h.call(Method::GET, "/", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#""username":"alice""#));
        assert!(!body.contains("password"));
    }
}
