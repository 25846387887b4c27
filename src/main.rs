use std::sync::Arc;

mod access;
mod app;
mod auth;
mod cheeses;
mod config;
mod error;
mod extract;
mod format;
mod frontend;
mod groups;
mod humanize;
mod repo;
mod state;
mod users;
mod validation;

use crate::{config::AppConfig, repo::postgres::PgRepository, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "cheeseshop=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let pg = PgRepository::connect(&config.database_url).await?;

    if let Err(e) = sqlx::migrate!("./migrations").run(pg.pool()).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }

    let state = AppState::from_parts(Arc::new(pg), Arc::new(config));
    app::serve(app::build_app(state)).await
}
