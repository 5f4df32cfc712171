mod app;
mod config;
mod db;
mod errors;
mod extract;
mod pagination;
mod state;
mod users;

use crate::config::{AppConfig, Environment, DEFAULT_SECRET_KEY};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    let default_filter = if config.debug {
        "users_api=debug,axum=info,tower_http=debug,sqlx=info"
    } else {
        "users_api=info,tower_http=info,sqlx=warn"
    };
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
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

    if config.environment == Environment::Production && config.secret_key == DEFAULT_SECRET_KEY {
        tracing::warn!("SECRET_KEY is the development default; set it in production");
    }
    tracing::debug!(
        environment = ?config.environment,
        prefix = %config.api_prefix,
        "configuration loaded"
    );

    let state = state::AppState::init(config).await?;
    let router = app::build_app(state.clone());
    app::serve(router, state).await
}
