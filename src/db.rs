use std::time::Duration;

use anyhow::Context;
use sqlx::{
    migrate::Migrator,
    postgres::{PgConnectOptions, PgPoolOptions},
    ConnectOptions, PgPool,
};
use tracing::{info, warn};

use crate::config::AppConfig;

const CONNECT_ATTEMPTS: u32 = 30;
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Connects to Postgres, retrying while the server comes up.
pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let mut options: PgConnectOptions = config
        .database_url
        .parse()
        .context("parse database url")?;
    if !config.log_statements {
        options = options.disable_statement_logging();
    }

    let mut attempt = 1;
    loop {
        let result = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options.clone())
            .await;

        match result {
            Ok(pool) => {
                info!(attempt, "connected to database");
                return Ok(pool);
            }
            Err(e) if attempt < CONNECT_ATTEMPTS => {
                warn!(error = %e, attempt, "database not ready; retrying");
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("connect to database after {CONNECT_ATTEMPTS} attempts")
                })
            }
        }
    }
}

pub async fn run_migrations(pool: &PgPool) {
    match MIGRATOR.run(pool).await {
        Ok(()) => info!("migrations applied"),
        Err(e) => warn!(error = %e, "migration failed; continuing"),
    }
}
