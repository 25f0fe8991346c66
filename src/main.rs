mod app;
mod auth;
mod config;
mod error;
mod extract;
mod mail;
mod state;
mod users;

use crate::config::{AppConfig, LogConfig};
use crate::state::AppState;

fn init_tracing(log: &LogConfig) {
    let subscriber = tracing_subscriber::fmt().with_env_filter(log.filter.as_str());
    if log.json {
        subscriber.with_target(false).json().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(&config.log);
    tracing::info!(
        environment = ?config.environment,
        json_logs = config.log.json,
        "configuration loaded"
    );

    let addr = config.server.addr()?;
    let state = AppState::init(config).await?;
    app::serve(app::build_app(state), addr).await
}
