use anyhow::{Context, Result};

use crate::app::setup::AppConfig;
use crate::web::{routes::AppState, server::WebServer};

/// Run the web server
pub async fn run_web_server(config: AppConfig) -> Result<()> {
    tracing::info!(addr = %config.bind_addr, "starting TIL generator");

    let state = AppState {
        runner: config.runner,
        default_session_key: config.default_session_key,
    };

    WebServer::new(config.bind_addr, state)
        .start()
        .await
        .context("Web server terminated")
}
