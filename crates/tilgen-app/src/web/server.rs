use anyhow::Result;
use colored::Colorize;
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::web::routes::{self, AppState};

/// Web server instance
pub struct WebServer {
    bind_addr: SocketAddr,
    state: AppState,
}

impl WebServer {
    pub fn new(bind_addr: SocketAddr, state: AppState) -> Self {
        Self { bind_addr, state }
    }

    /// Router with CORS and request tracing applied
    pub fn router(&self) -> axum::Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        routes::create_router(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Start the web server
    pub async fn start(self) -> Result<()> {
        let app = self.router();

        println!(
            "{} {}",
            "🌐 TIL Generator listening on".bright_green().bold(),
            format!("http://{}", self.bind_addr).bright_cyan()
        );
        println!("   Model: {}", self.state.runner.client().model());
        println!("   Default session: {}", self.state.default_session_key);
        println!("   API endpoints: http://{}/api/v1/convert", self.bind_addr);

        let listener = tokio::net::TcpListener::bind(&self.bind_addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
