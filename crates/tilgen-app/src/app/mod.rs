pub mod setup;
pub mod web_server;

pub use setup::{build_runner, setup_from_cli, AppConfig};
pub use web_server::run_web_server;
