// HTTP surface
pub mod protocol;
pub mod routes;
pub mod server;

pub use protocol::{ApiResponse, ConvertRequest, GenerateTilRequest, GenerateTilResponse};
pub use routes::{create_router, ApiError, AppState};
pub use server::WebServer;
