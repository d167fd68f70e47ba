pub mod handler;
pub mod server;

pub use handler::{ApiError, ErrorResponse, PreviewResponse, SessionResponse, StrategyRequest};
pub use server::{build_router, start_server, ServerConfig};
