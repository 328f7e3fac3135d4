mod config;
mod download_routes;
mod requests_logging;
mod search_routes;
#[allow(clippy::module_inception)]
mod server;
pub mod state;

pub use config::ServerConfig;
pub use requests_logging::{log_requests, RequestsLoggingLevel};
pub use server::{make_app, run_server};
