pub mod request_log;
pub mod response;

pub use request_log::request_log_middleware;
pub use response::{ApiResponse, ApiResult};
