mod rate_limit;
mod requests_logging;

pub use rate_limit::limit_requests;
pub use requests_logging::{log_requests, RequestsLoggingLevel};
