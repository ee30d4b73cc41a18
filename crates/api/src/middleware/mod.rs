//! HTTP middleware components.

pub mod logging;
pub mod metrics;
pub mod security_headers;
pub mod subject_rate_limit;
pub mod trace_id;
pub mod user_auth;

pub use logging::init_logging;
pub use metrics::{init_metrics, metrics_handler, metrics_middleware};
pub use security_headers::security_headers_middleware;
pub use subject_rate_limit::{subject_rate_limit_middleware, SubjectRateLimiterState};
pub use trace_id::{trace_id, RequestId, REQUEST_ID_HEADER};
pub use user_auth::{optional_auth, require_auth};
