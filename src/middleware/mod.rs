pub mod auth;
pub mod metrics;

pub use auth::*;
pub use metrics::metrics_middleware;
