pub mod metrics;
pub mod upload_auth;

pub use metrics::*;
pub use upload_auth::*;
