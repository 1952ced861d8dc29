//! Infrastructure adapters and runtime bootstrap.

pub mod cms;
pub mod destinations;
pub mod error;
pub mod http;
pub mod telemetry;

/// User agent sent on every outbound request.
pub fn user_agent() -> &'static str {
    concat!("yander/", env!("CARGO_PKG_VERSION"))
}
