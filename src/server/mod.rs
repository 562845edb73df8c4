//! Server module: host, builder, exposures and origin policy
//!
//! `ServerBuilder` assembles:
//! - `/health` and `/healthz` liveness routes
//! - the `/ws` relay endpoint
//! - CORS and request tracing layers

pub mod builder;
pub mod exposure;
pub mod host;
pub mod origin;

pub use builder::ServerBuilder;
pub use exposure::{RestExposure, WebSocketExposure};
pub use host::RelayHost;
pub use origin::OriginPolicy;
