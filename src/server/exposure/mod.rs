//! API exposure modules
//!
//! Each exposure consumes the `RelayHost` (or nothing, for health checks) and
//! produces an axum Router.

pub mod rest;
pub mod websocket;

pub use rest::RestExposure;
pub use websocket::WebSocketExposure;
