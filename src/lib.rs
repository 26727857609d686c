//! # pricehound
//!
//! HTTP service in front of [`pricehound_search`]: environment
//! configuration, the axum router, and logging setup. The
//! `pricehound-server` binary wires them together.

pub mod config;
pub mod error;
pub mod server;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::{Result, ServiceError};
pub use server::router;
