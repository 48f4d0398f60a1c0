//! clip-core: framework-agnostic core for the clip voice upload stack.
//!
//! Holds the pieces every other crate leans on:
//! - [`ErrorKind`] / [`ClipError`]: structured errors that carry a transport status
//! - [`ClipConfig`]: a small string key/value configuration store
//! - [`Actor`]: the acting user resolved by the host identity provider

pub mod config;
pub mod errors;
pub mod identity;

pub use config::{ClipConfig, ClipConfigSnapshot};
pub use errors::{ClipError, ClipResult, ErrorKind};
pub use identity::Actor;
