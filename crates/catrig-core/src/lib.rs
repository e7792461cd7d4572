//! catrig-core: Core traits, types, and error definitions for catrig.
//!
//! This crate defines the abstractions shared by the configuration-driven
//! CAT engine, its transports and its test harness. Nothing in here knows
//! about a particular rig or command set.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel
//! - [`Connector`] -- opens transports from a port path and line settings
//! - [`ConnectParams`] / [`SerialConfig`] -- how a link is opened
//! - [`Error`] / [`Result`] / [`ValidationError`] -- error handling
//! - [`logging`] -- file + console sink setup for `tracing`

pub mod error;
pub mod logging;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use catrig_core::*`.
pub use error::{Error, Result, ValidationError};
pub use transport::{Connector, Transport};
pub use types::*;
