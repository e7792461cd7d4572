//! catrig-test-harness: mock transports and connectors for catrig.
//!
//! This crate provides [`MockTransport`] for deterministic unit testing of
//! the CAT engine without real radio hardware, and [`MockConnector`] for
//! scripting what each connect / reconnect attempt of a session yields.

pub mod mock_connector;
pub mod mock_serial;

pub use mock_connector::MockConnector;
pub use mock_serial::MockTransport;
