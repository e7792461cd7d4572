//! Transport and connector traits for rig communication.
//!
//! The [`Transport`] trait abstracts over an open byte link to a transceiver.
//! The [`Connector`] trait abstracts over *opening* such a link from a port
//! path and a [`SerialConfig`], so that a session can close a faulted link
//! and later reopen it with the configuration it stored on first connect.
//!
//! The CAT engine in `catrig-cat` operates on these traits rather than on a
//! serial port directly, enabling both real hardware control and
//! deterministic unit testing with `MockTransport` / `MockConnector` from the
//! `catrig-test-harness` crate.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::types::SerialConfig;

/// Asynchronous byte-level transport to a rig.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the rig.
    ///
    /// Implementations should return once all bytes have been written and
    /// flushed to the underlying device.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the rig into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::ReadTimeout`](crate::error::Error::ReadTimeout)
    /// if no data is received within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Discard any bytes the rig sent that have not been read yet.
    ///
    /// Called before every query so a command is never paired with a stale,
    /// unrelated reply left in the input buffer.
    async fn discard_input(&mut self) -> Result<()>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}

/// Opens [`Transport`]s on demand.
///
/// A session keeps one connector for its whole lifetime and asks it for a
/// fresh transport on the first connect and on every reconnect.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open `port` with the given line configuration.
    async fn open(&self, port: &str, config: &SerialConfig) -> Result<Box<dyn Transport>>;
}
