//! Transport implementations for catrig.
//!
//! This crate provides the concrete serial link used by the CAT engine:
//!
//! - [`SerialTransport`]: USB virtual COM ports and RS-232 serial connections
//! - [`SerialConnector`]: opens a [`SerialTransport`] on demand, so a session
//!   can reconnect after an I/O fault
//! - [`list_ports`]: enumerates the serial devices the OS exposes
//!
//! # Example
//!
//! ```no_run
//! use catrig_transport::{SerialTransport, list_ports};
//! use catrig_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> catrig_core::Result<()> {
//! for port in list_ports()? {
//!     println!("{port}");
//! }
//!
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 38400).await?;
//! transport.send(b"ID;").await?;
//!
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

pub mod discovery;
pub mod serial;

pub use discovery::{PortInfo, list_ports};
pub use serial::{SerialConnector, SerialTransport};
