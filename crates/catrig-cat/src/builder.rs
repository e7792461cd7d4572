//! CatRigBuilder -- fluent builder for constructing [`CatRig`] instances.
//!
//! Separates configuration from construction so that callers can set up
//! serial port parameters, timeouts and the reconnect delay before the rig
//! exists. Building never touches the port; the rig starts closed and
//! opens its link on [`CatRig::connect`] or on first use.
//!
//! # Example
//!
//! ```no_run
//! use catrig_cat::builder::CatRigBuilder;
//! use catrig_cat::models::ModelRegistry;
//! use std::path::Path;
//! use std::time::Duration;
//!
//! # async fn example() -> catrig_core::Result<()> {
//! let registry = ModelRegistry::load(Path::new("conf/support_model.yaml"))?;
//! let mut rig = CatRigBuilder::new(registry.create("FT-891")?)
//!     .serial_port("/dev/ttyUSB0")
//!     .baud_rate(38_400)
//!     .read_timeout(Duration::from_millis(500))
//!     .build()?;
//! rig.connect().await?;
//! let freq = rig.get("VFO_A_FREQ_GET").await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use catrig_core::error::{Error, Result};
use catrig_core::transport::Connector;
use catrig_core::types::{ConnectParams, SerialConfig};
use catrig_transport::SerialConnector;

use crate::models::CatModel;
use crate::rig::CatRig;

/// Delay before the single reconnect attempt made when an operation finds
/// the link closed.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Fluent builder for [`CatRig`].
pub struct CatRigBuilder {
    model: CatModel,
    serial_port: Option<String>,
    serial_config: SerialConfig,
    read_timeout: Duration,
    write_timeout: Duration,
    reconnect_delay: Duration,
}

impl CatRigBuilder {
    /// Create a new builder for the given model.
    pub fn new(model: CatModel) -> Self {
        CatRigBuilder {
            model,
            serial_port: None,
            serial_config: SerialConfig::default(),
            read_timeout: Duration::from_secs(1),
            write_timeout: Duration::from_secs(1),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the baud rate (default: 38400).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.serial_config.baud_rate = baud;
        self
    }

    /// Replace the whole line configuration. Overrides an earlier
    /// [`baud_rate()`](Self::baud_rate).
    pub fn serial_config(mut self, config: SerialConfig) -> Self {
        self.serial_config = config;
        self
    }

    /// Upper bound on waiting for a complete reply (default: 1s).
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Upper bound on writing one command (default: 1s).
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Delay before reconnecting a closed link (default: 2s).
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Build a [`CatRig`] that opens its link through `connector`.
    ///
    /// This is the entry point for testing (pass a `MockConnector` from
    /// `catrig-test-harness`). The serial port is optional here: a rig
    /// without one can still run debug-mode operations, connect with
    /// explicit parameters or probe with `connect_auto`.
    pub fn build_with_connector(self, connector: Box<dyn Connector>) -> Result<CatRig> {
        let baud = self.serial_config.baud_rate;
        if !self.model.protocol.supports_baud_rate(baud) {
            return Err(Error::InvalidParameter(format!(
                "baud rate {baud} not supported by {}",
                self.model.protocol
            )));
        }
        if self.read_timeout.is_zero() {
            return Err(Error::InvalidParameter("read_timeout must be non-zero".into()));
        }

        let default_params = self.serial_port.map(|port| ConnectParams {
            port,
            serial: self.serial_config,
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
        });

        Ok(CatRig::new(
            self.model,
            connector,
            default_params,
            self.reconnect_delay,
        ))
    }

    /// Build a [`CatRig`] on a real serial port.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub fn build(self) -> Result<CatRig> {
        if self.serial_port.is_none() {
            return Err(Error::InvalidParameter(
                "serial_port is required for build()".into(),
            ));
        }
        self.build_with_connector(Box::new(SerialConnector))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProtocolKind;
    use crate::schema::ConfigurationSet;
    use catrig_core::types::Parity;
    use catrig_test_harness::{MockConnector, MockTransport};

    fn model(protocol: ProtocolKind) -> CatModel {
        CatModel::new("TEST", protocol, ConfigurationSet::default())
    }

    #[test]
    fn builder_defaults() {
        let b = CatRigBuilder::new(model(ProtocolKind::YaesuCat));
        assert!(b.serial_port.is_none());
        assert_eq!(b.serial_config.baud_rate, 38_400);
        assert_eq!(b.read_timeout, Duration::from_secs(1));
        assert_eq!(b.write_timeout, Duration::from_secs(1));
        assert_eq!(b.reconnect_delay, DEFAULT_RECONNECT_DELAY);
    }

    #[test]
    fn builder_rejects_unsupported_baud() {
        let result = CatRigBuilder::new(model(ProtocolKind::YaesuCat))
            .baud_rate(115_200)
            .build_with_connector(Box::new(MockConnector::new()));
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn builder_accepts_fast_baud_for_kenwood() {
        let result = CatRigBuilder::new(model(ProtocolKind::KenwoodCat))
            .baud_rate(115_200)
            .build_with_connector(Box::new(MockConnector::new()));
        assert!(result.is_ok());
    }

    #[test]
    fn builder_rejects_zero_read_timeout() {
        let result = CatRigBuilder::new(model(ProtocolKind::YaesuCat))
            .read_timeout(Duration::ZERO)
            .build_with_connector(Box::new(MockConnector::new()));
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn build_requires_serial_port() {
        let result = CatRigBuilder::new(model(ProtocolKind::YaesuCat)).build();
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn builder_settings_reach_connector() {
        let connector = MockConnector::with_transport(MockTransport::new());
        let config = SerialConfig {
            baud_rate: 9600,
            parity: Parity::Even,
            ..Default::default()
        };

        let mut rig = CatRigBuilder::new(model(ProtocolKind::YaesuCat))
            .serial_port("COM3")
            .serial_config(config.clone())
            .build_with_connector(Box::new(connector.clone()))
            .unwrap();
        assert!(!rig.is_connected());

        rig.connect().await.unwrap();
        assert!(rig.is_connected());
        assert_eq!(connector.opens(), vec![("COM3".to_string(), config)]);
    }

    #[tokio::test]
    async fn connect_without_port_is_invalid() {
        let mut rig = CatRigBuilder::new(model(ProtocolKind::YaesuCat))
            .build_with_connector(Box::new(MockConnector::new()))
            .unwrap();
        assert!(matches!(rig.connect().await, Err(Error::InvalidParameter(_))));
    }
}
