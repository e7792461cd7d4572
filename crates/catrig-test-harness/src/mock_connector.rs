//! Mock connector: hands out scripted transports.
//!
//! Sessions open their link through a [`Connector`]. [`MockConnector`] lets
//! a test decide what each successive open attempt yields (a
//! [`MockTransport`] or a failure) and records every attempt.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use catrig_core::error::{Error, Result};
use catrig_core::transport::{Connector, Transport};
use catrig_core::types::SerialConfig;

use crate::mock_serial::MockTransport;

#[derive(Debug, Default)]
struct ConnectorState {
    outcomes: VecDeque<std::result::Result<MockTransport, String>>,
    opens: Vec<(String, SerialConfig)>,
}

/// A [`Connector`] whose open attempts are scripted in advance.
///
/// Clones share state, so a test can keep one and hand another to the
/// engine.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<ConnectorState>>,
}

impl MockConnector {
    /// Create a connector with nothing scripted; every open fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connector whose first open returns `transport`.
    pub fn with_transport(transport: MockTransport) -> Self {
        let connector = Self::new();
        connector.push_transport(transport);
        connector
    }

    fn state(&self) -> MutexGuard<'_, ConnectorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Script the next open attempt to succeed with `transport`.
    pub fn push_transport(&self, transport: MockTransport) {
        self.state().outcomes.push_back(Ok(transport));
    }

    /// Script the next open attempt to fail with `reason`.
    pub fn push_failure(&self, reason: &str) {
        self.state().outcomes.push_back(Err(reason.to_string()));
    }

    /// Every open attempt so far, as `(port, config)`.
    pub fn opens(&self) -> Vec<(String, SerialConfig)> {
        self.state().opens.clone()
    }

    /// Number of open attempts so far.
    pub fn open_count(&self) -> usize {
        self.state().opens.len()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, port: &str, config: &SerialConfig) -> Result<Box<dyn Transport>> {
        let mut state = self.state();
        state.opens.push((port.to_string(), config.clone()));
        match state.outcomes.pop_front() {
            Some(Ok(transport)) => {
                transport.set_connected(true);
                Ok(Box::new(transport))
            }
            Some(Err(reason)) => Err(Error::Transport(reason)),
            None => Err(Error::Transport(format!("no such port: {port}"))),
        }
    }
}
