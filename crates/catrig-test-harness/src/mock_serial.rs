//! Mock transport for deterministic testing of the CAT engine.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs. This lets you test command building, reply
//! slicing and value decoding without real hardware.
//!
//! State lives behind an `Arc`, so a clone of the mock kept by the test
//! observes everything the engine does with the boxed original.
//!
//! # Example
//!
//! ```
//! use catrig_test_harness::MockTransport;
//!
//! let mock = MockTransport::new();
//! // When the engine sends `FA;`, answer with a VFO-A frequency reply.
//! mock.expect(b"FA;", b"FA014250000;");
//! // A SET command: no reply expected.
//! mock.expect_write(b"AG0025;");
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use catrig_core::error::{Error, Result};
use catrig_core::transport::Transport;

/// A pre-loaded request/response pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be sent.
    request: Vec<u8>,
    /// The bytes to return when the matching request is received.
    response: Vec<u8>,
}

#[derive(Debug)]
struct MockState {
    /// Ordered queue of expected request/response pairs.
    expectations: VecDeque<Expectation>,
    /// Bytes waiting to be returned by `receive()`.
    input: VecDeque<u8>,
    /// Whether the transport is "connected".
    connected: bool,
    /// When set, the next `send()` fails with a broken-pipe I/O error.
    fail_next_send: bool,
    /// Log of all bytes sent through this transport.
    sent_log: Vec<Vec<u8>>,
    /// Number of `discard_input()` calls.
    discards: usize,
}

/// A mock [`Transport`] for testing without hardware.
///
/// Expectations are consumed in order. When `send()` is called, the sent
/// data is recorded and matched against the next expectation; the
/// corresponding response is appended to the input buffer and returned by
/// subsequent `receive()` calls. An empty input buffer yields
/// [`Error::ReadTimeout`] immediately.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            state: Arc::new(Mutex::new(MockState {
                expectations: VecDeque::new(),
                input: VecDeque::new(),
                connected: true,
                fail_next_send: false,
                sent_log: Vec::new(),
                discards: 0,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test poisons the lock; later assertions still want
        // to see the state.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add an expected request/response pair.
    pub fn expect(&self, request: &[u8], response: &[u8]) {
        self.state().expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// Add an expected request that the rig does not answer.
    pub fn expect_write(&self, request: &[u8]) {
        self.expect(request, &[]);
    }

    /// Put bytes in the input buffer as if the rig had sent them unprompted.
    pub fn push_input(&self, data: &[u8]) {
        self.state().input.extend(data.iter().copied());
    }

    /// Make the next `send()` fail with an I/O error.
    pub fn fail_next_send(&self) {
        self.state().fail_next_send = true;
    }

    /// All data that has been sent through this transport, one element per
    /// `send()` call.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.state().sent_log.clone()
    }

    /// Number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.state().expectations.len()
    }

    /// Number of times the input buffer was discarded.
    pub fn discard_count(&self) -> usize {
        self.state().discards
    }

    /// Set the connected state of the mock transport.
    pub fn set_connected(&self, connected: bool) {
        self.state().connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.state();
        if !state.connected {
            return Err(Error::NotConnected);
        }
        if state.fail_next_send {
            state.fail_next_send = false;
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock send failure",
            )));
        }

        state.sent_log.push(data.to_vec());

        match state.expectations.pop_front() {
            Some(expectation) if expectation.request == data => {
                state.input.extend(expectation.response);
                Ok(())
            }
            Some(expectation) => Err(Error::Transport(format!(
                "unexpected send data: expected {:?}, got {:?}",
                String::from_utf8_lossy(&expectation.request),
                String::from_utf8_lossy(data)
            ))),
            None => Err(Error::Transport(
                "no more expectations in mock transport".into(),
            )),
        }
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        let mut state = self.state();
        if !state.connected {
            return Err(Error::NotConnected);
        }
        if state.input.is_empty() {
            return Err(Error::ReadTimeout);
        }

        let n = state.input.len().min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(state.input.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    async fn discard_input(&mut self) -> Result<()> {
        let mut state = self.state();
        if !state.connected {
            return Err(Error::NotConnected);
        }
        state.input.clear();
        state.discards += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.state();
        state.connected = false;
        state.input.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state().connected
    }
}
