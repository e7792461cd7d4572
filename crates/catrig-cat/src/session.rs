//! Transport session: one link's lifecycle and its bounded I/O.
//!
//! A [`Session`] starts closed. The first [`connect`](Session::connect)
//! checks the baud rate against the protocol, stores the parameters and
//! opens the link through its [`Connector`]; every later connect reuses the
//! stored parameters. Any write or read fault closes the link, so the next
//! operation goes through the reconnect path.

use std::time::Duration;

use bytes::BytesMut;
use tokio::time::Instant;
use tracing::{Span, debug, error, info, trace, warn};

use catrig_core::error::{Error, Result};
use catrig_core::transport::{Connector, Transport};
use catrig_core::types::ConnectParams;

use crate::models::ProtocolKind;
use crate::protocol::{self, DecodeResult};

/// Reply bytes kept before the buffer is considered garbage.
const MAX_BUF: usize = 4096;

/// Size of a single receive chunk.
const CHUNK: usize = 256;

/// Owns the link to one rig.
pub struct Session {
    connector: Box<dyn Connector>,
    transport: Option<Box<dyn Transport>>,
    params: Option<ConnectParams>,
    protocol: ProtocolKind,
    span: Span,
}

impl Session {
    /// Create a closed session. Events are emitted under `span`.
    pub fn new(connector: Box<dyn Connector>, protocol: ProtocolKind, span: Span) -> Self {
        Session {
            connector,
            transport: None,
            params: None,
            protocol,
            span,
        }
    }

    /// Whether the link is open.
    pub fn is_connected(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.is_connected())
    }

    /// Parameters stored by the first connect, if any.
    pub fn params(&self) -> Option<&ConnectParams> {
        self.params.as_ref()
    }

    /// Open the link.
    ///
    /// Already open: succeeds without doing anything. Previously configured:
    /// reopens with the stored parameters and ignores `params`. Otherwise
    /// the baud rate is checked against the protocol, `params` is stored and
    /// the link is opened.
    pub async fn connect(&mut self, params: ConnectParams) -> Result<()> {
        if self.is_connected() {
            debug!(parent: &self.span, %params, "Already connected");
            return Ok(());
        }

        let params = match &self.params {
            Some(stored) => stored.clone(),
            None => {
                let baud = params.serial.baud_rate;
                if !self.protocol.supports_baud_rate(baud) {
                    error!(parent: &self.span, %params, protocol = %self.protocol, "Unsupported baud rate");
                    return Err(Error::InvalidParameter(format!(
                        "baud rate {baud} not supported by {} (expected one of {:?})",
                        self.protocol,
                        self.protocol.baud_rates()
                    )));
                }
                self.params = Some(params.clone());
                params
            }
        };

        self.open(&params).await
    }

    /// Reopen with the stored parameters. Fails with
    /// [`Error::NotConnected`] if the session was never configured.
    pub async fn reconnect(&mut self) -> Result<()> {
        let params = self.params.clone().ok_or(Error::NotConnected)?;
        self.connect(params).await
    }

    async fn open(&mut self, params: &ConnectParams) -> Result<()> {
        self.transport = None;
        match self.connector.open(&params.port, &params.serial).await {
            Ok(transport) => {
                info!(parent: &self.span, %params, "Serial port opened");
                self.transport = Some(transport);
                Ok(())
            }
            Err(e) => {
                error!(parent: &self.span, %params, error = %e, "Serial port open failed");
                Err(match e {
                    Error::Transport(_) | Error::InvalidParameter(_) => e,
                    other => Error::Transport(other.to_string()),
                })
            }
        }
    }

    /// Close the link. The stored parameters are kept for the next connect.
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut transport) = self.transport.take() {
            info!(parent: &self.span, "Closing serial port");
            transport.close().await?;
        }
        Ok(())
    }

    /// Close the link and forget the stored parameters, so the next connect
    /// configures from scratch.
    pub async fn reset(&mut self) -> Result<()> {
        self.params = None;
        self.disconnect().await
    }

    /// Close the link after an I/O fault and build the error to report.
    async fn fault(&mut self, what: &str, cause: Error) -> Error {
        error!(parent: &self.span, error = %cause, "Serial {what} failed, closing port");
        if let Some(mut transport) = self.transport.take() {
            // The link is already broken; a failing close adds nothing.
            let _ = transport.close().await;
        }
        Error::Transport(format!("{what} failed: {cause}"))
    }

    fn timeouts(&self) -> (Duration, Duration) {
        self.params
            .as_ref()
            .map(|p| (p.read_timeout, p.write_timeout))
            .unwrap_or((Duration::from_secs(1), Duration::from_secs(1)))
    }

    /// Write a whole command, bounded by the write timeout.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        let (_, write_timeout) = self.timeouts();
        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;

        let result = tokio::time::timeout(write_timeout, transport.send(data)).await;
        match result {
            Ok(Ok(())) => {
                trace!(parent: &self.span, data = %String::from_utf8_lossy(data), "SEND");
                Ok(())
            }
            Ok(Err(e)) => Err(self.fault("write", e).await),
            Err(_) => Err(self.fault("write", Error::Transport("write timed out".into())).await),
        }
    }

    /// Send a query and return the logical reply, terminator stripped.
    ///
    /// Stale input is discarded first. Bytes are then read until the buffer
    /// ends with the terminator, bounded by the read timeout. If more than
    /// one reply arrived, the last one wins.
    pub async fn query(&mut self, command: &[u8]) -> Result<String> {
        let (read_timeout, _) = self.timeouts();
        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
        if let Err(e) = transport.discard_input().await {
            return Err(self.fault("input flush", e).await);
        }

        self.write(command).await?;

        let terminator = self.protocol.terminator();
        let error_flag = self.protocol.error_flag();
        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;

        let read = tokio::time::timeout(
            read_timeout,
            read_reply(
                transport.as_mut(),
                read_timeout,
                terminator,
                error_flag,
                &self.span,
            ),
        )
        .await;

        match read {
            Ok(Ok(DecodeResult::Reply(reply))) => {
                trace!(parent: &self.span, reply = %reply, "RECV");
                Ok(reply)
            }
            Ok(Ok(DecodeResult::NotAscii(raw))) => {
                let cmd = String::from_utf8_lossy(command).into_owned();
                warn!(parent: &self.span, command = %cmd, reply = ?raw, "Non-ASCII reply");
                Err(Error::ExecFailed(format!("{cmd}: reply is not ASCII")))
            }
            Ok(Ok(_)) => {
                let cmd = String::from_utf8_lossy(command).into_owned();
                warn!(parent: &self.span, command = %cmd, "Rig rejected command");
                Err(Error::DeviceRejected(cmd))
            }
            Ok(Err(Error::ReadTimeout)) | Err(_) => {
                warn!(
                    parent: &self.span,
                    command = %String::from_utf8_lossy(command),
                    timeout_ms = read_timeout.as_millis() as u64,
                    "No reply before timeout"
                );
                Err(Error::ReadTimeout)
            }
            Ok(Err(e)) => Err(self.fault("read", e).await),
        }
    }
}

/// Read until a complete reply is buffered. Never returns
/// [`DecodeResult::Incomplete`] on success.
async fn read_reply(
    transport: &mut dyn Transport,
    timeout: Duration,
    terminator: u8,
    error_flag: &str,
    span: &Span,
) -> Result<DecodeResult> {
    let deadline = Instant::now() + timeout;
    let mut chunk = [0u8; CHUNK];
    let mut buf = BytesMut::with_capacity(CHUNK);

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Error::ReadTimeout);
        }

        let n = transport.receive(&mut chunk, remaining).await?;
        buf.extend_from_slice(&chunk[..n]);

        if buf.len() > MAX_BUF {
            warn!(parent: span, len = buf.len(), "Reply buffer overflow, discarding");
            buf.clear();
            continue;
        }

        match protocol::decode_reply(&buf, terminator, error_flag) {
            DecodeResult::Incomplete => continue,
            done => return Ok(done),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.transport.is_some() {
            debug!(parent: &self.span, "Session dropped, closing port");
        }
    }
}
