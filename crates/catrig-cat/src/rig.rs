//! CatRig -- the execution engine.
//!
//! [`CatRig`] runs named operations from a [`ConfigurationSet`] against one
//! rig. A GET sends its fixed command and decodes the reply into an ordered
//! list of fields; a SET renders its command from arguments and sends it.
//! Both can run in debug mode, where no I/O happens: a GET decodes its
//! canned `DEBUG` reply exactly as if the rig had sent it, and a SET only
//! logs the command it would have written.
//!
//! Execution takes `&mut self`, so one rig has at most one command in
//! flight. Wrap the rig in a `tokio::sync::Mutex` to share it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{Span, debug, error, info, info_span, warn};

use catrig_core::error::{Error, Result};
use catrig_core::transport::Connector;
use catrig_core::types::ConnectParams;

use crate::codec::CodecError;
use crate::models::{CatModel, ProtocolKind};
use crate::protocol;
use crate::schema::{
    ConfigurationSet, GET_SUFFIX, GetSpec, OperationBody, OperationKind, OperationSpec, SET_SUFFIX,
    SetSpec, Value,
};
use crate::session::Session;

/// Name of the operation that reads the rig's identity.
pub const ID_OPERATION: &str = "ID_GET";

/// Arguments to a SET, keyed by placeholder name.
pub type Args = BTreeMap<String, Value>;

/// Per-call execution switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Simulate: no transport I/O.
    pub debug: bool,
    /// Use the name exactly as given (no short-form probing) and do not
    /// check for unbound placeholders.
    pub skip_resolution: bool,
}

impl ExecOptions {
    /// Options for a debug-mode call.
    pub fn debug() -> Self {
        ExecOptions {
            debug: true,
            ..Default::default()
        }
    }
}

/// Decoded GET reply: field name to value, in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedReply {
    fields: Vec<(String, Value)>,
}

impl DecodedReply {
    /// Value of field `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// All fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl IntoIterator for DecodedReply {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// What a successful [`CatRig::execute`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A GET's decoded fields.
    Fields(DecodedReply),
    /// A SET was written (or, in debug mode, logged).
    Written,
}

impl Outcome {
    /// The decoded fields, if this was a GET.
    pub fn fields(&self) -> Option<&DecodedReply> {
        match self {
            Outcome::Fields(f) => Some(f),
            Outcome::Written => None,
        }
    }

    /// Consume into the decoded fields, if this was a GET.
    pub fn into_fields(self) -> Option<DecodedReply> {
        match self {
            Outcome::Fields(f) => Some(f),
            Outcome::Written => None,
        }
    }
}

/// A configuration-driven CAT rig.
///
/// Created closed by [`CatRigBuilder`](crate::builder::CatRigBuilder).
pub struct CatRig {
    model: CatModel,
    session: Session,
    /// Parameters used when connecting without explicit ones.
    default_params: Option<ConnectParams>,
    reconnect_delay: Duration,
    span: Span,
}

impl CatRig {
    pub(crate) fn new(
        model: CatModel,
        connector: Box<dyn Connector>,
        default_params: Option<ConnectParams>,
        reconnect_delay: Duration,
    ) -> Self {
        let span = info_span!("rig", model = %model.name);
        info!(
            parent: &span,
            protocol = %model.protocol,
            operations = model.operations.len(),
            "Rig initialised"
        );
        let session = Session::new(connector, model.protocol, span.clone());
        CatRig {
            model,
            session,
            default_params,
            reconnect_delay,
            span,
        }
    }

    /// Model name.
    pub fn model(&self) -> &str {
        &self.model.name
    }

    /// Wire dialect.
    pub fn protocol(&self) -> ProtocolKind {
        self.model.protocol
    }

    /// Every declared operation.
    pub fn operations(&self) -> &ConfigurationSet {
        &self.model.operations
    }

    /// Whether the link is open.
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Connect with the parameters given to the builder.
    pub async fn connect(&mut self) -> Result<()> {
        let params = self
            .session
            .params()
            .cloned()
            .or_else(|| self.default_params.clone())
            .ok_or_else(|| Error::InvalidParameter("no serial port configured".into()))?;
        self.session.connect(params).await
    }

    /// Connect with explicit parameters. Once a session has been
    /// configured, later connects reuse the first parameters.
    pub async fn connect_with(&mut self, params: ConnectParams) -> Result<()> {
        self.session.connect(params).await
    }

    /// Close the link.
    pub async fn disconnect(&mut self) -> Result<()> {
        self.session.disconnect().await
    }

    /// Find the rig: try every port in `ports` at every supported baud rate
    /// (slowest first) and return the identity from the first one that
    /// answers [`ID_OPERATION`]. The rig stays connected there.
    pub async fn connect_auto_on(&mut self, ports: &[String]) -> Result<String> {
        let template = self
            .default_params
            .clone()
            .unwrap_or_else(|| ConnectParams::new("", 0));

        for &baud in self.model.protocol.baud_rates() {
            for port in ports {
                self.session.reset().await?;
                let mut params = template.clone();
                params.port = port.clone();
                params.serial.baud_rate = baud;

                if self.session.connect(params).await.is_err() {
                    continue;
                }
                match self.read_model_id().await {
                    Ok(id) if !id.is_empty() => {
                        info!(parent: &self.span, port = %port, baud, id = %id, "Rig found");
                        return Ok(id);
                    }
                    Ok(_) => debug!(parent: &self.span, port = %port, baud, "Empty identity"),
                    Err(e) => debug!(parent: &self.span, port = %port, baud, error = %e, "No answer"),
                }
            }
        }

        self.session.reset().await?;
        warn!(parent: &self.span, ports = ports.len(), "No rig answered on any port");
        Err(Error::NotConnected)
    }

    /// [`connect_auto_on`](Self::connect_auto_on) every serial port the OS
    /// reports.
    pub async fn connect_auto(&mut self) -> Result<String> {
        let ports: Vec<String> = catrig_transport::list_ports()?
            .into_iter()
            .map(|p| p.path)
            .collect();
        self.connect_auto_on(&ports).await
    }

    /// Run [`ID_OPERATION`] and return its first field as text.
    pub async fn read_model_id(&mut self) -> Result<String> {
        let reply = self.get(ID_OPERATION).await?;
        reply
            .iter()
            .next()
            .map(|(_, v)| v.to_string())
            .ok_or_else(|| Error::ExecFailed(format!("{ID_OPERATION} declares no fields")))
    }

    /// Send an arbitrary command and return the logical reply.
    pub async fn send_raw(&mut self, command: &str) -> Result<String> {
        self.ensure_connected().await?;
        self.session.query(command.as_bytes()).await
    }

    /// Run a GET and return its fields.
    pub async fn get(&mut self, op: &str) -> Result<DecodedReply> {
        let outcome = self.execute(op, &Args::new(), ExecOptions::default()).await?;
        outcome
            .into_fields()
            .ok_or_else(|| Error::InvalidParameter(format!("{op} is not a GET operation")))
    }

    /// Run a SET with `args`.
    pub async fn set(&mut self, op: &str, args: &Args) -> Result<()> {
        self.execute(op, args, ExecOptions::default()).await?;
        Ok(())
    }

    /// Run operation `op`.
    ///
    /// `op` is upper-cased and may omit its `_GET` / `_SET` suffix when only
    /// one of the two is declared. `args` only matter for SETs; arguments
    /// without a declared encoding are substituted as plain text.
    pub async fn execute(&mut self, op: &str, args: &Args, opts: ExecOptions) -> Result<Outcome> {
        let operations = Arc::clone(&self.model.operations);
        let spec = resolve(&operations, op, opts.skip_resolution).inspect_err(|e| {
            error!(parent: &self.span, op = %op, error = %e, "Cannot resolve operation");
        })?;
        debug!(parent: &self.span, op = %spec.name, debug = opts.debug, "Execute");

        match &spec.body {
            OperationBody::Get(get) => self.run_get(spec, get, opts).await.map(Outcome::Fields),
            OperationBody::Set(set) => self
                .run_set(spec, set, args, opts)
                .await
                .map(|()| Outcome::Written),
        }
    }

    async fn run_get(
        &mut self,
        spec: &OperationSpec,
        get: &GetSpec,
        opts: ExecOptions,
    ) -> Result<DecodedReply> {
        let reply = if opts.debug {
            get.debug_reply.clone()
        } else {
            self.ensure_connected().await?;
            self.session.query(spec.command.as_bytes()).await?
        };

        decode_fields(&spec.name, get, &reply, &self.span).inspect_err(|e| {
            error!(parent: &self.span, op = %spec.name, reply = %reply, error = %e, "Reply decode failed");
        })
    }

    async fn run_set(
        &mut self,
        spec: &OperationSpec,
        set: &SetSpec,
        args: &Args,
        opts: ExecOptions,
    ) -> Result<()> {
        let command = render_command(spec, set, args, opts.skip_resolution)?;

        if opts.debug {
            debug!(parent: &self.span, op = %spec.name, command = %command, "[DEBUG] not sent");
            return Ok(());
        }

        self.ensure_connected().await?;
        self.session.write(command.as_bytes()).await
    }

    /// Give a closed session one reconnect attempt after the reconnect
    /// delay.
    async fn ensure_connected(&mut self) -> Result<()> {
        if self.session.is_connected() {
            return Ok(());
        }

        tokio::time::sleep(self.reconnect_delay).await;
        let params = self
            .session
            .params()
            .cloned()
            .or_else(|| self.default_params.clone())
            .ok_or(Error::NotConnected)?;

        self.session.connect(params).await.map_err(|e| {
            warn!(parent: &self.span, error = %e, "Reconnect failed");
            Error::NotConnected
        })
    }
}

/// Resolve a caller-supplied name to a declared operation.
fn resolve<'a>(
    operations: &'a ConfigurationSet,
    op: &str,
    skip_resolution: bool,
) -> Result<&'a OperationSpec> {
    let name = op.to_uppercase();

    if skip_resolution || OperationKind::from_name(&name).is_some() {
        return operations
            .get(&name)
            .ok_or(Error::UnknownOperation(name));
    }

    let get = operations.get(&format!("{name}{GET_SUFFIX}"));
    let set = operations.get(&format!("{name}{SET_SUFFIX}"));
    match (get, set) {
        (Some(_), Some(_)) => Err(Error::AmbiguousOperation(name)),
        (Some(spec), None) | (None, Some(spec)) => Ok(spec),
        (None, None) => Err(Error::UnknownOperation(name)),
    }
}

/// Slice `reply` per the declared offsets and decode every field. Any
/// failure fails the whole reply.
fn decode_fields(op: &str, get: &GetSpec, reply: &str, span: &Span) -> Result<DecodedReply> {
    let mut fields = Vec::with_capacity(get.fields.len());
    for field in &get.fields {
        let slice = reply.get(field.begin..field.end).ok_or_else(|| {
            Error::ExecFailed(format!(
                "{op}: field {} at {}..{} is outside reply {reply:?}",
                field.name, field.begin, field.end
            ))
        })?;
        let value = field
            .codec
            .decode(slice)
            .map_err(|e| Error::ExecFailed(format!("{op}: field {}: {e}", field.name)))?;
        debug!(parent: span, op, field = %field.name, raw = slice, value = %value, "Decoded");
        fields.push((field.name.clone(), value));
    }
    Ok(DecodedReply { fields })
}

/// Substitute every argument into the command template.
fn render_command(
    spec: &OperationSpec,
    set: &SetSpec,
    args: &Args,
    skip_resolution: bool,
) -> Result<String> {
    let mut command = spec.command.clone();
    for (name, value) in args {
        let wire = set.codec(name).encode(value).map_err(|e| match e {
            CodecError::NoMapping(value) => Error::NoMapping {
                op: spec.name.clone(),
                field: name.clone(),
                value,
            },
            other => Error::InvalidParameter(format!("{}: {name}: {other}", spec.name)),
        })?;
        command = command.replace(&protocol::placeholder(name), &wire);
    }

    if !skip_resolution && protocol::has_unbound_placeholder(&command) {
        return Err(Error::UnboundPlaceholder(command));
    }
    Ok(command)
}
