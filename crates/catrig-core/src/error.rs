//! Error types for catrig.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Load-time declaration problems are
//! reported as [`ValidationError`]s, collected per operation; everything
//! that can go wrong while executing an operation is a variant of [`Error`].

use std::fmt;

/// The error type for all catrig operations.
///
/// Variants cover the full range of failure modes: malformed operation
/// declarations, name resolution, transport faults, device rejections and
/// encode/decode failures on either side of the wire.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// One or more operation declarations failed validation at load time.
    #[error("{}", ValidationList(.0))]
    Validation(Vec<ValidationError>),

    /// A configuration source could not be read, parsed or merged.
    #[error("configuration error: {0}")]
    Config(String),

    /// No operation with this name (or either suffixed form) is declared.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// A short-form name matches both the `_GET` and `_SET` declaration.
    #[error("ambiguous operation: {0} (both _GET and _SET are declared)")]
    AmbiguousOperation(String),

    /// No connection to the rig is open and the reconnect attempt failed.
    #[error("not connected")]
    NotConnected,

    /// A transport-level fault (open, write or read). The session is closed
    /// as a side effect.
    #[error("transport error: {0}")]
    Transport(String),

    /// No complete reply arrived within the read timeout.
    #[error("timeout waiting for reply")]
    ReadTimeout,

    /// The rig answered with its error-flag token.
    #[error("device rejected command: {0}")]
    DeviceRejected(String),

    /// A SET argument has no wire code in the operation's enum map.
    #[error("no mapping for {field}={value} in {op}")]
    NoMapping {
        /// Operation being executed.
        op: String,
        /// Placeholder / argument name.
        field: String,
        /// The semantic value that failed to map.
        value: String,
    },

    /// A `{$name}` placeholder was left in a SET command after substitution.
    #[error("unbound placeholder in command: {0}")]
    UnboundPlaceholder(String),

    /// A GET reply could not be sliced or decoded.
    #[error("execution failed: {0}")]
    ExecFailed(String),

    /// An invalid parameter was passed (unsupported baud rate, non-numeric
    /// value for a converted field, and similar).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// A single rule violation found while validating one operation declaration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The operation name ends in neither `_GET` nor `_SET`.
    #[error("[{op}] not a _GET or _SET operation")]
    BadSuffix { op: String },

    /// The declaration is empty or is not a mapping.
    #[error("[{op}] empty or non-mapping declaration")]
    EmptyDeclaration { op: String },

    /// `CMD` is missing or not a string.
    #[error("[{op}] missing [CMD] string")]
    MissingCommand { op: String },

    /// `CMD` does not end with the terminator.
    #[error("[{op}] [CMD] does not end with '{terminator}'")]
    MissingTerminator { op: String, terminator: char },

    /// `CMD` contains a `{$` that does not open a well-formed `{$name}`
    /// placeholder.
    #[error("[{op}] [CMD] {command:?} has a malformed placeholder")]
    MalformedPlaceholder { op: String, command: String },

    /// A GET operation has no `RET` fields.
    #[error("[{op}] _GET without [RET] fields")]
    MissingReplyFields { op: String },

    /// A GET operation has no `DEBUG` reply.
    #[error("[{op}] _GET without [DEBUG] reply")]
    MissingDebugReply { op: String },

    /// A `RET` offset pair does not match `<int>,<int>`.
    #[error("[{op}] [RET] {field}: offset pair {raw:?} is not <int>,<int>")]
    BadOffsetSyntax { op: String, field: String, raw: String },

    /// A `RET` offset pair has `begin >= end`.
    #[error("[{op}] [RET] {field}: begin {begin} is not before end {end}")]
    BadOffsetOrder {
        op: String,
        field: String,
        begin: usize,
        end: usize,
    },

    /// A `DIM` table is not a mapping of scalar values to scalar codes.
    #[error("[{op}] [DIM] {field}: {reason}")]
    BadEnumMap {
        op: String,
        field: String,
        reason: String,
    },

    /// A `CONVERT` entry is malformed (bad expression or format rule).
    #[error("[{op}] [CONVERT] {field}: {reason}")]
    BadConvert {
        op: String,
        field: String,
        reason: String,
    },

    /// A SET placeholder has neither a `DIM` nor a `CONVERT` entry.
    #[error("[{op}] placeholder {{${placeholder}}} has no [DIM] or [CONVERT] entry")]
    UnresolvedPlaceholder { op: String, placeholder: String },
}

impl ValidationError {
    /// Name of the operation this violation belongs to.
    pub fn operation(&self) -> &str {
        match self {
            ValidationError::BadSuffix { op }
            | ValidationError::EmptyDeclaration { op }
            | ValidationError::MissingCommand { op }
            | ValidationError::MissingTerminator { op, .. }
            | ValidationError::MalformedPlaceholder { op, .. }
            | ValidationError::MissingReplyFields { op }
            | ValidationError::MissingDebugReply { op }
            | ValidationError::BadOffsetSyntax { op, .. }
            | ValidationError::BadOffsetOrder { op, .. }
            | ValidationError::BadEnumMap { op, .. }
            | ValidationError::BadConvert { op, .. }
            | ValidationError::UnresolvedPlaceholder { op, .. } => op,
        }
    }
}

struct ValidationList<'a>(&'a [ValidationError]);

impl fmt::Display for ValidationList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invalid operation declaration(s)", self.0.len())?;
        for e in self.0 {
            write!(f, "; {e}")?;
        }
        Ok(())
    }
}
