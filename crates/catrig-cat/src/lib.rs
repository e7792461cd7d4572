//! Configuration-driven CAT engine for catrig.
//!
//! Instead of hard-coding commands per rig, this crate runs operations
//! declared in YAML documents. Each operation is a `_GET` (send a fixed
//! command, slice the reply into named fields) or a `_SET` (fill `{$name}`
//! placeholders in a command template and send it). It provides:
//!
//! - **Loader** ([`loader`]) -- read declaration documents and merge them,
//!   later documents replacing earlier operations whole.
//! - **Validator** ([`validate`]) -- check every declaration once, at load
//!   time, collecting every violation.
//! - **Schema** ([`schema`]) -- the typed, immutable result of validation.
//! - **Codec** ([`codec`], [`expr`]) -- enum tables and arithmetic
//!   conversions between semantic values and wire text.
//! - **Protocol** ([`protocol`]) -- `;` framing, error flag and placeholder
//!   syntax.
//! - **Session** ([`session`]) -- one serial link with bounded reads and
//!   writes that closes itself on I/O faults.
//! - **Models** ([`models`]) -- protocol kinds and the model registry.
//! - **Rig** ([`rig`]) and **Builder** ([`builder`]) -- the execution engine
//!   and its fluent constructor.
//!
//! # Example
//!
//! ```
//! use catrig_cat::models::{CatModel, ProtocolKind};
//! use catrig_cat::rig::{Args, ExecOptions};
//! use catrig_cat::schema::Value;
//! use catrig_cat::validate::PlaceholderPolicy;
//! use catrig_cat::CatRigBuilder;
//! use catrig_transport::SerialConnector;
//!
//! # async fn example() -> catrig_core::Result<()> {
//! let model = CatModel::from_documents(
//!     "FT-891",
//!     ProtocolKind::YaesuCat,
//!     &[r#"
//! VFO_A_FREQ_GET:
//!   CMD: "FA;"
//!   RET: { FREQ: "2,11" }
//!   CONVERT: { FREQ: "x" }
//!   DEBUG: "FA014250000"
//! "#],
//!     PlaceholderPolicy::Strict,
//! )?;
//!
//! let mut rig = CatRigBuilder::new(model).build_with_connector(Box::new(SerialConnector))?;
//! // Debug mode decodes the canned reply without touching a port.
//! let out = rig.execute("vfo_a_freq", &Args::new(), ExecOptions::debug()).await?;
//! assert_eq!(out.fields().unwrap().get("FREQ"), Some(&Value::Int(14_250_000)));
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod codec;
pub mod expr;
pub mod loader;
pub mod models;
pub mod protocol;
pub mod rig;
pub mod schema;
pub mod session;
pub mod validate;

// Re-export the primary types for ergonomic `use catrig_cat::*`.
pub use builder::CatRigBuilder;
pub use models::{CatModel, ModelRegistry, ProtocolKind};
pub use rig::{Args, CatRig, DecodedReply, ExecOptions, Outcome};
pub use schema::{ConfigurationSet, Value};
pub use validate::{PlaceholderPolicy, validate, validate_lenient};
