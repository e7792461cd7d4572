//! Protocol kinds and the model registry.
//!
//! A rig model is a name, a [`ProtocolKind`] and a validated
//! [`ConfigurationSet`]. Models are normally created from a registry
//! document that lists, per model, its protocol kind and the declaration
//! documents to merge:
//!
//! ```yaml
//! RADIO_CONF:
//!   FT-891:
//!     CLASS: YAESU_CAT
//!     CONF:
//!       - yaesu_cat3_base.yaml
//!       - ft891.yaml
//! ```
//!
//! `CONF` paths are relative to the registry file. Later documents override
//! earlier ones per operation.
//!
//! | Kind          | Baud rates                                 |
//! |---------------|--------------------------------------------|
//! | `YAESU_CAT`   | 4800, 9600, 19200, 38400                   |
//! | `KENWOOD_CAT` | 4800, 9600, 19200, 38400, 57600, 115200    |

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use catrig_core::error::{Error, Result};
use serde::Deserialize;
use tracing::{error, info, info_span};

use crate::loader;
use crate::protocol::{ERROR_FLAG, TERMINATOR};
use crate::schema::ConfigurationSet;
use crate::validate::{self, PlaceholderPolicy};

/// The wire dialects the engine can drive.
///
/// Both are `;`-terminated ASCII with `?` as the error flag; they differ in
/// which line speeds the rig accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolKind {
    /// Yaesu CAT-3 (FT-891, FT-991A, FTDX10 and relatives).
    YaesuCat,
    /// Kenwood-style CAT (TS-590, TS-890 and relatives).
    KenwoodCat,
}

impl ProtocolKind {
    /// Name used in registry documents.
    pub fn name(self) -> &'static str {
        match self {
            ProtocolKind::YaesuCat => "YAESU_CAT",
            ProtocolKind::KenwoodCat => "KENWOOD_CAT",
        }
    }

    /// Baud rates the rig can be configured for, slowest first.
    pub fn baud_rates(self) -> &'static [u32] {
        match self {
            ProtocolKind::YaesuCat => &[4800, 9600, 19_200, 38_400],
            ProtocolKind::KenwoodCat => &[4800, 9600, 19_200, 38_400, 57_600, 115_200],
        }
    }

    /// Whether `baud` is one of [`baud_rates`](Self::baud_rates).
    pub fn supports_baud_rate(self, baud: u32) -> bool {
        self.baud_rates().contains(&baud)
    }

    /// Command and reply terminator.
    pub fn terminator(self) -> u8 {
        TERMINATOR
    }

    /// Reply body meaning "command not understood".
    pub fn error_flag(self) -> &'static str {
        ERROR_FLAG
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProtocolKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "YAESU_CAT" => Ok(ProtocolKind::YaesuCat),
            "KENWOOD_CAT" => Ok(ProtocolKind::KenwoodCat),
            other => Err(Error::Config(format!("unknown protocol kind: {other}"))),
        }
    }
}

/// A named rig model with its validated command set.
#[derive(Debug, Clone)]
pub struct CatModel {
    /// Model name (e.g. "FT-891").
    pub name: String,
    /// Wire dialect.
    pub protocol: ProtocolKind,
    /// Every declared operation, shared read-only with the rig.
    pub operations: Arc<ConfigurationSet>,
}

impl CatModel {
    /// Wrap an already validated set.
    pub fn new(name: &str, protocol: ProtocolKind, operations: ConfigurationSet) -> Self {
        CatModel {
            name: name.to_string(),
            protocol,
            operations: Arc::new(operations),
        }
    }

    /// Build a model from in-memory YAML documents, merged in order.
    pub fn from_documents(
        name: &str,
        protocol: ProtocolKind,
        documents: &[&str],
        policy: PlaceholderPolicy,
    ) -> Result<Self> {
        let span = info_span!("load", model = %name);
        let docs = documents
            .iter()
            .enumerate()
            .map(|(i, text)| {
                loader::parse_document(text, &format!("{name} document {i}"), &span)
            })
            .collect::<Result<Vec<_>>>()?;
        let raw = loader::merge(docs, &span)?;
        let operations = validate::validate(&raw, policy, &span).map_err(Error::Validation)?;
        Ok(Self::new(name, protocol, operations))
    }
}

#[derive(Debug, Deserialize)]
struct RegistryDoc {
    #[serde(rename = "RADIO_CONF")]
    radio_conf: BTreeMap<String, RegistryEntry>,
}

/// One model's entry in the registry.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryEntry {
    /// Protocol kind name, parsed on load.
    #[serde(rename = "CLASS")]
    pub class: String,
    /// Declaration documents, merged in order.
    #[serde(rename = "CONF")]
    pub conf: Vec<PathBuf>,
}

/// Maps model names to protocol kinds and declaration documents.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    base_dir: PathBuf,
    entries: BTreeMap<String, RegistryEntry>,
    policy: PlaceholderPolicy,
}

impl ModelRegistry {
    /// Parse a registry document. Relative `CONF` paths resolve against
    /// `base_dir`.
    pub fn from_yaml(text: &str, base_dir: &Path) -> Result<Self> {
        let doc: RegistryDoc = serde_yaml::from_str(text)
            .map_err(|e| Error::Config(format!("model registry: {e}")))?;
        if doc.radio_conf.is_empty() {
            return Err(Error::Config("model registry lists no models".into()));
        }
        // Reject unknown kinds up front rather than on first use.
        for (model, entry) in &doc.radio_conf {
            entry
                .class
                .parse::<ProtocolKind>()
                .map_err(|e| Error::Config(format!("model {model}: {e}")))?;
        }
        Ok(ModelRegistry {
            base_dir: base_dir.to_path_buf(),
            entries: doc.radio_conf,
            policy: PlaceholderPolicy::default(),
        })
    }

    /// Read a registry document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml(&text, base_dir)
    }

    /// Placeholder policy applied when validating model declarations
    /// (default: [`PlaceholderPolicy::Strict`]).
    pub fn placeholder_policy(mut self, policy: PlaceholderPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// All registered model names, sorted.
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// The registry entry for `model`.
    pub fn entry(&self, model: &str) -> Result<&RegistryEntry> {
        self.entries
            .get(model)
            .ok_or_else(|| Error::Config(format!("model {model} is not in the registry")))
    }

    /// Load, merge and validate the declarations for `model`.
    ///
    /// Fails with [`Error::Validation`] carrying every violation if any
    /// declaration is invalid.
    pub fn create(&self, model: &str) -> Result<CatModel> {
        let entry = self.entry(model)?;
        let protocol: ProtocolKind = entry.class.parse()?;
        let paths: Vec<PathBuf> = entry.conf.iter().map(|p| self.base_dir.join(p)).collect();

        let span = info_span!("load", model = %model);
        for path in &paths {
            info!(parent: &span, path = %path.display(), "Loading declarations");
        }
        let raw = loader::load_files(&paths, &span)?;
        let operations = validate::validate(&raw, self.policy, &span).map_err(|errs| {
            error!(parent: &span, errors = errs.len(), "Declaration check failed");
            Error::Validation(errs)
        })?;

        info!(parent: &span, %protocol, operations = operations.len(), "Model created");
        Ok(CatModel::new(model, protocol, operations))
    }
}
