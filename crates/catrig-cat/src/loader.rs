//! Reading and merging declaration documents.
//!
//! A rig's command set is usually split over several YAML documents (a
//! shared base plus model-specific overrides). Each document is a mapping of
//! operation name to declaration. Documents are merged in order; a later
//! document replaces an earlier one's declaration of the same operation as a
//! whole block. The result is still unvalidated; see
//! [`validate`](crate::validate::validate).

use std::path::Path;

use catrig_core::error::{Error, Result};
use serde_yaml::{Mapping, Value as Yaml};
use tracing::{Span, debug};

/// Unvalidated operation declarations keyed by operation name.
pub type RawConfig = Mapping;

/// Parse one YAML document. `source` names it in error messages.
///
/// A document that is not a mapping, or that declares no operations, is a
/// configuration error.
pub fn parse_document(text: &str, source: &str, span: &Span) -> Result<RawConfig> {
    let doc: Yaml = serde_yaml::from_str(text)
        .map_err(|e| Error::Config(format!("{source}: invalid YAML: {e}")))?;
    match doc {
        Yaml::Mapping(m) if !m.is_empty() => {
            debug!(parent: span, source, operations = m.len(), "Parsed declaration document");
            Ok(m)
        }
        Yaml::Mapping(_) | Yaml::Null => Err(Error::Config(format!(
            "{source}: document declares no operations"
        ))),
        _ => Err(Error::Config(format!(
            "{source}: document is not a mapping of operations"
        ))),
    }
}

/// Read and parse one YAML document from disk.
pub fn load_file(path: &Path, span: &Span) -> Result<RawConfig> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
    parse_document(&text, &path.display().to_string(), span)
}

/// Merge documents in order, later declarations replacing earlier ones.
pub fn merge(sources: impl IntoIterator<Item = RawConfig>, span: &Span) -> Result<RawConfig> {
    let mut merged = Mapping::new();
    for source in sources {
        for (name, decl) in source {
            if merged.insert(name.clone(), decl).is_some() {
                debug!(parent: span, op = ?name, "Declaration overridden by later document");
            }
        }
    }
    if merged.is_empty() {
        return Err(Error::Config("no operations declared".into()));
    }
    Ok(merged)
}

/// Read every file in `paths` and merge them in order.
pub fn load_files<P: AsRef<Path>>(paths: &[P], span: &Span) -> Result<RawConfig> {
    let docs = paths
        .iter()
        .map(|p| load_file(p.as_ref(), span))
        .collect::<Result<Vec<_>>>()?;
    merge(docs, span)
}
