//! Load-time validation of operation declarations.
//!
//! Declarations arrive as loosely-typed YAML. [`validate`] checks every
//! operation, collects every violation (it never stops at the first one)
//! and turns the survivors into typed [`OperationSpec`]s. All checking
//! happens here so that execution never has to re-check a declaration.
//!
//! Rules, per operation:
//!
//! 1. the name ends in `_GET` or `_SET`;
//! 2. `CMD` is a non-empty string ending in the terminator, and every `{$`
//!    in it opens a well-formed `{$name}` placeholder;
//! 3. a GET declares at least one `RET` field and a `DEBUG` reply;
//! 4. every `RET` entry is a literal `<int>,<int>` with begin < end;
//! 5. every `{$name}` placeholder in a SET command has a `DIM` or `CONVERT`
//!    entry (unless [`PlaceholderPolicy::AllowVerbatim`]);
//!
//! plus structural checks on `DIM` tables, `CONVERT` expressions and
//! `FORM` rules.

use std::collections::BTreeMap;

use catrig_core::error::ValidationError;
use serde_yaml::{Mapping, Value as Yaml};
use tracing::{Span, debug, warn};

use crate::expr::Expression;
use crate::protocol::{self, TERMINATOR};
use crate::schema::{
    ConfigurationSet, Conversion, EnumMap, FieldCodec, FormatRule, GetSpec, OperationBody,
    OperationKind, OperationSpec, ReplyField, SetSpec,
};

const KEY_CMD: &str = "CMD";
const KEY_RET: &str = "RET";
const KEY_DEBUG: &str = "DEBUG";
const KEY_DIM: &str = "DIM";
const KEY_CONVERT: &str = "CONVERT";
const KEY_EXPS: &str = "EXPS";
const KEY_FORM: &str = "FORM";

/// What to do with a SET placeholder that has neither a `DIM` nor a
/// `CONVERT` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderPolicy {
    /// Reject the operation.
    #[default]
    Strict,
    /// Admit it; the argument is substituted as plain text.
    AllowVerbatim,
}

/// Why a `RET` offset pair was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetError {
    /// Not of the form `<int>,<int>`.
    Syntax,
    /// `begin >= end`.
    Order { begin: usize, end: usize },
}

/// Parse a `RET` offset pair. Only the literal form `<digits>,<digits>` is
/// accepted; no whitespace, signs or expressions.
pub fn parse_offsets(raw: &str) -> Result<(usize, usize), OffsetError> {
    let (b, e) = raw.split_once(',').ok_or(OffsetError::Syntax)?;
    let begin = parse_index(b)?;
    let end = parse_index(e)?;
    if begin < end {
        Ok((begin, end))
    } else {
        Err(OffsetError::Order { begin, end })
    }
}

fn parse_index(s: &str) -> Result<usize, OffsetError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OffsetError::Syntax);
    }
    s.parse().map_err(|_| OffsetError::Syntax)
}

/// Widest padding a `FORM` rule may ask for.
pub const MAX_FORM_WIDTH: usize = 64;

/// Parse a `FORM` rule: `L|width|pad`, `R|width|pad`, or anything with a
/// different first part (plain decimal).
pub fn parse_format(raw: &str) -> Result<FormatRule, String> {
    let parts: Vec<&str> = raw.split('|').collect();
    let justify = parts[0];
    if justify != "L" && justify != "R" {
        return Ok(FormatRule::Plain);
    }
    if parts.len() != 3 {
        return Err(format!("FORM {raw:?} is not {justify}|width|pad"));
    }
    let width: usize = parts[1]
        .parse()
        .map_err(|_| format!("FORM {raw:?}: width {:?} is not an integer", parts[1]))?;
    if width > MAX_FORM_WIDTH {
        return Err(format!("FORM {raw:?}: width {width} exceeds {MAX_FORM_WIDTH}"));
    }
    let mut pad_chars = parts[2].chars();
    let pad = match (pad_chars.next(), pad_chars.next()) {
        (Some(c), None) => c,
        _ => {
            return Err(format!(
                "FORM {raw:?}: pad {:?} is not a single character",
                parts[2]
            ));
        }
    };
    Ok(if justify == "L" {
        FormatRule::Left { width, pad }
    } else {
        FormatRule::Right { width, pad }
    })
}

/// Validate every declaration in `raw`.
///
/// Returns the full set if every operation passed, otherwise every
/// violation found across all operations.
pub fn validate(
    raw: &Mapping,
    policy: PlaceholderPolicy,
    span: &Span,
) -> Result<ConfigurationSet, Vec<ValidationError>> {
    let (set, errors) = validate_lenient(raw, policy, span);
    if errors.is_empty() {
        Ok(set)
    } else {
        Err(errors)
    }
}

/// Validate every declaration in `raw`, skipping the ones that fail.
///
/// Returns the operations that passed together with every violation of the
/// ones that did not. Rejected operations are logged at WARN.
pub fn validate_lenient(
    raw: &Mapping,
    policy: PlaceholderPolicy,
    span: &Span,
) -> (ConfigurationSet, Vec<ValidationError>) {
    let mut specs = Vec::with_capacity(raw.len());
    let mut errors = Vec::new();

    for (key, decl) in raw {
        let name = match key {
            Yaml::String(s) => s.clone(),
            other => yaml_display(other),
        };
        match validate_operation(&name, decl, policy) {
            Ok(spec) => specs.push(spec),
            Err(mut errs) => {
                for e in &errs {
                    warn!(parent: span, op = %name, error = %e, "Rejected operation declaration");
                }
                errors.append(&mut errs);
            }
        }
    }

    debug!(
        parent: span,
        admitted = specs.len(),
        rejected = raw.len() - specs.len(),
        "Validated operation declarations"
    );
    (ConfigurationSet::from_specs(specs), errors)
}

/// Validate a single declaration.
pub fn validate_operation(
    name: &str,
    decl: &Yaml,
    policy: PlaceholderPolicy,
) -> Result<OperationSpec, Vec<ValidationError>> {
    let op = || name.to_string();

    let Some(kind) = OperationKind::from_name(name) else {
        return Err(vec![ValidationError::BadSuffix { op: op() }]);
    };

    let decl = match decl {
        Yaml::Mapping(m) if !m.is_empty() => m,
        _ => return Err(vec![ValidationError::EmptyDeclaration { op: op() }]),
    };

    let mut errors = Vec::new();

    let command = match decl.get(KEY_CMD) {
        Some(Yaml::String(s)) if !s.is_empty() => {
            if !s.ends_with(TERMINATOR as char) {
                errors.push(ValidationError::MissingTerminator {
                    op: op(),
                    terminator: TERMINATOR as char,
                });
            }
            if protocol::strip_placeholders(s).contains(protocol::PLACEHOLDER_OPEN) {
                errors.push(ValidationError::MalformedPlaceholder {
                    op: op(),
                    command: s.clone(),
                });
            }
            s.clone()
        }
        _ => {
            errors.push(ValidationError::MissingCommand { op: op() });
            String::new()
        }
    };

    let enums = parse_dim(name, decl.get(KEY_DIM), &mut errors);
    let converts = parse_convert(name, decl.get(KEY_CONVERT), &mut errors);
    let codec_for = |field: &str| -> Option<FieldCodec> {
        if let Some(map) = enums.get(field) {
            Some(FieldCodec::Enum(map.clone()))
        } else {
            converts
                .get(field)
                .map(|conv| FieldCodec::Convert(conv.clone()))
        }
    };

    let body = match kind {
        OperationKind::Get => {
            let fields = parse_ret(name, decl.get(KEY_RET), &codec_for, &mut errors);
            let debug_reply = match decl.get(KEY_DEBUG).and_then(scalar_to_string) {
                Some(reply) => reply
                    .strip_suffix(TERMINATOR as char)
                    .map(str::to_string)
                    .unwrap_or(reply),
                None => {
                    errors.push(ValidationError::MissingDebugReply { op: op() });
                    String::new()
                }
            };
            OperationBody::Get(GetSpec {
                fields,
                debug_reply,
            })
        }
        OperationKind::Set => {
            let placeholders = protocol::find_placeholders(&command);
            let mut params = BTreeMap::new();
            for ph in &placeholders {
                match codec_for(ph) {
                    Some(codec) => {
                        params.insert(ph.clone(), codec);
                    }
                    None if policy == PlaceholderPolicy::AllowVerbatim => {}
                    None => errors.push(ValidationError::UnresolvedPlaceholder {
                        op: op(),
                        placeholder: ph.clone(),
                    }),
                }
            }
            // Arguments declared but not in the template still get their
            // codec; substituting them is a no-op.
            for field in enums.keys().chain(converts.keys()) {
                if !params.contains_key(field) {
                    if let Some(codec) = codec_for(field) {
                        params.insert(field.clone(), codec);
                    }
                }
            }
            OperationBody::Set(SetSpec {
                placeholders,
                params,
            })
        }
    };

    if errors.is_empty() {
        Ok(OperationSpec {
            name: name.to_string(),
            command,
            body,
        })
    } else {
        Err(errors)
    }
}

fn parse_ret(
    op: &str,
    ret: Option<&Yaml>,
    codec_for: &dyn Fn(&str) -> Option<FieldCodec>,
    errors: &mut Vec<ValidationError>,
) -> Vec<ReplyField> {
    let ret = match ret {
        Some(Yaml::Mapping(m)) if !m.is_empty() => m,
        _ => {
            errors.push(ValidationError::MissingReplyFields { op: op.to_string() });
            return Vec::new();
        }
    };

    let mut fields = Vec::with_capacity(ret.len());
    for (key, offsets) in ret {
        let field = yaml_display(key);
        let raw = match offsets {
            Yaml::String(s) => s.clone(),
            other => yaml_display(other),
        };
        match parse_offsets(&raw) {
            Ok((begin, end)) => fields.push(ReplyField {
                codec: codec_for(&field).unwrap_or(FieldCodec::Verbatim),
                name: field,
                begin,
                end,
            }),
            Err(OffsetError::Syntax) => errors.push(ValidationError::BadOffsetSyntax {
                op: op.to_string(),
                field,
                raw,
            }),
            Err(OffsetError::Order { begin, end }) => {
                errors.push(ValidationError::BadOffsetOrder {
                    op: op.to_string(),
                    field,
                    begin,
                    end,
                })
            }
        }
    }
    fields
}

fn parse_dim(
    op: &str,
    dim: Option<&Yaml>,
    errors: &mut Vec<ValidationError>,
) -> BTreeMap<String, EnumMap> {
    let mut out = BTreeMap::new();
    let dim = match dim {
        None | Some(Yaml::Null) => return out,
        Some(Yaml::Mapping(m)) => m,
        Some(_) => {
            errors.push(ValidationError::BadEnumMap {
                op: op.to_string(),
                field: KEY_DIM.to_string(),
                reason: "not a mapping".into(),
            });
            return out;
        }
    };

    for (key, table) in dim {
        let field = yaml_display(key);
        let Yaml::Mapping(table) = table else {
            errors.push(ValidationError::BadEnumMap {
                op: op.to_string(),
                field,
                reason: "not a mapping of value: code".into(),
            });
            continue;
        };
        let mut entries = Vec::with_capacity(table.len());
        let mut ok = true;
        for (value, code) in table {
            match (scalar_to_string(value), scalar_to_string(code)) {
                (Some(v), Some(c)) => entries.push((v, c)),
                _ => {
                    errors.push(ValidationError::BadEnumMap {
                        op: op.to_string(),
                        field: field.clone(),
                        reason: format!("entry {} is not scalar: scalar", yaml_display(value)),
                    });
                    ok = false;
                }
            }
        }
        if ok {
            out.insert(field, EnumMap::new(entries));
        }
    }
    out
}

fn parse_convert(
    op: &str,
    convert: Option<&Yaml>,
    errors: &mut Vec<ValidationError>,
) -> BTreeMap<String, Conversion> {
    let mut out = BTreeMap::new();
    let convert = match convert {
        None | Some(Yaml::Null) => return out,
        Some(Yaml::Mapping(m)) => m,
        Some(_) => {
            errors.push(ValidationError::BadConvert {
                op: op.to_string(),
                field: KEY_CONVERT.to_string(),
                reason: "not a mapping".into(),
            });
            return out;
        }
    };

    for (key, entry) in convert {
        let field = yaml_display(key);
        let mut bad = |reason: String| {
            errors.push(ValidationError::BadConvert {
                op: op.to_string(),
                field: field.clone(),
                reason,
            })
        };

        let (exps, form) = match entry {
            Yaml::String(s) => (s.clone(), None),
            Yaml::Mapping(m) => match m.get(KEY_EXPS).and_then(scalar_to_string) {
                Some(exps) => (exps, m.get(KEY_FORM).and_then(scalar_to_string)),
                None => {
                    bad(format!("missing {KEY_EXPS}"));
                    continue;
                }
            },
            _ => {
                bad("not an expression or {EXPS, FORM} mapping".into());
                continue;
            }
        };

        let expr = match Expression::parse(&exps) {
            Ok(expr) => expr,
            Err(e) => {
                bad(format!("expression {exps:?}: {e}"));
                continue;
            }
        };
        let format = match form.as_deref().map(parse_format) {
            None => FormatRule::Plain,
            Some(Ok(rule)) => rule,
            Some(Err(reason)) => {
                bad(reason);
                continue;
            }
        };
        out.insert(field, Conversion { expr, format });
    }
    out
}

/// String form of a YAML scalar (string, number or bool).
fn scalar_to_string(v: &Yaml) -> Option<String> {
    match v {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Number(n) => Some(n.to_string()),
        Yaml::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Best-effort text for any YAML node, for names and error messages.
fn yaml_display(v: &Yaml) -> String {
    scalar_to_string(v).unwrap_or_else(|| format!("{v:?}"))
}
