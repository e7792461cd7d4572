//! In-memory model of validated operation declarations.
//!
//! Everything in this module is produced by [`validate`](crate::validate::validate)
//! and is immutable afterwards. A [`ConfigurationSet`] is shared between a
//! rig and its callers behind an `Arc`; execution only ever reads it.

use std::collections::BTreeMap;
use std::fmt;

use crate::expr::Expression;

/// Suffix marking a read-style operation.
pub const GET_SUFFIX: &str = "_GET";

/// Suffix marking a write-style operation.
pub const SET_SUFFIX: &str = "_SET";

/// The two kinds of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Send a fixed command, parse the reply into fields.
    Get,
    /// Render a command from arguments and send it.
    Set,
}

impl OperationKind {
    /// Classify an operation name by its suffix.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.ends_with(GET_SUFFIX) {
            Some(OperationKind::Get)
        } else if name.ends_with(SET_SUFFIX) {
            Some(OperationKind::Set)
        } else {
            None
        }
    }

    /// The name suffix for this kind.
    pub fn suffix(self) -> &'static str {
        match self {
            OperationKind::Get => GET_SUFFIX,
            OperationKind::Set => SET_SUFFIX,
        }
    }
}

/// A semantic value going to or coming from the rig.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Integer, e.g. the result of a `CONVERT` decode.
    Int(i64),
    /// Non-integer numeric argument.
    Float(f64),
    /// Text, e.g. an enum member name or a verbatim reply slice.
    Text(String),
    /// A wire code with no entry in the field's enum map.
    Unknown,
}

impl Value {
    /// Numeric view of the value, parsing text if needed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Unknown => None,
        }
    }

    /// Integer view of the value, if it is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Text view of the value, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this is the unknown-code marker.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
            Value::Unknown => f.write_str("UNKNOWN"),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Bidirectional table between semantic values and wire codes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumMap {
    /// `(value, code)` pairs in declaration order.
    entries: Vec<(String, String)>,
}

impl EnumMap {
    /// Build from `(value, code)` pairs.
    pub fn new(entries: Vec<(String, String)>) -> Self {
        EnumMap { entries }
    }

    /// Wire code for a semantic value.
    pub fn code_for(&self, value: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, c)| c.as_str())
    }

    /// Semantic value for a wire code.
    pub fn value_for(&self, code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, c)| c == code)
            .map(|(v, _)| v.as_str())
    }

    /// All `(value, code)` pairs in declaration order.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }
}

/// Fixed-width rendering applied after a `CONVERT` encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatRule {
    /// Left-justify, padding on the right (`L|width|pad`).
    Left { width: usize, pad: char },
    /// Right-justify, padding on the left (`R|width|pad`).
    Right { width: usize, pad: char },
    /// Plain decimal, no padding.
    Plain,
}

impl FormatRule {
    /// Render `n`. Text longer than the width is never truncated.
    pub fn render(&self, n: i64) -> String {
        let digits = n.to_string();
        let fill = |width: usize| width.saturating_sub(digits.chars().count());
        match *self {
            FormatRule::Left { width, pad } => {
                let mut s = digits.clone();
                s.extend(std::iter::repeat_n(pad, fill(width)));
                s
            }
            FormatRule::Right { width, pad } => {
                let mut s: String = std::iter::repeat_n(pad, fill(width)).collect();
                s.push_str(&digits);
                s
            }
            FormatRule::Plain => digits,
        }
    }
}

/// A `CONVERT` entry: expression plus output format.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub expr: Expression,
    pub format: FormatRule,
}

/// How one field or placeholder is transcoded. Chosen at load time with
/// enum map taking precedence over conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCodec {
    Enum(EnumMap),
    Convert(Conversion),
    Verbatim,
}

/// One named slice of a GET reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyField {
    pub name: String,
    /// Half-open byte range into the reply, `begin < end`.
    pub begin: usize,
    pub end: usize,
    pub codec: FieldCodec,
}

/// GET-specific part of a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct GetSpec {
    /// Reply fields in declaration order.
    pub fields: Vec<ReplyField>,
    /// Canned reply used in debug mode (terminator stripped).
    pub debug_reply: String,
}

/// SET-specific part of a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct SetSpec {
    /// Placeholder names in order of first appearance in the template.
    pub placeholders: Vec<String>,
    /// Encodings declared for arguments. Arguments without an entry are
    /// substituted verbatim.
    pub params: BTreeMap<String, FieldCodec>,
}

impl SetSpec {
    /// Codec for argument `name`.
    pub fn codec(&self, name: &str) -> &FieldCodec {
        self.params.get(name).unwrap_or(&FieldCodec::Verbatim)
    }
}

/// Kind-specific body of an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationBody {
    Get(GetSpec),
    Set(SetSpec),
}

/// One validated, named capability of a rig.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationSpec {
    pub name: String,
    /// Command template, ending in the terminator.
    pub command: String,
    pub body: OperationBody,
}

impl OperationSpec {
    /// GET or SET.
    pub fn kind(&self) -> OperationKind {
        match self.body {
            OperationBody::Get(_) => OperationKind::Get,
            OperationBody::Set(_) => OperationKind::Set,
        }
    }
}

/// Every validated operation of one rig, keyed by full name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigurationSet {
    ops: BTreeMap<String, OperationSpec>,
}

impl ConfigurationSet {
    pub(crate) fn from_specs(specs: impl IntoIterator<Item = OperationSpec>) -> Self {
        ConfigurationSet {
            ops: specs.into_iter().map(|s| (s.name.clone(), s)).collect(),
        }
    }

    /// Look up an operation by its full name.
    pub fn get(&self, name: &str) -> Option<&OperationSpec> {
        self.ops.get(name)
    }

    /// Whether an operation with this full name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// All operation names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ops.keys().map(String::as_str)
    }

    /// All operations, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &OperationSpec> {
        self.ops.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_name() {
        assert_eq!(OperationKind::from_name("AF_GAIN_GET"), Some(OperationKind::Get));
        assert_eq!(OperationKind::from_name("AF_GAIN_SET"), Some(OperationKind::Set));
        assert_eq!(OperationKind::from_name("AF_GAIN"), None);
        assert_eq!(OperationKind::from_name("AF_GAIN_get"), None);
    }

    #[test]
    fn format_rule_right_pads_left() {
        let rule = FormatRule::Right { width: 8, pad: '0' };
        assert_eq!(rule.render(100), "00000100");
    }

    #[test]
    fn format_rule_left_pads_right() {
        let rule = FormatRule::Left { width: 5, pad: ' ' };
        assert_eq!(rule.render(42), "42   ");
    }

    #[test]
    fn format_rule_never_truncates() {
        let rule = FormatRule::Right { width: 3, pad: '0' };
        assert_eq!(rule.render(123456), "123456");
    }

    #[test]
    fn format_rule_negative_numbers_pad_outside_sign() {
        let rule = FormatRule::Right { width: 4, pad: '0' };
        assert_eq!(rule.render(-5), "00-5");
    }

    #[test]
    fn format_rule_plain() {
        assert_eq!(FormatRule::Plain.render(-12), "-12");
    }

    #[test]
    fn enum_map_both_directions() {
        let map = EnumMap::new(vec![
            ("LSB".into(), "1".into()),
            ("USB".into(), "2".into()),
        ]);
        assert_eq!(map.code_for("USB"), Some("2"));
        assert_eq!(map.value_for("1"), Some("LSB"));
        assert_eq!(map.code_for("FM"), None);
        assert_eq!(map.value_for("9"), None);
    }

    #[test]
    fn value_views() {
        assert_eq!(Value::from(10).as_f64(), Some(10.0));
        assert_eq!(Value::from(" 2.5 ").as_f64(), Some(2.5));
        assert_eq!(Value::from("ON").as_f64(), None);
        assert_eq!(Value::Unknown.as_f64(), None);
        assert_eq!(Value::from(7).as_i64(), Some(7));
        assert_eq!(Value::from("USB").as_str(), Some("USB"));
        assert!(Value::Unknown.is_unknown());
    }

    #[test]
    fn value_display() {
        assert_eq!(Value::Int(14_250_000).to_string(), "14250000");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Text("USB".into()).to_string(), "USB");
        assert_eq!(Value::Unknown.to_string(), "UNKNOWN");
    }

    #[test]
    fn set_spec_defaults_to_verbatim() {
        let spec = SetSpec {
            placeholders: vec!["VAL".into()],
            params: BTreeMap::new(),
        };
        assert_eq!(spec.codec("VAL"), &FieldCodec::Verbatim);
    }
}
