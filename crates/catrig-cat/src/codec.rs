//! Value codec: wire text ↔ semantic values.
//!
//! Each reply field and SET argument carries a [`FieldCodec`] chosen at load
//! time (enum map first, then conversion, then verbatim). Decoding never
//! fails on an unrecognised enum code; it yields [`Value::Unknown`] so one
//! odd field cannot spoil a whole read. Encoding is strict: a value with no
//! wire code is an error rather than a blank fragment sent to the rig.

use crate::expr::ExprError;
use crate::schema::{FieldCodec, Value};

/// Why a single value could not be transcoded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// Enum encode: the value has no (non-blank) wire code.
    #[error("no wire code for {0:?}")]
    NoMapping(String),
    /// Conversion input is not a number.
    #[error("not a number: {0:?}")]
    NotNumeric(String),
    /// Conversion expression failed to evaluate.
    #[error("conversion failed: {0}")]
    Expr(#[from] ExprError),
}

impl FieldCodec {
    /// Decode a raw reply slice.
    pub fn decode(&self, raw: &str) -> Result<Value, CodecError> {
        match self {
            FieldCodec::Enum(map) => Ok(map
                .value_for(raw)
                .map_or(Value::Unknown, |v| Value::Text(v.to_string()))),
            FieldCodec::Convert(conv) => {
                let n: i64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| CodecError::NotNumeric(raw.to_string()))?;
                Ok(Value::Int(conv.expr.eval_rounded(n as f64)?))
            }
            FieldCodec::Verbatim => Ok(Value::Text(raw.to_string())),
        }
    }

    /// Encode a semantic value into the text substituted into a command.
    pub fn encode(&self, value: &Value) -> Result<String, CodecError> {
        match self {
            FieldCodec::Enum(map) => {
                let key = value.to_string();
                match map.code_for(&key) {
                    Some(code) if !code.trim().is_empty() => Ok(code.to_string()),
                    _ => Err(CodecError::NoMapping(key)),
                }
            }
            FieldCodec::Convert(conv) => {
                let x = value
                    .as_f64()
                    .ok_or_else(|| CodecError::NotNumeric(value.to_string()))?;
                let n = conv.expr.eval_rounded(x)?;
                Ok(conv.format.render(n))
            }
            FieldCodec::Verbatim => Ok(value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expression;
    use crate::schema::{Conversion, EnumMap, FormatRule};
    use proptest::prelude::*;

    fn mode_map() -> FieldCodec {
        FieldCodec::Enum(EnumMap::new(vec![
            ("LSB".into(), "1".into()),
            ("USB".into(), "2".into()),
            ("CW-U".into(), "3".into()),
            ("DATA-FM".into(), "A".into()),
            ("BLANK".into(), "  ".into()),
        ]))
    }

    fn convert(exps: &str, format: FormatRule) -> FieldCodec {
        FieldCodec::Convert(Conversion {
            expr: Expression::parse(exps).unwrap(),
            format,
        })
    }

    #[test]
    fn enum_decode_known_code() {
        assert_eq!(mode_map().decode("A"), Ok(Value::Text("DATA-FM".into())));
    }

    #[test]
    fn enum_decode_unknown_code_is_marker() {
        assert_eq!(mode_map().decode("Z"), Ok(Value::Unknown));
    }

    #[test]
    fn enum_encode_known_value() {
        assert_eq!(mode_map().encode(&"USB".into()), Ok("2".to_string()));
    }

    #[test]
    fn enum_encode_missing_value() {
        assert_eq!(
            mode_map().encode(&"AM".into()),
            Err(CodecError::NoMapping("AM".into()))
        );
    }

    #[test]
    fn enum_encode_blank_code_is_missing() {
        assert_eq!(
            mode_map().encode(&"BLANK".into()),
            Err(CodecError::NoMapping("BLANK".into()))
        );
    }

    #[test]
    fn enum_encode_numeric_value_uses_text_form() {
        let codec = FieldCodec::Enum(EnumMap::new(vec![("1".into(), "01".into())]));
        assert_eq!(codec.encode(&Value::Int(1)), Ok("01".to_string()));
    }

    #[test]
    fn convert_decode_rounds() {
        let codec = convert("x*100/255", FormatRule::Plain);
        assert_eq!(codec.decode("128"), Ok(Value::Int(50)));
        assert_eq!(codec.decode("014250000"), Ok(Value::Int(5_588_235)));
    }

    #[test]
    fn convert_decode_rejects_non_numeric() {
        let codec = convert("x", FormatRule::Plain);
        assert_eq!(
            codec.decode("+1a"),
            Err(CodecError::NotNumeric("+1a".into()))
        );
    }

    #[test]
    fn convert_decode_signed_slice() {
        let codec = convert("x", FormatRule::Plain);
        assert_eq!(codec.decode("-0120"), Ok(Value::Int(-120)));
    }

    #[test]
    fn convert_encode_pads() {
        let codec = convert("x*10", FormatRule::Right { width: 8, pad: '0' });
        assert_eq!(codec.encode(&Value::Int(10)), Ok("00000100".to_string()));
    }

    #[test]
    fn convert_encode_accepts_numeric_text_and_floats() {
        let codec = convert("x*2", FormatRule::Right { width: 3, pad: '0' });
        assert_eq!(codec.encode(&"21".into()), Ok("042".to_string()));
        assert_eq!(codec.encode(&Value::Float(2.25)), Ok("005".to_string()));
    }

    #[test]
    fn convert_encode_rejects_text() {
        let codec = convert("x", FormatRule::Plain);
        assert_eq!(
            codec.encode(&"ON".into()),
            Err(CodecError::NotNumeric("ON".into()))
        );
    }

    #[test]
    fn convert_encode_division_by_zero() {
        let codec = convert("100/x", FormatRule::Plain);
        assert_eq!(
            codec.encode(&Value::Int(0)),
            Err(CodecError::Expr(ExprError::DivisionByZero))
        );
    }

    #[test]
    fn verbatim_both_ways() {
        assert_eq!(
            FieldCodec::Verbatim.decode("014250000"),
            Ok(Value::Text("014250000".into()))
        );
        assert_eq!(FieldCodec::Verbatim.encode(&Value::Int(7)), Ok("7".into()));
    }

    #[test]
    fn enum_round_trip_every_entry() {
        let codec = mode_map();
        let FieldCodec::Enum(map) = &codec else {
            unreachable!()
        };
        for (value, code) in map.entries() {
            if code.trim().is_empty() {
                continue;
            }
            let wire = codec.encode(&value.as_str().into()).unwrap();
            assert_eq!(codec.decode(&wire), Ok(Value::Text(value.clone())));
        }
    }

    proptest! {
        #[test]
        fn convert_round_trip_within_rounding(hz in 30_000i64..56_000_000) {
            // Encode Hz to a 9-digit field in tens of Hz, decode back.
            let encode = convert("x/10", FormatRule::Right { width: 9, pad: '0' });
            let decode = convert("x*10", FormatRule::Plain);
            let wire = encode.encode(&Value::Int(hz)).unwrap();
            prop_assert_eq!(wire.len(), 9);
            let back = decode.decode(&wire).unwrap().as_i64().unwrap();
            prop_assert!((back - hz).abs() <= 5);
        }

        #[test]
        fn gain_percent_round_trip(pct in 0i64..=100) {
            let encode = convert("x*255/100", FormatRule::Right { width: 3, pad: '0' });
            let decode = convert("x*100/255", FormatRule::Plain);
            let wire = encode.encode(&Value::Int(pct)).unwrap();
            let back = decode.decode(&wire).unwrap().as_i64().unwrap();
            prop_assert_eq!(back, pct);
        }
    }
}
