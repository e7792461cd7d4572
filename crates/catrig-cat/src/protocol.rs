//! Text-protocol framing for `;`-terminated CAT dialects.
//!
//! CAT commands and replies are ASCII terminated by a single byte (`;`).
//! There is no other framing, so the reply to a query is recovered from
//! whatever arrived by splitting on the terminator and taking the last
//! complete segment. A rig that did not understand a command answers with
//! its error flag (`?;`).
//!
//! This module also owns the `{$name}` placeholder syntax used in SET
//! command templates.

/// The terminator byte that ends every command and reply.
pub const TERMINATOR: u8 = b';';

/// Reply body sent by the rig when it rejects a command.
pub const ERROR_FLAG: &str = "?";

/// Opening token of a placeholder.
pub const PLACEHOLDER_OPEN: &str = "{$";

/// Result of attempting to extract one reply from a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeResult {
    /// The logical reply, terminator stripped.
    Reply(String),
    /// The rig returned the error flag.
    Rejected,
    /// The reply contains bytes outside ASCII, so field offsets into it
    /// cannot be trusted. Carries the raw reply bytes.
    NotAscii(Vec<u8>),
    /// The buffer does not end with a terminator yet.
    Incomplete,
}

/// Extract the logical reply from everything read after a query.
///
/// The buffer is complete once it ends with `terminator`. It is then split
/// on the terminator; because of the trailing terminator the last segment
/// is empty and the second-to-last one is the reply. If an earlier reply
/// was still buffered (`FA014250000;FA014250000;`) only the newest one
/// counts.
pub fn decode_reply(buf: &[u8], terminator: u8, error_flag: &str) -> DecodeResult {
    if buf.last() != Some(&terminator) {
        return DecodeResult::Incomplete;
    }

    let segments: Vec<&[u8]> = buf.split(|&b| b == terminator).collect();
    // Ending with the terminator guarantees at least two segments.
    let raw = segments[segments.len() - 2];
    if !raw.is_ascii() {
        return DecodeResult::NotAscii(raw.to_vec());
    }
    let reply = String::from_utf8_lossy(raw).into_owned();

    if reply == error_flag {
        DecodeResult::Rejected
    } else {
        DecodeResult::Reply(reply)
    }
}

/// Render the placeholder token for `name`: `{$name}`.
pub fn placeholder(name: &str) -> String {
    format!("{PLACEHOLDER_OPEN}{name}}}")
}

/// Names of all `{$name}` placeholders in `template`, in order of first
/// appearance, without duplicates. Names are runs of ASCII letters, digits
/// and `_`; anything else between `{$` and `}` is not a placeholder.
pub fn find_placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find(PLACEHOLDER_OPEN) {
        let after = &rest[start + PLACEHOLDER_OPEN.len()..];
        let name_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        if name_len > 0 && after[name_len..].starts_with('}') {
            let name = &after[..name_len];
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
            rest = &after[name_len + 1..];
        } else {
            rest = after;
        }
    }

    names
}

/// Remove every well-formed `{$name}` token from `template`. Whatever
/// still contains [`PLACEHOLDER_OPEN`] afterwards is a malformed token.
pub fn strip_placeholders(template: &str) -> String {
    let mut out = template.to_string();
    for name in find_placeholders(template) {
        out = out.replace(&placeholder(&name), "");
    }
    out
}

/// Whether any placeholder opening token is left in `command`.
pub fn has_unbound_placeholder(command: &str) -> bool {
    command.contains(PLACEHOLDER_OPEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // decode_reply
    // -----------------------------------------------------------------------

    #[test]
    fn decode_single_reply() {
        assert_eq!(
            decode_reply(b"FA014250000;", TERMINATOR, ERROR_FLAG),
            DecodeResult::Reply("FA014250000".into())
        );
    }

    #[test]
    fn decode_takes_second_to_last_segment() {
        assert_eq!(
            decode_reply(b"FA014250000;FA014250000;", TERMINATOR, ERROR_FLAG),
            DecodeResult::Reply("FA014250000".into())
        );
        assert_eq!(
            decode_reply(b"MD02;FA007074000;", TERMINATOR, ERROR_FLAG),
            DecodeResult::Reply("FA007074000".into())
        );
    }

    #[test]
    fn decode_error_flag() {
        assert_eq!(
            decode_reply(b"?;", TERMINATOR, ERROR_FLAG),
            DecodeResult::Rejected
        );
        assert_eq!(
            decode_reply(b"FA014250000;?;", TERMINATOR, ERROR_FLAG),
            DecodeResult::Rejected
        );
    }

    #[test]
    fn decode_incomplete() {
        assert_eq!(
            decode_reply(b"", TERMINATOR, ERROR_FLAG),
            DecodeResult::Incomplete
        );
        assert_eq!(
            decode_reply(b"FA0142", TERMINATOR, ERROR_FLAG),
            DecodeResult::Incomplete
        );
        assert_eq!(
            decode_reply(b"FA014250000;MD0", TERMINATOR, ERROR_FLAG),
            DecodeResult::Incomplete
        );
    }

    #[test]
    fn decode_non_ascii_reply() {
        // 0xB0 in the frequency digits would shift every later offset if it
        // were replaced by a multi-byte character.
        assert_eq!(
            decode_reply(b"FA01\xB04250000;", TERMINATOR, ERROR_FLAG),
            DecodeResult::NotAscii(b"FA01\xB04250000".to_vec())
        );
        // Only the reply segment matters.
        assert_eq!(
            decode_reply(b"\xFF\xFE;FA014250000;", TERMINATOR, ERROR_FLAG),
            DecodeResult::Reply("FA014250000".into())
        );
    }

    #[test]
    fn decode_bare_terminator_is_empty_reply() {
        assert_eq!(
            decode_reply(b";", TERMINATOR, ERROR_FLAG),
            DecodeResult::Reply(String::new())
        );
    }

    // -----------------------------------------------------------------------
    // placeholders
    // -----------------------------------------------------------------------

    #[test]
    fn placeholder_token() {
        assert_eq!(placeholder("VAL"), "{$VAL}");
    }

    #[test]
    fn find_single_placeholder() {
        assert_eq!(find_placeholders("AG0{$VAL};"), vec!["VAL".to_string()]);
    }

    #[test]
    fn find_multiple_placeholders_in_order_without_duplicates() {
        assert_eq!(
            find_placeholders("RT{$STATUS}{$OFFSET}{$STATUS};"),
            vec!["STATUS".to_string(), "OFFSET".to_string()]
        );
    }

    #[test]
    fn find_ignores_malformed_tokens() {
        assert!(find_placeholders("FA;").is_empty());
        assert!(find_placeholders("FA{$};").is_empty());
        assert!(find_placeholders("FA{$VAL;").is_empty());
        assert!(find_placeholders("FA{$V-L};").is_empty());
        assert!(find_placeholders("FA{VAL};").is_empty());
    }

    #[test]
    fn find_recovers_after_malformed_token() {
        assert_eq!(
            find_placeholders("X{$A B}{$C};"),
            vec!["C".to_string()]
        );
    }

    #[test]
    fn strip_leaves_only_malformed_tokens() {
        assert_eq!(strip_placeholders("RT{$STATUS}{$OFFSET}{$STATUS};"), "RT;");
        assert_eq!(strip_placeholders("FA{$FREQ-1};"), "FA{$FREQ-1};");
        assert_eq!(strip_placeholders("FA{$A}{$;"), "FA{$;");
    }

    #[test]
    fn unbound_detection() {
        assert!(has_unbound_placeholder("AG0{$VAL};"));
        assert!(has_unbound_placeholder("AG0{$;"));
        assert!(!has_unbound_placeholder("AG0128;"));
    }
}
