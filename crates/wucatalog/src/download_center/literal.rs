//! The download center embeds its page model as a JavaScript object literal
//! (`window.__DLCDetails__=...`). The whole literal is not valid JSON once
//! its escapes are stripped, but individual `"key":value` members are, so
//! members are cut out one at a time and decoded on their own.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::markup::ParseError;

pub const DETAILS_MARKER: &str = "window.__DLCDetails__=";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    /// Ends at the first `]` after the key.
    Array,
    /// Ends at the first `",` after the key, keeping the closing quote.
    String,
}

impl LiteralKind {
    fn terminator(self) -> &'static str {
        match self {
            LiteralKind::Array => "]",
            LiteralKind::String => "\",",
        }
    }
}

/// Drops every backslash, newline, tab and carriage return from a script
/// payload.
pub fn clean_payload(payload: &str) -> String {
    payload
        .chars()
        .filter(|c| !matches!(c, '\\' | '\n' | '\t' | '\r'))
        .collect()
}

/// Cuts the `"key":...` member out of `payload`, wraps it in braces and
/// decodes it, returning the member's value.
pub fn extract_literal<T: DeserializeOwned>(
    payload: &str,
    key: &str,
    kind: LiteralKind,
) -> Result<T, ParseError> {
    let key_start = payload
        .find(key)
        .ok_or_else(|| ParseError::MissingField(key.to_string()))?;

    if !payload[..key_start].ends_with('"') {
        return Err(ParseError::MalformedLiteral(format!(
            "'{}' is not a quoted key",
            key
        )));
    }
    let start = key_start - 1;

    let member = &payload[start..];
    let end = member
        .find(kind.terminator())
        .map(|i| i + 1)
        .ok_or_else(|| {
            ParseError::MalformedLiteral(format!(
                "no '{}' closing '{}'",
                kind.terminator(),
                key
            ))
        })?;

    let mut object: Map<String, Value> = serde_json::from_str(&format!("{{{}}}", &member[..end]))?;
    let value = object
        .remove(key)
        .ok_or_else(|| ParseError::MalformedLiteral(format!("'{}' did not decode", key)))?;

    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{"dlcDetailsView":{"downloadTitle":"Update for Office (KB1234567)","downloadDescription":"Fixes things.","downloadFile":[{"name":"a.exe","size":"10"},{"name":"b.exe","size":"20"}],"operatingSystem":"Windows 10","version":"1.0"}}"#;

    #[test]
    fn test_extract_string_members() {
        let title: String = extract_literal(PAYLOAD, "downloadTitle", LiteralKind::String).unwrap();
        let os: String = extract_literal(PAYLOAD, "operatingSystem", LiteralKind::String).unwrap();

        assert_eq!(title, "Update for Office (KB1234567)");
        assert_eq!(os, "Windows 10");
    }

    #[test]
    fn test_extract_array_member() {
        let files: Vec<Value> =
            extract_literal(PAYLOAD, "downloadFile", LiteralKind::Array).unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[1]["name"], "b.exe");
    }

    #[test]
    fn test_missing_key() {
        let result: Result<String, _> =
            extract_literal(PAYLOAD, "nothingHere", LiteralKind::String);
        assert!(matches!(result, Err(ParseError::MissingField(key)) if key == "nothingHere"));
    }

    #[test]
    fn test_key_without_opening_quote() {
        let result: Result<String, _> =
            extract_literal("downloadTitle\":\"x\",", "downloadTitle", LiteralKind::String);
        assert!(matches!(result, Err(ParseError::MalformedLiteral(_))));
    }

    #[test]
    fn test_unterminated_member() {
        let result: Result<Vec<Value>, _> =
            extract_literal(r#"{"downloadFile":[{"name":"a"}"#, "downloadFile", LiteralKind::Array);
        assert!(matches!(result, Err(ParseError::MalformedLiteral(_))));
    }

    #[test]
    fn test_member_that_is_not_json() {
        let result: Result<String, _> =
            extract_literal(r#"{"downloadTitle":oops",""#, "downloadTitle", LiteralKind::String);
        assert!(matches!(result, Err(ParseError::Json(_))));
    }

    #[test]
    fn test_clean_payload() {
        assert_eq!(clean_payload("{\\\"a\\\":\n\t\"b\"\r}"), "{\"a\":\"b\"}");
    }
}
