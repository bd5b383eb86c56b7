//! Redaction helpers applied before anything reaches the audit log

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::net::IpAddr;

/// Maximum length of an error message kept in an entry
pub const MAX_MESSAGE_CHARS: usize = 200;

/// Longest string value kept from client-supplied metadata
const MAX_METADATA_STRING: usize = 64;

/// Metadata keys that tend to carry free text
const TEXT_BEARING_KEYS: &[&str] = &[
    "text", "query", "question", "message", "content", "document", "prompt", "response", "name",
    "email", "phone", "address", "dob", "patient",
];

/// Truncated SHA-256 of an identifier (16 hex characters)
pub fn hash_identifier(value: &str) -> String {
    let digest = hex::encode(Sha256::digest(value.as_bytes()));
    digest[..16].to_string()
}

/// Mask the host part of an IP address
///
/// IPv4 keeps the first three octets; IPv6 keeps the first three groups.
/// Unparseable input becomes `"unknown"`.
pub fn anonymize_ip(ip: &str) -> String {
    match ip.trim().parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            let [a, b, c, _] = v4.octets();
            format!("{}.{}.{}.0", a, b, c)
        }
        Ok(IpAddr::V6(v6)) => {
            let s = v6.segments();
            format!("{:x}:{:x}:{:x}::", s[0], s[1], s[2])
        }
        Err(_) => "unknown".to_string(),
    }
}

/// First `max_chars` characters of `text`, with `...` when cut
pub fn bounded_preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// Error message capped at [`MAX_MESSAGE_CHARS`]
pub fn sanitize_message(message: &str) -> String {
    bounded_preview(message, MAX_MESSAGE_CHARS)
}

/// Drop free-text fields from client metadata
///
/// Keys naming text-bearing fields are removed, long strings are removed, and
/// nested objects and arrays are dropped. Numbers, booleans and short strings
/// pass through.
pub fn sanitize_metadata(metadata: &Map<String, Value>) -> Map<String, Value> {
    metadata
        .iter()
        .filter(|(key, _)| {
            let key = key.to_lowercase();
            !TEXT_BEARING_KEYS.iter().any(|k| key.contains(k))
        })
        .filter(|(_, value)| match value {
            Value::String(s) => s.chars().count() <= MAX_METADATA_STRING,
            Value::Number(_) | Value::Bool(_) | Value::Null => true,
            Value::Array(_) | Value::Object(_) => false,
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hash_identifier() {
        let h = hash_identifier("session-123");
        assert_eq!(h.len(), 16);
        assert_eq!(h, hash_identifier("session-123"));
        assert_ne!(h, hash_identifier("session-124"));
    }

    #[test]
    fn test_anonymize_ip() {
        assert_eq!(anonymize_ip("192.168.4.77"), "192.168.4.0");
        assert_eq!(anonymize_ip("2001:db8:85a3::8a2e:370:7334"), "2001:db8:85a3::");
        assert_eq!(anonymize_ip("not-an-ip"), "unknown");
    }

    #[test]
    fn test_bounded_preview() {
        assert_eq!(bounded_preview("short", 32), "short");
        assert_eq!(bounded_preview("abcdef", 3), "abc...");
        assert_eq!(bounded_preview("ééé", 2), "éé...");
    }

    #[test]
    fn test_sanitize_message_caps_length() {
        let long = "e".repeat(500);
        assert_eq!(sanitize_message(&long).chars().count(), MAX_MESSAGE_CHARS + 3);
    }

    #[test]
    fn test_sanitize_metadata() {
        let input = json!({
            "button": "submit",
            "duration_ms": 42,
            "query_text": "I have chest pain",
            "patientName": "Jane",
            "notes": "x".repeat(200),
            "nested": {"a": 1},
            "ok": true
        });
        let out = sanitize_metadata(input.as_object().unwrap());
        assert_eq!(out.len(), 3);
        assert!(out.contains_key("button"));
        assert!(out.contains_key("duration_ms"));
        assert!(out.contains_key("ok"));
    }
}
