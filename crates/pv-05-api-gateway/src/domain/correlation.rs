//! Correlation ID for request tracking.
//!
//! Uses UUID v7 for time-ordered, unique identifiers.

use std::fmt;
use uuid::Uuid;

/// Header carrying the correlation id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_INBOUND_LEN: usize = 128;

/// Correlation ID for tracking one request through the logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a new correlation ID (UUID v7)
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Reuse an id supplied by a proxy if it looks sane, otherwise mint one.
    pub fn from_inbound(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if is_acceptable(v) => Self(v.to_string()),
            _ => Self::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_acceptable(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_INBOUND_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_v7_and_distinct() {
        let a = CorrelationId::new();
        let b = CorrelationId::new();
        let parsed = Uuid::parse_str(a.as_str()).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
        assert_ne!(a, b);
    }

    #[test]
    fn test_inbound_id_reused_when_sane() {
        let id = CorrelationId::from_inbound(Some("edge-42.a_b"));
        assert_eq!(id.as_str(), "edge-42.a_b");
    }

    #[test]
    fn test_inbound_id_replaced_when_hostile() {
        let id = CorrelationId::from_inbound(Some("bad\r\nheader"));
        assert_ne!(id.as_str(), "bad\r\nheader");

        let long = "x".repeat(MAX_INBOUND_LEN + 1);
        assert_ne!(CorrelationId::from_inbound(Some(&long)).as_str(), long);

        assert!(!CorrelationId::from_inbound(Some("  ")).as_str().is_empty());
    }
}
