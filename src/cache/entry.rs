//! Cache Entry Module
//!
//! Defines the stored envelope for individual cache entries with TTL support.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Milliseconds per TTL minute.
pub const MS_PER_MINUTE: i64 = 60_000;

// == Cache Entry ==
/// A single stored value with its write time and optional expiry.
///
/// Serialized as `{"data": .., "timestamp": .., "expiresAt": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    /// The stored value
    pub data: T,
    /// Write timestamp (Unix milliseconds)
    pub timestamp: i64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a new entry written at `now_ms`.
    ///
    /// A TTL of zero minutes means no expiry, same as `None`.
    pub fn new(data: T, now_ms: i64, ttl_minutes: Option<u64>) -> Self {
        let expires_at = ttl_minutes
            .filter(|minutes| *minutes > 0)
            .map(|minutes| now_ms.saturating_add((minutes as i64).saturating_mul(MS_PER_MINUTE)));

        Self {
            data,
            timestamp: now_ms,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// Boundary condition: an entry is expired once `now_ms >= expires_at`,
    /// so it is live only while `now_ms < expires_at`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// Returns `Some(0)` once the entry has expired.
    pub fn ttl_remaining_ms(&self, now_ms: i64) -> Option<i64> {
        self.expires_at.map(|expires| (expires - now_ms).max(0))
    }
}

impl CacheEntry<Value> {
    /// Parses a raw stored string. Anything that is not an entry envelope is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = CacheEntry::new("test_value", 1_000, None);

        assert_eq!(entry.data, "test_value");
        assert_eq!(entry.timestamp, 1_000);
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired_at(i64::MAX));
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = CacheEntry::new("test_value", 1_000, Some(60));

        assert_eq!(entry.expires_at, Some(1_000 + 60 * MS_PER_MINUTE));
        assert!(!entry.is_expired_at(1_000));
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let entry = CacheEntry::new(1, 0, Some(0));
        assert!(entry.expires_at.is_none());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new((), 0, Some(1));

        assert!(!entry.is_expired_at(MS_PER_MINUTE - 1));
        assert!(entry.is_expired_at(MS_PER_MINUTE), "Entry should be expired at boundary");
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = CacheEntry::new((), 0, Some(10));

        assert_eq!(entry.ttl_remaining_ms(1_000), Some(10 * MS_PER_MINUTE - 1_000));
        assert_eq!(entry.ttl_remaining_ms(i64::MAX), Some(0));
        assert_eq!(CacheEntry::new((), 0, None).ttl_remaining_ms(5), None);
    }

    #[test]
    fn test_serialized_shape() {
        let entry = CacheEntry::new(json!({"qty": 2}), 5, Some(1));
        let raw = serde_json::to_value(&entry).unwrap();

        assert_eq!(
            raw,
            json!({"data": {"qty": 2}, "timestamp": 5, "expiresAt": 60_005})
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(CacheEntry::<Value>::parse("not json").is_none());
        assert!(CacheEntry::<Value>::parse(r#"{"timestamp": 1}"#).is_none());
        assert!(CacheEntry::<Value>::parse(r#""plain string""#).is_none());

        let parsed = CacheEntry::<Value>::parse(r#"{"data": [1], "timestamp": 1}"#).unwrap();
        assert_eq!(parsed.data, json!([1]));
        assert!(parsed.expires_at.is_none());
    }
}
