//! Stored response snapshots.

use super::hash::compute_cache_key;
use serde::{Deserialize, Serialize};

/// An immutable captured copy of a response.
///
/// Keyed by `hash`, the digest of the request identity that produced it.
/// A snapshot is never edited in place; a newer one replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Snapshot {
    pub hash: String,
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl Snapshot {
    /// Capture a response for the given request identity, stamped with the current time.
    pub fn new(
        method: &str, url: &str, status_code: u16, headers: Vec<(String, String)>, body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            hash: compute_cache_key(method, url),
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            status_code,
            headers,
            body: body.into(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// First header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_computes_identity_hash() {
        let snapshot = Snapshot::new("get", "https://example.com/", 200, Vec::new(), "hello");
        assert_eq!(snapshot.method, "GET");
        assert_eq!(snapshot.hash, compute_cache_key("GET", "https://example.com/"));
        assert_eq!(snapshot.body, b"hello");
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let headers = vec![("Content-Type".to_string(), "text/html".to_string())];
        let snapshot = Snapshot::new("GET", "https://example.com/", 200, headers, Vec::new());
        assert_eq!(snapshot.content_type(), Some("text/html"));
        assert_eq!(snapshot.header("etag"), None);
    }
}
