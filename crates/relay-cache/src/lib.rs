//! In-process exact-match response cache for LLM completions
//!
//! Caches non-streaming completion responses keyed by a SHA-256 hash of
//! the canonical request (messages + model + params). State is local to
//! one gateway instance; entries expire after a configurable TTL and are
//! evicted lazily on read.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

/// Cached response entry
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CachedResponse {
    /// Serialized response body (JSON)
    pub body: String,
    /// Model that produced the response
    pub model: String,
    /// Provider that served the request
    pub provider: String,
}

struct Entry {
    response: CachedResponse,
    inserted_at: Instant,
}

/// TTL response cache keyed by request fingerprint
///
/// All operations are safe for concurrent invocation; the map is guarded
/// by a single mutex owned by this component alone.
pub struct ResponseCache {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
    enabled: bool,
}

impl ResponseCache {
    /// Create a new response cache
    pub fn new(enabled: bool, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            enabled,
        }
    }

    /// Look up a cached response by fingerprint
    ///
    /// An entry older than the TTL is treated as absent and evicted on
    /// this read. Always reports absent when the cache is disabled.
    pub fn get(&self, fingerprint: &str) -> Option<CachedResponse> {
        if !self.enabled {
            return None;
        }

        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        match entries.get(fingerprint) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                tracing::debug!(fingerprint, "cache hit");
                Some(entry.response.clone())
            }
            Some(_) => {
                entries.remove(fingerprint);
                tracing::debug!(fingerprint, "cache entry expired");
                None
            }
            None => {
                tracing::debug!(fingerprint, "cache miss");
                None
            }
        }
    }

    /// Store a response under a fingerprint, replacing any existing entry
    ///
    /// No-op when the cache is disabled.
    pub fn set(&self, fingerprint: &str, response: CachedResponse) {
        if !self.enabled {
            return;
        }

        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.insert(
            fingerprint.to_owned(),
            Entry {
                response,
                inserted_at: Instant::now(),
            },
        );
        tracing::debug!(fingerprint, "cached response");
    }

    /// Remove a single entry
    pub fn delete(&self, fingerprint: &str) {
        self.entries.lock().expect("cache mutex poisoned").remove(fingerprint);
    }

    /// Remove all entries
    pub fn clear(&self) {
        self.entries.lock().expect("cache mutex poisoned").clear();
    }
}

/// Compute a SHA-256 fingerprint for a completion request
///
/// Hashes a canonical JSON serialization of the fields that determine the
/// response. Message content and the system prompt are whitespace-trimmed
/// so incidental formatting differences do not defeat the cache; field
/// order is fixed, so identical logical requests always hash identically.
pub fn request_fingerprint<'a, I>(
    messages: I,
    model: Option<&str>,
    temperature: f64,
    max_tokens: Option<u32>,
    system_prompt: Option<&str>,
) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let canonical = serde_json::json!({
        "messages": messages
            .into_iter()
            .map(|(role, content)| serde_json::json!({"role": role, "content": content.trim()}))
            .collect::<Vec<_>>(),
        "model": model,
        "temperature": temperature,
        "max_tokens": max_tokens,
        "system": system_prompt.map(str::trim),
    });

    let json = canonical.to_string();
    let hash = Sha256::digest(json.as_bytes());
    format!("{hash:x}")
}
