// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod enrich;
pub mod error;
pub mod geo;
pub mod ingest;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod news;
pub mod ranking;
pub mod state;
pub mod store;
pub mod trending;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::error::{NewsError, NewsResult};
pub use crate::state::AppState;

/// Short anonymized id for log lines; raw query text is never logged.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::anon_hash;

    #[test]
    fn anon_hash_is_short_stable_hex() {
        let a = anon_hash("climate change");
        assert_eq!(a.len(), 12);
        assert_eq!(a, anon_hash("climate change"));
        assert_ne!(a, anon_hash("climate"));
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
