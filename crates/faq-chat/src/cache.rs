/// Redis caching layer for the FAQ chat server.
///
/// All operations degrade gracefully: if Redis is unavailable, reads miss and writes no-op.
///
/// Key schema:
/// - `faq:v1:search:{sha256(query|limit)}`: JSON-serialized Vec<FaqHit> (TTL: 3600s)
///
/// `faq-pipeline index` drops the whole `faq:v1:` prefix after rewriting the table.
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::model::FaqHit;
use faq_common::redis::{RedisCache, FAQ_CACHE_PREFIX};

const SEARCH_TTL_SECS: u64 = 3600;

pub struct FaqCache {
    redis: RedisCache,
}

impl FaqCache {
    pub fn new(redis: RedisCache) -> Self {
        Self { redis }
    }

    pub async fn get_search_results(&self, query: &str, limit: usize) -> Option<Vec<FaqHit>> {
        let key = search_key(query, limit);
        let json = self.redis.get(&key).await?;
        serde_json::from_str(&json)
            .inspect_err(|e| warn!(error = %e, key, "cache deserialization failed"))
            .ok()
    }

    pub async fn set_search_results(&self, query: &str, limit: usize, results: &[FaqHit]) {
        let key = search_key(query, limit);
        if let Ok(json) = serde_json::to_string(results) {
            self.redis.set_with_ttl(&key, &json, SEARCH_TTL_SECS).await;
        }
    }
}

/// Compute a deterministic cache key for a search query using SHA-256.
fn search_key(query: &str, limit: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hasher.update(b"|");
    hasher.update(limit.to_string().as_bytes());
    let hash = hasher.finalize();
    format!("{FAQ_CACHE_PREFIX}search:{:x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_keys_are_namespaced_and_limit_sensitive() {
        let key = search_key("سردرد", 5);
        assert!(key.starts_with("faq:v1:search:"));
        assert_eq!(key.len(), "faq:v1:search:".len() + 64);
        assert_eq!(key, search_key("سردرد", 5));
        assert_ne!(key, search_key("سردرد", 6));
        assert_ne!(key, search_key("سر درد", 5));
    }

    #[tokio::test]
    async fn disabled_redis_always_misses() {
        let cache = FaqCache::new(RedisCache::new(None));
        cache.set_search_results("q", 5, &[]).await;
        assert!(cache.get_search_results("q", 5).await.is_none());
    }
}
