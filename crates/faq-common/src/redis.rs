/// Redis cache wrapper with graceful degradation.
///
/// Every operation swallows Redis failures: reads return `None`, writes return `false`,
/// and a warning is logged. The chat server works the same with or without Redis, only slower.
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::warn;

/// Namespace of every key the chat server writes. Re-indexing drops the whole prefix.
pub const FAQ_CACHE_PREFIX: &str = "faq:v1:";

pub struct RedisCache {
    client: Option<redis::Client>,
}

impl RedisCache {
    /// Build a cache for `url`. A missing or unparsable URL yields a cache that no-ops.
    pub fn new(url: Option<&str>) -> Self {
        let client = url.and_then(|u| {
            redis::Client::open(u)
                .inspect_err(|e| warn!(error = %e, url = u, "failed to create redis client, cache disabled"))
                .ok()
        });
        Self { client }
    }

    async fn connection(&self) -> Option<MultiplexedConnection> {
        let client = self.client.as_ref()?;
        client
            .get_multiplexed_async_connection()
            .await
            .inspect_err(|e| warn!(error = %e, "redis connection failed"))
            .ok()
    }

    /// PING the server. `false` when disabled or unreachable.
    pub async fn is_available(&self) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        let pong: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        pong.is_ok()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis GET failed"))
            .ok()?
    }

    /// SETEX `key`. Returns `true` if the write landed.
    pub async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis SETEX failed"))
            .is_ok()
    }

    /// Delete every key starting with `prefix`, walking the keyspace with SCAN.
    pub async fn delete_by_prefix(&self, prefix: &str) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };

        let pattern = format!("{prefix}*");
        let mut cursor: u64 = 0;
        loop {
            let scanned: Result<(u64, Vec<String>), _> = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await;
            let (next_cursor, keys) = match scanned {
                Ok(page) => page,
                Err(e) => {
                    warn!(error = %e, pattern, "redis SCAN failed");
                    return false;
                }
            };

            if !keys.is_empty() {
                if let Err(e) = conn.del::<_, ()>(&keys).await {
                    warn!(error = %e, "redis DEL failed during prefix delete");
                    return false;
                }
            }

            cursor = next_cursor;
            if cursor == 0 {
                return true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RedisCache;

    #[tokio::test]
    async fn disabled_cache_degrades_to_no_ops() {
        let cache = RedisCache::new(None);
        assert!(!cache.is_available().await);
        assert_eq!(cache.get("faq:v1:anything").await, None);
        assert!(!cache.set_with_ttl("faq:v1:anything", "x", 10).await);
        assert!(!cache.delete_by_prefix("faq:v1:").await);
    }
}
