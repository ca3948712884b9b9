//! Redis-backed session cache, for deployments where several instances
//! must share warm sessions.

use std::sync::Arc;

use stockbook_core::OwnerId;
use tracing::warn;

use crate::cache::TokenCache;

/// Keyspace prefix for session entries.
const SESSION_KEY_PREFIX: &str = "user_session:";

#[derive(Debug, thiserror::Error)]
pub enum RedisCacheError {
    #[error("redis connection error: {0}")]
    Connection(String),
}

#[derive(Debug, Clone)]
pub struct RedisTokenCache {
    client: Arc<redis::Client>,
    ttl_secs: u64,
}

impl RedisTokenCache {
    pub fn new(redis_url: impl AsRef<str>, ttl_secs: u64) -> Result<Self, RedisCacheError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| RedisCacheError::Connection(e.to_string()))?;
        Ok(Self {
            client: Arc::new(client),
            ttl_secs,
        })
    }

    fn key(&self, token: &str) -> String {
        format!("{SESSION_KEY_PREFIX}{token}")
    }
}

impl TokenCache for RedisTokenCache {
    fn get(&self, token: &str) -> Option<OwnerId> {
        let mut conn = match self.client.get_connection() {
            Ok(conn) => conn,
            Err(err) => {
                warn!(error = %err, "session cache unreachable, treating as miss");
                return None;
            }
        };
        match redis::cmd("GET")
            .arg(self.key(token))
            .query::<Option<String>>(&mut conn)
        {
            Ok(hit) => hit.map(OwnerId::from),
            Err(err) => {
                warn!(error = %err, "session cache read failed, treating as miss");
                None
            }
        }
    }

    fn put(&self, token: &str, owner: &OwnerId) {
        let mut conn = match self.client.get_connection() {
            Ok(conn) => conn,
            Err(err) => {
                warn!(error = %err, "session cache unreachable, dropping write");
                return;
            }
        };
        if let Err(err) = redis::cmd("SETEX")
            .arg(self.key(token))
            .arg(self.ttl_secs)
            .arg(owner.as_str())
            .query::<()>(&mut conn)
        {
            warn!(error = %err, "session cache write failed");
        }
    }

    fn remove(&self, token: &str) {
        let mut conn = match self.client.get_connection() {
            Ok(conn) => conn,
            Err(err) => {
                warn!(error = %err, "session cache unreachable, dropping removal");
                return;
            }
        };
        if let Err(err) = redis::cmd("DEL")
            .arg(self.key(token))
            .query::<i64>(&mut conn)
        {
            warn!(error = %err, "session cache removal failed");
        }
    }
}
