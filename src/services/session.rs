//! Session and cache storage over the shared redis client.
//!
//! Two namespaces share one physical store: session entries are keyed
//! `session:<phone_number>` and expire after the configured timeout;
//! cache entries use the caller's key verbatim with an optional TTL.
//! Callers wanting key-space isolation must not use cache keys starting
//! with `session:` — the store does not enforce this.

use redis::AsyncCommands;
use serde_json::Value;

use crate::error::{Result, ServerError};
use crate::services::AppState;

const SESSION_PREFIX: &str = "session:";

/// Serialize a value for storage.
fn encode(value: &Value) -> Result<String> {
    serde_json::to_string(value).map_err(ServerError::from)
}

/// Parse a stored value. Anything that is not valid JSON is a contract
/// violation by an earlier writer and surfaces as a serialization error.
fn decode(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(ServerError::from)
}

fn session_key(phone_number: &str) -> String {
    format!("{SESSION_PREFIX}{phone_number}")
}

/// TTL-bounded JSON storage borrowed from [`AppState`] per call.
pub struct SessionStore<'a> {
    state: &'a AppState,
}

impl<'a> SessionStore<'a> {
    pub(crate) fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Store session data under the caller's phone number.
    ///
    /// `ttl_seconds` defaults to the configured session timeout.
    pub async fn set_session(
        &self,
        phone_number: &str,
        data: &Value,
        ttl_seconds: Option<u64>,
    ) -> Result<()> {
        let ttl = ttl_seconds.unwrap_or_else(|| self.state.config().session_ttl_seconds());
        let payload = encode(data)?;
        let mut conn = self.state.redis().await?;
        let _: () = conn
            .set_ex(session_key(phone_number), payload, ttl)
            .await?;
        Ok(())
    }

    pub async fn get_session(&self, phone_number: &str) -> Result<Option<Value>> {
        self.read(&session_key(phone_number)).await
    }

    /// Returns whether a session was actually removed.
    pub async fn delete_session(&self, phone_number: &str) -> Result<bool> {
        self.remove(&session_key(phone_number)).await
    }

    /// Store a cache value; without a TTL it persists until deleted.
    pub async fn set_cache(&self, key: &str, value: &Value, ttl_seconds: Option<u64>) -> Result<()> {
        let payload = encode(value)?;
        let mut conn = self.state.redis().await?;
        match ttl_seconds {
            Some(ttl) => {
                let _: () = conn.set_ex(key, payload, ttl).await?;
            }
            None => {
                let _: () = conn.set(key, payload).await?;
            }
        }
        Ok(())
    }

    pub async fn get_cache(&self, key: &str) -> Result<Option<Value>> {
        self.read(key).await
    }

    /// Returns whether a key was actually removed.
    pub async fn delete_cache(&self, key: &str) -> Result<bool> {
        self.remove(key).await
    }

    async fn read(&self, key: &str) -> Result<Option<Value>> {
        let mut conn = self.state.redis().await?;
        let stored: Option<String> = conn.get(key).await?;
        stored.as_deref().map(decode).transpose()
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let mut conn = self.state.redis().await?;
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_keys_are_prefixed() {
        assert_eq!(session_key("15551234567"), "session:15551234567");
    }

    #[test]
    fn encode_decode_round_trip() {
        let value = json!({"step": "awaiting_reply", "matches": [1, 2, 3]});
        let raw = encode(&value).unwrap();
        assert_eq!(decode(&raw).unwrap(), value);
    }

    #[test]
    fn malformed_stored_data_is_a_serialization_error() {
        let err = decode("{not json").unwrap_err();
        assert!(matches!(err, ServerError::Serialization(_)));
    }
}
