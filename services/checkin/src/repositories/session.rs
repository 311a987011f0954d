//! QR session tokens in Redis
//!
//! Each token is a hash `qr_session:<token>` with `issued_at`, `expires_at`
//! (unix milliseconds) and `consumed`. The key TTL covers the usable
//! lifetime plus the retention window. Consumption runs as a Lua script so
//! the check and the write happen atomically on the server.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::cache::RedisPool;
use redis::Script;
use std::sync::Arc;

use crate::{
    models::SessionToken,
    session::{ConsumeOutcome, SessionStore},
};

const CONSUME_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end
if redis.call('HGET', KEYS[1], 'consumed') == '1' then
    return 2
end
local expires_at = tonumber(redis.call('HGET', KEYS[1], 'expires_at'))
if tonumber(ARGV[1]) > expires_at then
    return 3
end
redis.call('HSET', KEYS[1], 'consumed', '1')
return 1
"#;

/// Redis-backed session store
#[derive(Clone)]
pub struct RedisSessionStore {
    redis_pool: RedisPool,
    consume_script: Arc<Script>,
}

impl RedisSessionStore {
    pub fn new(redis_pool: RedisPool) -> Self {
        Self {
            redis_pool,
            consume_script: Arc::new(Script::new(CONSUME_SCRIPT)),
        }
    }
}

fn session_key(token: &str) -> String {
    format!("qr_session:{}", token)
}

fn outcome_from_code(code: i64) -> anyhow::Result<ConsumeOutcome> {
    match code {
        0 => Ok(ConsumeOutcome::NotFound),
        1 => Ok(ConsumeOutcome::Consumed),
        2 => Ok(ConsumeOutcome::AlreadyUsed),
        3 => Ok(ConsumeOutcome::Expired),
        other => anyhow::bail!("unexpected consume script result: {}", other),
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn insert(&self, token: &SessionToken, retain_for: Duration) -> anyhow::Result<()> {
        let fields = [
            ("issued_at", token.issued_at.timestamp_millis().to_string()),
            ("expires_at", token.expires_at.timestamp_millis().to_string()),
            ("consumed", if token.consumed { "1" } else { "0" }.to_string()),
        ];

        self.redis_pool
            .hset_with_ttl(
                &session_key(&token.token),
                &fields,
                retain_for.num_seconds().max(1) as u64,
            )
            .await?;

        Ok(())
    }

    async fn consume(&self, token: &str, now: DateTime<Utc>) -> anyhow::Result<ConsumeOutcome> {
        let code = self
            .redis_pool
            .run_script(&self.consume_script, &session_key(token), &[now.timestamp_millis()])
            .await?;

        outcome_from_code(code)
    }
}
