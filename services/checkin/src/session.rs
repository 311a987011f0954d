//! QR session authority
//!
//! Issues short-lived single-use tokens that the kiosk renders as a QR code
//! and consumes them when a phone presents one. Consumption is atomic per
//! token in every [`SessionStore`], so a scanned code cannot be replayed.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, distributions::Alphanumeric};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    clock::Clock,
    error::SessionError,
    models::{SessionContext, SessionToken},
};

const TOKEN_LENGTH: usize = 43;
const MAX_PRESENTED_TOKEN_LENGTH: usize = 128;

/// Result of an atomic consume attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Consumed,
    Expired,
    AlreadyUsed,
    NotFound,
}

/// Persistence for session tokens
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a fresh token; the store may forget it after `retain_for`
    async fn insert(&self, token: &SessionToken, retain_for: Duration) -> anyhow::Result<()>;

    /// Atomically check and mark a token consumed
    ///
    /// A consumed token reports `AlreadyUsed` even once expired.
    async fn consume(&self, token: &str, now: DateTime<Utc>) -> anyhow::Result<ConsumeOutcome>;
}

/// Session lifetimes
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    /// Time a token stays usable after issue
    pub ttl: Duration,
    /// Extra time an expired token is remembered so late scans report expiry
    pub retention: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(5),
            retention: Duration::hours(1),
        }
    }
}

/// QR session authority
#[derive(Clone)]
pub struct QrSessionAuthority {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    policy: SessionPolicy,
}

impl QrSessionAuthority {
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>, policy: SessionPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    /// Issue a new unguessable token
    pub async fn issue(&self) -> Result<SessionToken, SessionError> {
        let issued_at = self.clock.now();
        let token = SessionToken {
            token: generate_token(),
            issued_at,
            expires_at: issued_at + self.policy.ttl,
            consumed: false,
        };

        self.store
            .insert(&token, self.policy.ttl + self.policy.retention)
            .await?;

        info!("Issued QR session expiring at {}", token.expires_at);
        Ok(token)
    }

    /// Validate a presented token and mark it consumed
    pub async fn validate_and_consume(&self, token: &str) -> Result<SessionContext, SessionError> {
        let token = token.trim();
        if token.is_empty() || token.len() > MAX_PRESENTED_TOKEN_LENGTH {
            return Err(SessionError::NotFound);
        }

        let now = self.clock.now();
        match self.store.consume(token, now).await? {
            ConsumeOutcome::Consumed => Ok(SessionContext {
                token: token.to_string(),
                consumed_at: now,
            }),
            ConsumeOutcome::Expired => {
                warn!("Rejected expired QR session");
                Err(SessionError::Expired)
            }
            ConsumeOutcome::AlreadyUsed => {
                warn!("Rejected replayed QR session");
                Err(SessionError::AlreadyUsed)
            }
            ConsumeOutcome::NotFound => Err(SessionError::NotFound),
        }
    }
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
