//! QR session token model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Short-lived, single-use proof that a QR code was scanned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
}

impl SessionToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Granted by a successful consumption; good for exactly one check-in or check-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub token: String,
    pub consumed_at: DateTime<Utc>,
}
