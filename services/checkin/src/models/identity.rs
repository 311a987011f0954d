//! Identity model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Staff identity, keyed by normalized national id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub national_id: String,
    pub display_name: String,
    pub professional_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// New identity registration payload, already validated and normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
    pub national_id: String,
    pub display_name: String,
    pub professional_code: Option<String>,
}

impl NewIdentity {
    /// Materialize the identity with a fresh id
    pub fn into_identity(self, created_at: DateTime<Utc>) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            national_id: self.national_id,
            display_name: self.display_name,
            professional_code: self.professional_code,
            created_at,
        }
    }
}

/// Outcome of looking a national id up in the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(Identity),
    NotFound,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Resolution::Found(identity) => Some(identity),
            Resolution::NotFound => None,
        }
    }
}
