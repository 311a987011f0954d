//! Identity directory
//!
//! Resolves national ids to identities and registers new ones. Format checks
//! run before any lookup; uniqueness of the national id is enforced by the
//! backing [`IdentityStore`], which also settles concurrent registrations.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::DirectoryError,
    models::{Identity, NewIdentity, Resolution},
    validation::{self, NationalIdPolicy},
};

/// Persistence for identities
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_national_id(&self, national_id: &str) -> anyhow::Result<Option<Identity>>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Identity>>;

    /// Insert a new identity; `DirectoryError::Conflict` when the national id exists
    async fn insert(&self, identity: &Identity) -> Result<(), DirectoryError>;
}

/// Identity directory service
#[derive(Clone)]
pub struct IdentityDirectory {
    store: Arc<dyn IdentityStore>,
    policy: NationalIdPolicy,
    clock: Arc<dyn Clock>,
}

impl IdentityDirectory {
    pub fn new(store: Arc<dyn IdentityStore>, policy: NationalIdPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            policy,
            clock,
        }
    }

    /// Validate a national id and return its stored form, without any lookup
    pub fn normalize_national_id(&self, national_id: &str) -> Result<String, DirectoryError> {
        validation::validate_national_id(self.policy, national_id).map_err(DirectoryError::Validation)
    }

    /// Look a national id up; never creates anything
    pub async fn resolve(&self, national_id: &str) -> Result<Resolution, DirectoryError> {
        let national_id = self.normalize_national_id(national_id)?;

        match self.store.find_by_national_id(&national_id).await? {
            Some(identity) => Ok(Resolution::Found(identity)),
            None => Ok(Resolution::NotFound),
        }
    }

    /// Register a national id that `resolve` reported as unknown
    pub async fn register(
        &self,
        national_id: &str,
        display_name: &str,
        professional_code: Option<&str>,
    ) -> Result<Identity, DirectoryError> {
        let new_identity = NewIdentity {
            national_id: self.normalize_national_id(national_id)?,
            display_name: validation::validate_display_name(display_name)
                .map_err(DirectoryError::Validation)?,
            professional_code: validation::validate_professional_code(professional_code)
                .map_err(DirectoryError::Validation)?,
        };

        if self
            .store
            .find_by_national_id(&new_identity.national_id)
            .await?
            .is_some()
        {
            return Err(DirectoryError::Conflict);
        }

        let identity = new_identity.into_identity(self.clock.now());
        self.store.insert(&identity).await?;

        info!("Registered identity {}", identity.id);
        Ok(identity)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Identity>, DirectoryError> {
        Ok(self.store.find_by_id(id).await?)
    }
}
