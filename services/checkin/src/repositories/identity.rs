//! Identity repository for database operations

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::{directory::IdentityStore, error::DirectoryError, models::Identity};

/// PostgreSQL identity store
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    /// Create a new identity repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn identity_from_row(row: &PgRow) -> Identity {
    Identity {
        id: row.get("id"),
        national_id: row.get("national_id"),
        display_name: row.get("display_name"),
        professional_code: row.get("professional_code"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_national_id(&self, national_id: &str) -> anyhow::Result<Option<Identity>> {
        let row = sqlx::query(
            r#"
            SELECT id, national_id, display_name, professional_code, created_at
            FROM identities
            WHERE national_id = $1
            "#,
        )
        .bind(national_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(identity_from_row))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Identity>> {
        let row = sqlx::query(
            r#"
            SELECT id, national_id, display_name, professional_code, created_at
            FROM identities
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(identity_from_row))
    }

    async fn insert(&self, identity: &Identity) -> Result<(), DirectoryError> {
        info!("Inserting identity {}", identity.id);

        let result = sqlx::query(
            r#"
            INSERT INTO identities (id, national_id, display_name, professional_code, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(identity.id)
        .bind(&identity.national_id)
        .bind(&identity.display_name)
        .bind(&identity.professional_code)
        .bind(identity.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(DirectoryError::Conflict)
            }
            Err(e) => Err(DirectoryError::Storage(e.into())),
        }
    }
}
