//! Shift repository (read-only)

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    models::{Shift, ShiftId},
    shifts::ShiftCatalog,
};

/// PostgreSQL shift catalog
#[derive(Clone)]
pub struct PgShiftCatalog {
    pool: PgPool,
}

impl PgShiftCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn shift_from_row(row: &PgRow) -> Shift {
    Shift {
        id: row.get("id"),
        date: row.get("date"),
        shift_type: row.get("type"),
        group: row.get("nurse_group"),
    }
}

#[async_trait]
impl ShiftCatalog for PgShiftCatalog {
    async fn find(&self, id: ShiftId) -> anyhow::Result<Option<Shift>> {
        let row = sqlx::query(
            r#"
            SELECT id, date, type, nurse_group
            FROM shifts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(shift_from_row))
    }

    async fn list(&self, date: Option<NaiveDate>) -> anyhow::Result<Vec<Shift>> {
        let rows = sqlx::query(
            r#"
            SELECT id, date, type, nurse_group
            FROM shifts
            WHERE $1::date IS NULL OR date = $1
            ORDER BY date, id
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(shift_from_row).collect())
    }
}
