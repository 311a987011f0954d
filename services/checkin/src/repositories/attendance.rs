//! Attendance repository for database operations
//!
//! The partial unique index `attendances_one_open_per_shift` rejects a
//! second open record for a key. Closing locks the row with `FOR UPDATE`
//! inside a transaction, so two concurrent closes cannot both succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::LedgerError,
    ledger::AttendanceStore,
    models::{Attendance, AttendanceCursor, AttendancePage, HoursWorked, ShiftId},
};

/// PostgreSQL attendance store
#[derive(Clone)]
pub struct PgAttendanceStore {
    pool: PgPool,
}

impl PgAttendanceStore {
    /// Create a new attendance repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Write the closing fields of a locked record and commit
    async fn commit_close(
        mut tx: Transaction<'_, Postgres>,
        record: &Attendance,
        at: DateTime<Utc>,
    ) -> Result<Attendance, LedgerError> {
        let closed = record.close(at)?;

        sqlx::query(
            r#"
            UPDATE attendances
            SET check_out = $2, worked_micros = $3
            WHERE id = $1 AND check_out IS NULL
            "#,
        )
        .bind(closed.id)
        .bind(closed.check_out)
        .bind(closed.hours_worked.map(|h| h.micros()))
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        tx.commit().await.map_err(storage)?;
        Ok(closed)
    }
}

fn storage(e: sqlx::Error) -> LedgerError {
    LedgerError::Storage(e.into())
}

fn attendance_from_row(row: &PgRow) -> Attendance {
    let worked_micros: Option<i64> = row.get("worked_micros");
    let id: Uuid = row.get("id");

    let hours_worked = worked_micros.and_then(|micros| {
        let hours = HoursWorked::from_micros(micros);
        if hours.is_none() {
            warn!("Attendance {} has a non-positive worked span", id);
        }
        hours
    });

    Attendance {
        id,
        identity_id: row.get("identity_id"),
        shift_id: row.get("shift_id"),
        check_in: row.get("check_in"),
        check_out: row.get("check_out"),
        hours_worked,
    }
}

#[async_trait]
impl AttendanceStore for PgAttendanceStore {
    async fn insert_open(&self, record: &Attendance) -> Result<(), LedgerError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendances (id, identity_id, shift_id, check_in)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(record.id)
        .bind(record.identity_id)
        .bind(record.shift_id)
        .bind(record.check_in)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(LedgerError::Conflict {
                    identity_id: record.identity_id,
                    shift_id: record.shift_id,
                })
            }
            Err(e) => Err(storage(e)),
        }
    }

    async fn close_open(
        &self,
        identity_id: Uuid,
        shift_id: ShiftId,
        at: DateTime<Utc>,
    ) -> Result<Attendance, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let row = sqlx::query(
            r#"
            SELECT id, identity_id, shift_id, check_in, check_out, worked_micros
            FROM attendances
            WHERE identity_id = $1 AND shift_id = $2 AND check_out IS NULL
            FOR UPDATE
            "#,
        )
        .bind(identity_id)
        .bind(shift_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?
        .ok_or(LedgerError::NotFound)?;

        let record = attendance_from_row(&row);
        Self::commit_close(tx, &record, at).await
    }

    async fn close_by_id(&self, id: Uuid, at: DateTime<Utc>) -> Result<Attendance, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let row = sqlx::query(
            r#"
            SELECT id, identity_id, shift_id, check_in, check_out, worked_micros
            FROM attendances
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?
        .ok_or(LedgerError::NotFound)?;

        let record = attendance_from_row(&row);
        Self::commit_close(tx, &record, at).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Attendance>, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT id, identity_id, shift_id, check_in, check_out, worked_micros
            FROM attendances
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        Ok(row.as_ref().map(attendance_from_row))
    }

    async fn list_page(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        after: Option<AttendanceCursor>,
        limit: usize,
    ) -> Result<AttendancePage, LedgerError> {
        // One extra row tells whether another page follows
        let rows = sqlx::query(
            r#"
            SELECT id, identity_id, shift_id, check_in, check_out, worked_micros
            FROM attendances
            WHERE check_in >= $1 AND check_in < $2
              AND ($3::timestamptz IS NULL OR (check_in, id) > ($3::timestamptz, $4::uuid))
            ORDER BY check_in, id
            LIMIT $5
            "#,
        )
        .bind(from)
        .bind(until)
        .bind(after.map(|c| c.check_in))
        .bind(after.map(|c| c.id))
        .bind(limit as i64 + 1)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        let mut items: Vec<Attendance> = rows.iter().map(attendance_from_row).collect();
        let has_more = items.len() > limit;
        items.truncate(limit);

        let next = if has_more {
            items.last().map(Attendance::cursor)
        } else {
            None
        };

        Ok(AttendancePage { items, next })
    }
}
