//! In-memory stores
//!
//! Each store keeps its state behind one async mutex, which serializes every
//! operation and therefore every per-key transition. Used by the test suites
//! and for embedding the engine without external services.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    directory::IdentityStore,
    error::{DirectoryError, LedgerError},
    ledger::AttendanceStore,
    models::{Attendance, AttendanceCursor, AttendancePage, Identity, SessionToken, Shift, ShiftId},
    session::{ConsumeOutcome, SessionStore},
    shifts::ShiftCatalog,
};

/// Identity store backed by a map
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityStore {
    identities: Arc<Mutex<HashMap<Uuid, Identity>>>,
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_by_national_id(&self, national_id: &str) -> anyhow::Result<Option<Identity>> {
        let identities = self.identities.lock().await;
        Ok(identities
            .values()
            .find(|identity| identity.national_id == national_id)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Identity>> {
        Ok(self.identities.lock().await.get(&id).cloned())
    }

    async fn insert(&self, identity: &Identity) -> Result<(), DirectoryError> {
        let mut identities = self.identities.lock().await;
        if identities
            .values()
            .any(|existing| existing.national_id == identity.national_id)
        {
            return Err(DirectoryError::Conflict);
        }
        identities.insert(identity.id, identity.clone());
        Ok(())
    }
}

#[derive(Debug)]
struct StoredToken {
    token: SessionToken,
    forget_after: DateTime<Utc>,
}

/// Session store backed by a map; forgotten tokens are purged on insert
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    tokens: Arc<Mutex<HashMap<String, StoredToken>>>,
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, token: &SessionToken, retain_for: Duration) -> anyhow::Result<()> {
        let mut tokens = self.tokens.lock().await;
        tokens.retain(|_, stored| stored.forget_after > token.issued_at);
        tokens.insert(
            token.token.clone(),
            StoredToken {
                token: token.clone(),
                forget_after: token.issued_at + retain_for,
            },
        );
        Ok(())
    }

    async fn consume(&self, token: &str, now: DateTime<Utc>) -> anyhow::Result<ConsumeOutcome> {
        let mut tokens = self.tokens.lock().await;

        let stored = match tokens.get_mut(token) {
            Some(stored) if stored.forget_after > now => stored,
            _ => return Ok(ConsumeOutcome::NotFound),
        };

        if stored.token.consumed {
            return Ok(ConsumeOutcome::AlreadyUsed);
        }
        if stored.token.is_expired_at(now) {
            return Ok(ConsumeOutcome::Expired);
        }

        stored.token.consumed = true;
        Ok(ConsumeOutcome::Consumed)
    }
}

/// Attendance store backed by a map
#[derive(Debug, Clone, Default)]
pub struct InMemoryAttendanceStore {
    records: Arc<Mutex<HashMap<Uuid, Attendance>>>,
}

#[async_trait]
impl AttendanceStore for InMemoryAttendanceStore {
    async fn insert_open(&self, record: &Attendance) -> Result<(), LedgerError> {
        let mut records = self.records.lock().await;

        let open_exists = records.values().any(|existing| {
            existing.is_open()
                && existing.identity_id == record.identity_id
                && existing.shift_id == record.shift_id
        });
        if open_exists {
            return Err(LedgerError::Conflict {
                identity_id: record.identity_id,
                shift_id: record.shift_id,
            });
        }

        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn close_open(
        &self,
        identity_id: Uuid,
        shift_id: ShiftId,
        at: DateTime<Utc>,
    ) -> Result<Attendance, LedgerError> {
        let mut records = self.records.lock().await;

        let record = records
            .values_mut()
            .find(|r| r.is_open() && r.identity_id == identity_id && r.shift_id == shift_id)
            .ok_or(LedgerError::NotFound)?;

        let closed = record.close(at)?;
        *record = closed.clone();
        Ok(closed)
    }

    async fn close_by_id(&self, id: Uuid, at: DateTime<Utc>) -> Result<Attendance, LedgerError> {
        let mut records = self.records.lock().await;

        let record = records.get_mut(&id).ok_or(LedgerError::NotFound)?;
        let closed = record.close(at)?;
        *record = closed.clone();
        Ok(closed)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Attendance>, LedgerError> {
        Ok(self.records.lock().await.get(&id).cloned())
    }

    async fn list_page(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        after: Option<AttendanceCursor>,
        limit: usize,
    ) -> Result<AttendancePage, LedgerError> {
        let records = self.records.lock().await;

        let mut matching: Vec<Attendance> = records
            .values()
            .filter(|r| r.check_in >= from && r.check_in < until)
            .filter(|r| after.is_none_or(|cursor| r.cursor() > cursor))
            .cloned()
            .collect();
        matching.sort_by_key(Attendance::cursor);

        let has_more = matching.len() > limit;
        matching.truncate(limit);
        let next = if has_more {
            matching.last().map(Attendance::cursor)
        } else {
            None
        };

        Ok(AttendancePage {
            items: matching,
            next,
        })
    }
}

/// Read-only shift catalog seeded at construction
#[derive(Debug, Clone, Default)]
pub struct InMemoryShiftCatalog {
    shifts: Arc<HashMap<ShiftId, Shift>>,
}

impl InMemoryShiftCatalog {
    pub fn new(shifts: impl IntoIterator<Item = Shift>) -> Self {
        Self {
            shifts: Arc::new(shifts.into_iter().map(|s| (s.id, s)).collect()),
        }
    }
}

#[async_trait]
impl ShiftCatalog for InMemoryShiftCatalog {
    async fn find(&self, id: ShiftId) -> anyhow::Result<Option<Shift>> {
        Ok(self.shifts.get(&id).cloned())
    }

    async fn list(&self, date: Option<NaiveDate>) -> anyhow::Result<Vec<Shift>> {
        let mut shifts: Vec<Shift> = self
            .shifts
            .values()
            .filter(|shift| date.is_none_or(|date| shift.date == date))
            .cloned()
            .collect();
        shifts.sort_by_key(|shift| (shift.date, shift.id));
        Ok(shifts)
    }
}
