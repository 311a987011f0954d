//! Attendance ledger
//!
//! Append-mostly record of attendances. A record is written once when it is
//! opened and updated once when it is closed. Stores guarantee that opening
//! and closing are serialized per `(identity, shift)` key.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::{
    calendar,
    error::LedgerError,
    models::{Attendance, AttendanceCursor, AttendancePage, ShiftId},
};

/// Default page size for daily listings
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Persistence for attendance records
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Insert an open record; `Conflict` if the key already has one open
    async fn insert_open(&self, record: &Attendance) -> Result<(), LedgerError>;

    /// Close the open record of a key; `NotFound` if there is none
    async fn close_open(
        &self,
        identity_id: Uuid,
        shift_id: ShiftId,
        at: DateTime<Utc>,
    ) -> Result<Attendance, LedgerError>;

    /// Close a record by id; `NotFound` if unknown, `AlreadyClosed` if closed
    async fn close_by_id(&self, id: Uuid, at: DateTime<Utc>) -> Result<Attendance, LedgerError>;

    async fn get(&self, id: Uuid) -> Result<Option<Attendance>, LedgerError>;

    /// Records with `from <= check_in < until`, ordered by `(check_in, id)`,
    /// strictly after `after` when given
    async fn list_page(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        after: Option<AttendanceCursor>,
        limit: usize,
    ) -> Result<AttendancePage, LedgerError>;
}

/// Attendance ledger service
#[derive(Clone)]
pub struct AttendanceLedger {
    store: Arc<dyn AttendanceStore>,
}

impl AttendanceLedger {
    pub fn new(store: Arc<dyn AttendanceStore>) -> Self {
        Self { store }
    }

    /// Open a record for `(identity_id, shift_id)` checked in at `at`
    pub async fn open_record(
        &self,
        identity_id: Uuid,
        shift_id: ShiftId,
        at: DateTime<Utc>,
    ) -> Result<Attendance, LedgerError> {
        let record = Attendance::open(identity_id, shift_id, at);
        self.store.insert_open(&record).await?;

        info!(
            "Opened attendance {} for identity {} on shift {}",
            record.id, identity_id, shift_id
        );
        Ok(record)
    }

    /// Close the open record of `(identity_id, shift_id)`
    pub async fn close_record(
        &self,
        identity_id: Uuid,
        shift_id: ShiftId,
        at: DateTime<Utc>,
    ) -> Result<Attendance, LedgerError> {
        let record = self.store.close_open(identity_id, shift_id, at).await?;
        info!("Closed attendance {}", record.id);
        Ok(record)
    }

    /// Close the record with the given id
    pub async fn close_by_id(&self, id: Uuid, at: DateTime<Utc>) -> Result<Attendance, LedgerError> {
        let record = self.store.close_by_id(id, at).await?;
        info!("Closed attendance {}", record.id);
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Attendance>, LedgerError> {
        self.store.get(id).await
    }

    /// Lazy listing of the records checked in on `date` in `tz`
    pub fn list_by_date(&self, date: NaiveDate, tz: Tz) -> DailyListing {
        let (from, until) = calendar::day_bounds(tz, date);
        DailyListing {
            store: self.store.clone(),
            from,
            until,
            cursor: None,
            exhausted: false,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Restartable, page-at-a-time read over one operational day
///
/// Nothing is fetched until [`DailyListing::next_page`] is called. The
/// cursor of the last delivered record can be fed to
/// [`DailyListing::resume_after`] on a new listing to continue from there.
pub struct DailyListing {
    store: Arc<dyn AttendanceStore>,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
    cursor: Option<AttendanceCursor>,
    exhausted: bool,
    page_size: usize,
}

impl DailyListing {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn resume_after(mut self, cursor: AttendanceCursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Position after the last delivered record
    pub fn cursor(&self) -> Option<AttendanceCursor> {
        self.cursor
    }

    /// Next batch in `(check_in, id)` order, `None` once exhausted
    pub async fn next_page(&mut self) -> Result<Option<Vec<Attendance>>, LedgerError> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self
            .store
            .list_page(self.from, self.until, self.cursor, self.page_size)
            .await?;

        if let Some(last) = page.items.last() {
            self.cursor = Some(last.cursor());
        }
        if page.next.is_none() {
            self.exhausted = true;
        }

        if page.items.is_empty() {
            Ok(None)
        } else {
            Ok(Some(page.items))
        }
    }

    /// Drain the remaining pages
    pub async fn collect_all(mut self) -> Result<Vec<Attendance>, LedgerError> {
        let mut records = Vec::new();
        while let Some(page) = self.next_page().await? {
            records.extend(page);
        }
        Ok(records)
    }
}
