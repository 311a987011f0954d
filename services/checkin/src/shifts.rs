//! Read-only access to the externally scheduled shifts

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{Shift, ShiftId};

#[async_trait]
pub trait ShiftCatalog: Send + Sync {
    async fn find(&self, id: ShiftId) -> anyhow::Result<Option<Shift>>;

    /// Shifts ordered by `(date, id)`, only those on `date` when given
    async fn list(&self, date: Option<NaiveDate>) -> anyhow::Result<Vec<Shift>>;
}
