//! Daily view projector
//!
//! Read-only views over one operational day, joined with display names.

use chrono::NaiveDate;
use chrono_tz::Tz;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use crate::{
    calendar,
    clock::Clock,
    directory::IdentityDirectory,
    error::CheckinResult,
    ledger::AttendanceLedger,
    models::AttendanceView,
};

const UNKNOWN_NAME: &str = "Unknown";

#[derive(Clone)]
pub struct DailyViewProjector {
    ledger: AttendanceLedger,
    directory: IdentityDirectory,
    clock: Arc<dyn Clock>,
    timezone: Tz,
}

impl DailyViewProjector {
    pub fn new(
        ledger: AttendanceLedger,
        directory: IdentityDirectory,
        clock: Arc<dyn Clock>,
        timezone: Tz,
    ) -> Self {
        Self {
            ledger,
            directory,
            clock,
            timezone,
        }
    }

    /// Current operational date
    pub fn today(&self) -> NaiveDate {
        calendar::operational_date(self.timezone, self.clock.now())
    }

    /// Everyone's attendances checked in today
    pub async fn today_all(&self) -> CheckinResult<Vec<AttendanceView>> {
        self.on_date(self.today(), None).await
    }

    /// Attendances of `identity_id` checked in today
    pub async fn today_mine(&self, identity_id: Uuid) -> CheckinResult<Vec<AttendanceView>> {
        self.on_date(self.today(), Some(identity_id)).await
    }

    /// Attendances checked in on `date`, optionally for one identity,
    /// ordered by check-in time
    pub async fn on_date(
        &self,
        date: NaiveDate,
        identity_id: Option<Uuid>,
    ) -> CheckinResult<Vec<AttendanceView>> {
        let mut listing = self.ledger.list_by_date(date, self.timezone);
        let mut names: HashMap<Uuid, String> = HashMap::new();
        let mut views = Vec::new();

        while let Some(page) = listing.next_page().await? {
            for attendance in page {
                if identity_id.is_some_and(|id| id != attendance.identity_id) {
                    continue;
                }

                let name = match names.get(&attendance.identity_id) {
                    Some(name) => name.clone(),
                    None => {
                        let name = self
                            .directory
                            .get(attendance.identity_id)
                            .await?
                            .map(|identity| identity.display_name)
                            .unwrap_or_else(|| UNKNOWN_NAME.to_string());
                        names.insert(attendance.identity_id, name.clone());
                        name
                    }
                };

                views.push(AttendanceView::new(attendance, name));
            }
        }

        Ok(views)
    }
}
