//! Check-in / check-out engine
//!
//! Per `(identity, shift)` an attendance moves NO_RECORD → OPEN → CLOSED.
//! Every operation runs its steps so that the ledger write comes last: when
//! an earlier step fails nothing has been written. A consumed session token
//! stays consumed even if a later step fails.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    clock::Clock,
    directory::IdentityDirectory,
    error::{CheckinError, CheckinResult},
    ledger::AttendanceLedger,
    models::{Attendance, Identity, Resolution, SessionToken, Shift, ShiftId},
    session::QrSessionAuthority,
    shifts::ShiftCatalog,
};

/// Who is checking in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityRef {
    /// Identity id returned by a previous validate or register call
    Id(Uuid),
    /// National id as typed by the person
    NationalId(String),
}

/// Check-in engine
#[derive(Clone)]
pub struct CheckinEngine {
    directory: IdentityDirectory,
    sessions: QrSessionAuthority,
    ledger: AttendanceLedger,
    shifts: Arc<dyn ShiftCatalog>,
    clock: Arc<dyn Clock>,
}

impl CheckinEngine {
    pub fn new(
        directory: IdentityDirectory,
        sessions: QrSessionAuthority,
        ledger: AttendanceLedger,
        shifts: Arc<dyn ShiftCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            directory,
            sessions,
            ledger,
            shifts,
            clock,
        }
    }

    /// Issue a QR session token
    pub async fn issue_session(&self) -> CheckinResult<SessionToken> {
        Ok(self.sessions.issue().await?)
    }

    /// Scheduled shifts a check-in may refer to, optionally for one date
    pub async fn list_shifts(&self, date: Option<NaiveDate>) -> CheckinResult<Vec<Shift>> {
        self.shifts.list(date).await.map_err(CheckinError::Storage)
    }

    /// First step of the login protocol: is this national id known?
    pub async fn validate_identity(&self, national_id: &str) -> CheckinResult<Resolution> {
        Ok(self.directory.resolve(national_id).await?)
    }

    /// Second step, only after `validate_identity` reported the id unknown
    pub async fn register(
        &self,
        national_id: &str,
        display_name: &str,
        professional_code: Option<&str>,
    ) -> CheckinResult<Identity> {
        Ok(self
            .directory
            .register(national_id, display_name, professional_code)
            .await?)
    }

    /// Open an attendance for `identity` on `shift_id`
    ///
    /// Never registers identities: an unknown one yields `IdentityNotFound`
    /// so the caller can run the registration step and retry.
    pub async fn check_in(
        &self,
        identity: IdentityRef,
        shift_id: ShiftId,
        session_token: Option<&str>,
    ) -> CheckinResult<Attendance> {
        // Malformed input must not burn the token
        let identity = match identity {
            IdentityRef::NationalId(raw) => {
                IdentityRef::NationalId(self.directory.normalize_national_id(&raw)?)
            }
            id => id,
        };
        if shift_id <= 0 {
            return Err(CheckinError::Validation(format!(
                "shift id must be positive, got {}",
                shift_id
            )));
        }

        if let Some(token) = session_token {
            self.sessions.validate_and_consume(token).await?;
        }

        let identity = match identity {
            IdentityRef::Id(id) => self.directory.get(id).await?,
            IdentityRef::NationalId(national_id) => {
                match self.directory.resolve(&national_id).await? {
                    Resolution::Found(identity) => Some(identity),
                    Resolution::NotFound => None,
                }
            }
        }
        .ok_or(CheckinError::IdentityNotFound)?;

        let shift = self
            .shifts
            .find(shift_id)
            .await
            .map_err(CheckinError::Storage)?
            .ok_or(CheckinError::ShiftNotFound(shift_id))?;

        let record = self
            .ledger
            .open_record(identity.id, shift.id, self.clock.now())
            .await
            .inspect_err(|e| warn!("Check-in of {} on shift {} refused: {}", identity.id, shift.id, e))?;

        info!("Identity {} checked in on shift {}", identity.id, shift.id);
        Ok(record)
    }

    /// Close the attendance with the given id
    pub async fn check_out(
        &self,
        attendance_id: Uuid,
        session_token: Option<&str>,
    ) -> CheckinResult<Attendance> {
        if let Some(token) = session_token {
            self.sessions.validate_and_consume(token).await?;
        }

        let record = self
            .ledger
            .close_by_id(attendance_id, self.clock.now())
            .await?;

        info!(
            "Attendance {} checked out after {} hours",
            record.id,
            record.hours_worked.map(|h| h.hours()).unwrap_or_default()
        );
        Ok(record)
    }

    /// Close the open attendance of `identity_id` on `shift_id`
    pub async fn check_out_shift(
        &self,
        identity_id: Uuid,
        shift_id: ShiftId,
        session_token: Option<&str>,
    ) -> CheckinResult<Attendance> {
        if let Some(token) = session_token {
            self.sessions.validate_and_consume(token).await?;
        }

        Ok(self
            .ledger
            .close_record(identity_id, shift_id, self.clock.now())
            .await?)
    }
}
