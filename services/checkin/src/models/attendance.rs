//! Attendance record model and the derived worked-hours figure

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::ShiftId;

const MICROS_PER_HOUR: i64 = 3_600_000_000;

/// Worked time of a closed attendance
///
/// The exact span is kept in microseconds, the precision of `timestamptz`;
/// the public figure is hours with two decimals (`8.5` for 8h30m).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HoursWorked {
    micros: i64,
}

impl HoursWorked {
    /// Span between check-in and check-out, `None` unless strictly positive
    pub fn between(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> Option<Self> {
        (check_out - check_in)
            .num_microseconds()
            .and_then(Self::from_micros)
    }

    /// Rebuild from a stored span; rejects non-positive values
    pub fn from_micros(micros: i64) -> Option<Self> {
        (micros > 0).then_some(Self { micros })
    }

    pub fn micros(&self) -> i64 {
        self.micros
    }

    /// Hundredths of an hour, rounded half up
    pub fn centi_hours(&self) -> i64 {
        let centi = i128::from(self.micros) * 100 + i128::from(MICROS_PER_HOUR / 2);
        (centi / i128::from(MICROS_PER_HOUR)) as i64
    }

    pub fn hours(&self) -> f64 {
        self.centi_hours() as f64 / 100.0
    }
}

impl Serialize for HoursWorked {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.hours())
    }
}

/// Presence of one identity on one shift, open until checked out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: Uuid,
    pub identity_id: Uuid,
    pub shift_id: ShiftId,
    pub check_in: DateTime<Utc>,
    pub check_out: Option<DateTime<Utc>>,
    pub hours_worked: Option<HoursWorked>,
}

impl Attendance {
    /// New open record
    pub fn open(identity_id: Uuid, shift_id: ShiftId, check_in: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity_id,
            shift_id,
            check_in,
            check_out: None,
            hours_worked: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.check_out.is_none()
    }

    /// The closed version of this record
    ///
    /// Fails with `AlreadyClosed` on a closed record and with `Validation`
    /// when `at` does not come strictly after the check-in.
    pub fn close(&self, at: DateTime<Utc>) -> Result<Attendance, LedgerError> {
        if !self.is_open() {
            return Err(LedgerError::AlreadyClosed(self.id));
        }

        let hours = HoursWorked::between(self.check_in, at).ok_or_else(|| {
            LedgerError::Validation(format!(
                "check-out {} must come after check-in {}",
                at.to_rfc3339(),
                self.check_in.to_rfc3339()
            ))
        })?;

        Ok(Attendance {
            check_out: Some(at),
            hours_worked: Some(hours),
            ..self.clone()
        })
    }

    pub fn cursor(&self) -> AttendanceCursor {
        AttendanceCursor {
            check_in: self.check_in,
            id: self.id,
        }
    }
}

/// Attendance joined with the identity's display name for daily views
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceView {
    pub id: Uuid,
    pub identity_id: Uuid,
    pub display_name: String,
    pub shift_id: ShiftId,
    pub check_in: DateTime<Utc>,
    pub check_out: Option<DateTime<Utc>>,
    pub hours_worked: Option<HoursWorked>,
}

impl AttendanceView {
    pub fn new(attendance: Attendance, display_name: String) -> Self {
        Self {
            id: attendance.id,
            identity_id: attendance.identity_id,
            display_name,
            shift_id: attendance.shift_id,
            check_in: attendance.check_in,
            check_out: attendance.check_out,
            hours_worked: attendance.hours_worked,
        }
    }
}

/// Position in the `(check_in, id)` ordering, used to resume a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AttendanceCursor {
    pub check_in: DateTime<Utc>,
    pub id: Uuid,
}

/// One page of a listing; `next` is set when more records may follow
#[derive(Debug, Clone, Default)]
pub struct AttendancePage {
    pub items: Vec<Attendance>,
    pub next: Option<AttendanceCursor>,
}
