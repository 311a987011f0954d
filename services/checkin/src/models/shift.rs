//! Shift model
//!
//! Shifts are owned by the scheduling system. The check-in service reads
//! them to validate a shift reference and never writes them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type ShiftId = i64;

/// Scheduled shift
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub id: ShiftId,
    pub date: NaiveDate,
    /// e.g. `day_shift`, `night_shift`, `routine`
    #[serde(rename = "type")]
    pub shift_type: String,
    /// Nurse group rotation, e.g. `3-4`
    pub group: Option<String>,
}
