//! Check-in service models

pub mod attendance;
pub mod identity;
pub mod session;
pub mod shift;

// Re-export for convenience
pub use attendance::{Attendance, AttendanceCursor, AttendancePage, AttendanceView, HoursWorked};
pub use identity::{Identity, NewIdentity, Resolution};
pub use session::{SessionContext, SessionToken};
pub use shift::{Shift, ShiftId};
