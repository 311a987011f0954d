//! Application state shared across handlers

use std::sync::Arc;

use crate::{
    clock::Clock,
    config::ServiceConfig,
    directory::{IdentityDirectory, IdentityStore},
    engine::CheckinEngine,
    ledger::{AttendanceLedger, AttendanceStore},
    models::Shift,
    projector::DailyViewProjector,
    repositories::{
        InMemoryAttendanceStore, InMemoryIdentityStore, InMemorySessionStore, InMemoryShiftCatalog,
    },
    session::{QrSessionAuthority, SessionStore},
    shifts::ShiftCatalog,
};

/// Storage behind the components
#[derive(Clone)]
pub struct Backends {
    pub identities: Arc<dyn IdentityStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub attendances: Arc<dyn AttendanceStore>,
    pub shifts: Arc<dyn ShiftCatalog>,
}

impl Backends {
    /// Process-local storage over a fixed shift catalog
    pub fn in_memory(shifts: impl IntoIterator<Item = Shift>) -> Self {
        Self {
            identities: Arc::new(InMemoryIdentityStore::default()),
            sessions: Arc::new(InMemorySessionStore::default()),
            attendances: Arc::new(InMemoryAttendanceStore::default()),
            shifts: Arc::new(InMemoryShiftCatalog::new(shifts)),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: CheckinEngine,
    pub projector: DailyViewProjector,
}

impl AppState {
    /// Wire the components over the given storage
    pub fn new(backends: Backends, clock: Arc<dyn Clock>, config: &ServiceConfig) -> Self {
        let directory =
            IdentityDirectory::new(backends.identities, config.national_id_policy, clock.clone());
        let sessions = QrSessionAuthority::new(backends.sessions, clock.clone(), config.session);
        let ledger = AttendanceLedger::new(backends.attendances);

        let projector = DailyViewProjector::new(
            ledger.clone(),
            directory.clone(),
            clock.clone(),
            config.timezone,
        );
        let engine = CheckinEngine::new(directory, sessions, ledger, backends.shifts, clock);

        Self { engine, projector }
    }
}
