//! Storage adapters for the directory, session authority, ledger and shifts

pub mod attendance;
pub mod identity;
pub mod memory;
pub mod session;
pub mod shift;

pub use attendance::PgAttendanceStore;
pub use identity::PgIdentityStore;
pub use memory::{
    InMemoryAttendanceStore, InMemoryIdentityStore, InMemorySessionStore, InMemoryShiftCatalog,
};
pub use session::RedisSessionStore;
pub use shift::PgShiftCatalog;
