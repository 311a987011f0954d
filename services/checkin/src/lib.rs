//! Shift attendance check-in service
//!
//! Staff scan a short-lived QR session, identify themselves by national id
//! and open or close an attendance record on a scheduled shift. The daily
//! view lists the records of one operational day in the configured zone.

pub mod calendar;
pub mod clock;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod models;
pub mod projector;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod shifts;
pub mod state;
pub mod validation;
