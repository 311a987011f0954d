//! Error types for the check-in service
//!
//! Each component reports its own error enum. The engine folds them into
//! [`CheckinError`], which is what the HTTP layer turns into a response.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use crate::models::ShiftId;

/// Identity directory failures
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("national id is already registered")]
    Conflict,

    #[error("directory storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// QR session failures; every variant means the caller must scan a new code
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session token has expired")]
    Expired,

    #[error("session token was already used")]
    AlreadyUsed,

    #[error("session token is unknown")]
    NotFound,

    #[error("session storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Attendance ledger failures
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("an open attendance already exists for identity {identity_id} on shift {shift_id}")]
    Conflict { identity_id: Uuid, shift_id: ShiftId },

    #[error("no open attendance found")]
    NotFound,

    #[error("attendance {0} is already closed")]
    AlreadyClosed(Uuid),

    #[error("invalid attendance transition: {0}")]
    Validation(String),

    #[error("ledger storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Errors surfaced by the check-in engine
#[derive(Error, Debug)]
pub enum CheckinError {
    #[error("{0}")]
    Validation(String),

    #[error("national id is already registered")]
    IdentityConflict,

    #[error("identity not found")]
    IdentityNotFound,

    #[error("shift {0} not found")]
    ShiftNotFound(ShiftId),

    #[error("already checked in on this shift")]
    AlreadyCheckedIn,

    #[error("session expired, scan a new code")]
    ExpiredSession,

    #[error("session already used, scan a new code")]
    AlreadyUsedSession,

    #[error("session not found, scan a new code")]
    SessionNotFound,

    #[error("not checked in")]
    NotCheckedIn,

    #[error("already checked out")]
    AlreadyCheckedOut,

    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),
}

impl CheckinError {
    /// Stable code reported to clients
    pub fn code(&self) -> &'static str {
        match self {
            CheckinError::Validation(_) => "ValidationError",
            CheckinError::IdentityConflict => "IdentityConflict",
            CheckinError::IdentityNotFound => "IdentityNotFound",
            CheckinError::ShiftNotFound(_) => "ShiftNotFound",
            CheckinError::AlreadyCheckedIn => "AlreadyCheckedIn",
            CheckinError::ExpiredSession => "ExpiredSession",
            CheckinError::AlreadyUsedSession => "AlreadyUsedSession",
            CheckinError::SessionNotFound => "SessionNotFound",
            CheckinError::NotCheckedIn => "NotCheckedIn",
            CheckinError::AlreadyCheckedOut => "AlreadyCheckedOut",
            CheckinError::Storage(_) => "InternalError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CheckinError::Validation(_) => StatusCode::BAD_REQUEST,
            CheckinError::IdentityNotFound
            | CheckinError::ShiftNotFound(_)
            | CheckinError::SessionNotFound
            | CheckinError::NotCheckedIn => StatusCode::NOT_FOUND,
            CheckinError::IdentityConflict
            | CheckinError::AlreadyCheckedIn
            | CheckinError::AlreadyUsedSession
            | CheckinError::AlreadyCheckedOut => StatusCode::CONFLICT,
            CheckinError::ExpiredSession => StatusCode::GONE,
            CheckinError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DirectoryError> for CheckinError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Validation(msg) => CheckinError::Validation(msg),
            DirectoryError::Conflict => CheckinError::IdentityConflict,
            DirectoryError::Storage(e) => CheckinError::Storage(e),
        }
    }
}

impl From<SessionError> for CheckinError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Expired => CheckinError::ExpiredSession,
            SessionError::AlreadyUsed => CheckinError::AlreadyUsedSession,
            SessionError::NotFound => CheckinError::SessionNotFound,
            SessionError::Storage(e) => CheckinError::Storage(e),
        }
    }
}

impl From<LedgerError> for CheckinError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Conflict { .. } => CheckinError::AlreadyCheckedIn,
            LedgerError::NotFound => CheckinError::NotCheckedIn,
            LedgerError::AlreadyClosed(_) => CheckinError::AlreadyCheckedOut,
            LedgerError::Validation(msg) => CheckinError::Validation(msg),
            LedgerError::Storage(e) => CheckinError::Storage(e),
        }
    }
}

impl IntoResponse for CheckinError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            CheckinError::Storage(e) => {
                error!("Storage failure: {:#}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": self.code(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for engine results
pub type CheckinResult<T> = Result<T, CheckinError>;
