//! Check-in service routes

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    engine::IdentityRef,
    error::CheckinError,
    models::{HoursWorked, ShiftId},
    state::AppState,
};

/// Response for session issue
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Request for identity validation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateIdentityRequest {
    pub national_id: String,
}

/// Response for identity validation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateIdentityResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_id: Option<Uuid>,
}

/// Request for identity registration
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterIdentityRequest {
    pub national_id: String,
    pub name: String,
    pub professional_code: Option<String>,
}

/// Response for identity registration
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterIdentityResponse {
    pub identity_id: Uuid,
}

/// Request for check-in; exactly one of `identity_id` and `national_id`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub identity_id: Option<Uuid>,
    pub national_id: Option<String>,
    pub shift_id: ShiftId,
    pub session_token: Option<String>,
}

/// Response for check-in
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    pub attendance_id: Uuid,
    pub check_in: DateTime<Utc>,
}

/// Request for check-out, by attendance id or by `(identity_id, shift_id)`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutRequest {
    pub attendance_id: Option<Uuid>,
    pub identity_id: Option<Uuid>,
    pub shift_id: Option<ShiftId>,
    pub session_token: Option<String>,
}

/// Response for check-out
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutResponse {
    pub attendance_id: Uuid,
    pub check_out: Option<DateTime<Utc>>,
    pub hours_worked: Option<HoursWorked>,
}

/// Query parameters for attendance listing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceQuery {
    /// Operational date, defaults to today
    pub date: Option<NaiveDate>,
    pub identity_id: Option<Uuid>,
}

/// Query parameters for shift listing
#[derive(Debug, Default, Deserialize)]
pub struct ShiftQuery {
    pub date: Option<NaiveDate>,
}

/// Create the router for the check-in service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/session", get(issue_session))
        .route("/shifts", get(list_shifts))
        .route("/identity/validate", post(validate_identity))
        .route("/identity/register", post(register_identity))
        .route("/attendance/check-in", post(check_in))
        .route("/attendance/check-out", post(check_out))
        .route("/attendance", get(list_attendances))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "checkin-service"
    }))
}

/// Issue a QR session token
pub async fn issue_session(State(state): State<AppState>) -> Result<impl IntoResponse, CheckinError> {
    let session = state.engine.issue_session().await?;

    Ok(Json(SessionResponse {
        token: session.token,
        expires_at: session.expires_at,
    }))
}

/// List scheduled shifts, optionally for one date
pub async fn list_shifts(
    State(state): State<AppState>,
    Query(query): Query<ShiftQuery>,
) -> Result<impl IntoResponse, CheckinError> {
    let shifts = state.engine.list_shifts(query.date).await?;
    Ok(Json(shifts))
}

/// Tell whether a national id is already registered
pub async fn validate_identity(
    State(state): State<AppState>,
    Json(payload): Json<ValidateIdentityRequest>,
) -> Result<impl IntoResponse, CheckinError> {
    let resolution = state.engine.validate_identity(&payload.national_id).await?;

    Ok(Json(ValidateIdentityResponse {
        found: resolution.is_found(),
        identity_id: resolution.identity().map(|identity| identity.id),
    }))
}

/// Register an unknown national id
pub async fn register_identity(
    State(state): State<AppState>,
    Json(payload): Json<RegisterIdentityRequest>,
) -> Result<impl IntoResponse, CheckinError> {
    let identity = state
        .engine
        .register(
            &payload.national_id,
            &payload.name,
            payload.professional_code.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterIdentityResponse {
            identity_id: identity.id,
        }),
    ))
}

/// Open an attendance
pub async fn check_in(
    State(state): State<AppState>,
    Json(payload): Json<CheckInRequest>,
) -> Result<impl IntoResponse, CheckinError> {
    let identity = match (payload.identity_id, payload.national_id) {
        (Some(id), None) => IdentityRef::Id(id),
        (None, Some(national_id)) => IdentityRef::NationalId(national_id),
        _ => {
            return Err(CheckinError::Validation(
                "provide exactly one of identityId and nationalId".to_string(),
            ));
        }
    };

    let attendance = state
        .engine
        .check_in(identity, payload.shift_id, payload.session_token.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckInResponse {
            attendance_id: attendance.id,
            check_in: attendance.check_in,
        }),
    ))
}

/// Close an attendance
pub async fn check_out(
    State(state): State<AppState>,
    Json(payload): Json<CheckOutRequest>,
) -> Result<impl IntoResponse, CheckinError> {
    let token = payload.session_token.as_deref();

    let attendance = match (payload.attendance_id, payload.identity_id, payload.shift_id) {
        (Some(attendance_id), None, None) => state.engine.check_out(attendance_id, token).await?,
        (None, Some(identity_id), Some(shift_id)) => {
            state
                .engine
                .check_out_shift(identity_id, shift_id, token)
                .await?
        }
        _ => {
            return Err(CheckinError::Validation(
                "provide attendanceId, or identityId together with shiftId".to_string(),
            ));
        }
    };

    Ok(Json(CheckOutResponse {
        attendance_id: attendance.id,
        check_out: attendance.check_out,
        hours_worked: attendance.hours_worked,
    }))
}

/// List the attendances of one operational day
pub async fn list_attendances(
    State(state): State<AppState>,
    Query(query): Query<AttendanceQuery>,
) -> Result<impl IntoResponse, CheckinError> {
    let date = query.date.unwrap_or_else(|| state.projector.today());
    info!("Listing attendances for {}", date);

    let views = state.projector.on_date(date, query.identity_id).await?;
    Ok(Json(views))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        config::ServiceConfig,
        models::Shift,
        session::SessionPolicy,
        state::Backends,
        validation::NationalIdPolicy,
    };
    use axum::{body::to_bytes, response::Response};
    use chrono::{Duration, TimeZone};
    use serde_json::Value;
    use std::sync::Arc;

    fn setup() -> (AppState, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 10, 11, 0, 0).unwrap());
        let shift = Shift {
            id: 1,
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            shift_type: "day_shift".to_string(),
            group: None,
        };
        let config = ServiceConfig {
            bind_address: "127.0.0.1:0".to_string(),
            timezone: chrono_tz::America::Sao_Paulo,
            session: SessionPolicy::default(),
            national_id_policy: NationalIdPolicy::Cpf,
        };
        let state = AppState::new(Backends::in_memory([shift]), Arc::new(clock.clone()), &config);
        (state, clock)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register(state: &AppState) -> Uuid {
        let response = register_identity(
            State(state.clone()),
            Json(RegisterIdentityRequest {
                national_id: "529.982.247-25".to_string(),
                name: "Maria Souza".to_string(),
                professional_code: Some("COREN-123".to_string()),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        body["identityId"].as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let body = body_json(health_check().await.into_response()).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_validate_unknown_then_registered() {
        let (state, _) = setup();

        let response = validate_identity(
            State(state.clone()),
            Json(ValidateIdentityRequest {
                national_id: "52998224725".to_string(),
            }),
        )
        .await
        .into_response();
        let body = body_json(response).await;
        assert_eq!(body["found"], false);
        assert!(body.get("identityId").is_none());

        let id = register(&state).await;

        let response = validate_identity(
            State(state),
            Json(ValidateIdentityRequest {
                national_id: "529.982.247-25".to_string(),
            }),
        )
        .await
        .into_response();
        let body = body_json(response).await;
        assert_eq!(body["found"], true);
        assert_eq!(body["identityId"], id.to_string());
    }

    #[tokio::test]
    async fn test_check_in_and_out_with_session() {
        let (state, clock) = setup();
        let id = register(&state).await;

        let body = body_json(issue_session(State(state.clone())).await.into_response()).await;
        let token = body["token"].as_str().unwrap().to_string();

        let response = check_in(
            State(state.clone()),
            Json(CheckInRequest {
                identity_id: Some(id),
                national_id: None,
                shift_id: 1,
                session_token: Some(token.clone()),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        let attendance_id: Uuid = body["attendanceId"].as_str().unwrap().parse().unwrap();

        // Replaying the token is refused
        let response = check_in(
            State(state.clone()),
            Json(CheckInRequest {
                identity_id: Some(id),
                national_id: None,
                shift_id: 1,
                session_token: Some(token),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["error"], "AlreadyUsedSession");

        clock.advance(Duration::minutes(510));
        let response = check_out(
            State(state.clone()),
            Json(CheckOutRequest {
                attendance_id: Some(attendance_id),
                identity_id: None,
                shift_id: None,
                session_token: None,
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["hoursWorked"], 8.5);

        let response = list_attendances(State(state), Query(AttendanceQuery::default()))
            .await
            .into_response();
        let body = body_json(response).await;
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["displayName"], "Maria Souza");
    }

    #[tokio::test]
    async fn test_check_in_requires_exactly_one_identity_reference() {
        let (state, _) = setup();
        let id = register(&state).await;

        let response = check_in(
            State(state),
            Json(CheckInRequest {
                identity_id: Some(id),
                national_id: Some("52998224725".to_string()),
                shift_id: 1,
                session_token: None,
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "ValidationError");
    }

    #[tokio::test]
    async fn test_check_out_by_shift_without_open_record() {
        let (state, _) = setup();
        let id = register(&state).await;

        let response = check_out(
            State(state),
            Json(CheckOutRequest {
                attendance_id: None,
                identity_id: Some(id),
                shift_id: Some(1),
                session_token: None,
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "NotCheckedIn");
    }

    #[tokio::test]
    async fn test_list_shifts() {
        let (state, _) = setup();

        let response = list_shifts(State(state.clone()), Query(ShiftQuery::default()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let shifts = body.as_array().unwrap();
        assert_eq!(shifts.len(), 1);
        assert_eq!(shifts[0]["id"], 1);
        assert_eq!(shifts[0]["type"], "day_shift");

        let other_day = ShiftQuery {
            date: NaiveDate::from_ymd_opt(2025, 3, 11),
        };
        let body = body_json(list_shifts(State(state), Query(other_day)).await.into_response()).await;
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_shift() {
        let (state, _) = setup();
        let id = register(&state).await;

        let response = check_in(
            State(state),
            Json(CheckInRequest {
                identity_id: Some(id),
                national_id: None,
                shift_id: 99,
                session_token: None,
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "ShiftNotFound");
    }
}
