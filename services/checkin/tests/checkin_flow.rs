use chrono::{Duration, NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use uuid::Uuid;

use checkin::{
    clock::ManualClock,
    config::ServiceConfig,
    engine::IdentityRef,
    error::CheckinError,
    models::{Resolution, Shift},
    session::SessionPolicy,
    state::{AppState, Backends},
    validation::NationalIdPolicy,
};

const SHIFT: i64 = 7;

fn shift(id: i64, date: NaiveDate) -> Shift {
    Shift {
        id,
        date,
        shift_type: "day_shift".to_string(),
        group: Some("3-4".to_string()),
    }
}

/// 08:00 in São Paulo on 2025-03-10
fn setup(policy: NationalIdPolicy) -> (AppState, ManualClock) {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 10, 11, 0, 0).unwrap());
    let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let config = ServiceConfig {
        bind_address: "127.0.0.1:0".to_string(),
        timezone: chrono_tz::America::Sao_Paulo,
        session: SessionPolicy::default(),
        national_id_policy: policy,
    };
    let backends = Backends::in_memory([shift(SHIFT, date), shift(8, date)]);
    let state = AppState::new(backends, Arc::new(clock.clone()), &config);
    (state, clock)
}

async fn register_ana(state: &AppState) -> Uuid {
    state.engine.register("000", "Ana", None).await.unwrap().id
}

#[tokio::test]
async fn test_session_token_is_single_use() {
    let (state, _) = setup(NationalIdPolicy::Numeric);
    let id = register_ana(&state).await;
    let token = state.engine.issue_session().await.unwrap().token;

    state
        .engine
        .check_in(IdentityRef::Id(id), SHIFT, Some(&token))
        .await
        .unwrap();

    let replay = state
        .engine
        .check_out_shift(id, SHIFT, Some(&token))
        .await;
    assert!(matches!(replay, Err(CheckinError::AlreadyUsedSession)));
}

#[tokio::test]
async fn test_expired_session_is_refused() {
    let (state, clock) = setup(NationalIdPolicy::Numeric);
    let id = register_ana(&state).await;
    let token = state.engine.issue_session().await.unwrap().token;

    clock.advance(Duration::minutes(5) + Duration::seconds(1));
    let result = state
        .engine
        .check_in(IdentityRef::Id(id), SHIFT, Some(&token))
        .await;
    assert!(matches!(result, Err(CheckinError::ExpiredSession)));
}

#[tokio::test]
async fn test_register_then_double_check_in() {
    let (state, _) = setup(NationalIdPolicy::Numeric);

    let resolution = state.engine.validate_identity("000").await.unwrap();
    assert!(matches!(resolution, Resolution::NotFound));

    let id = register_ana(&state).await;

    let open = state
        .engine
        .check_in(IdentityRef::Id(id), SHIFT, None)
        .await
        .unwrap();
    assert!(open.is_open());
    assert_eq!(open.shift_id, SHIFT);

    let again = state.engine.check_in(IdentityRef::Id(id), SHIFT, None).await;
    assert!(matches!(again, Err(CheckinError::AlreadyCheckedIn)));

    // Other shifts are independent
    state
        .engine
        .check_in(IdentityRef::NationalId("000".to_string()), 8, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_check_out_computes_hours_worked() {
    let (state, clock) = setup(NationalIdPolicy::Numeric);
    let id = register_ana(&state).await;

    let open = state
        .engine
        .check_in(IdentityRef::Id(id), SHIFT, None)
        .await
        .unwrap();

    clock.advance(Duration::minutes(510));
    let closed = state.engine.check_out(open.id, None).await.unwrap();
    assert_eq!(closed.hours_worked.unwrap().hours(), 8.5);
    assert_eq!(closed.check_out, Some(open.check_in + Duration::minutes(510)));

    let again = state.engine.check_out(open.id, None).await;
    assert!(matches!(again, Err(CheckinError::AlreadyCheckedOut)));
}

#[tokio::test]
async fn test_check_out_unknown_attendance() {
    let (state, _) = setup(NationalIdPolicy::Numeric);

    let result = state.engine.check_out(Uuid::new_v4(), None).await;
    assert!(matches!(result, Err(CheckinError::NotCheckedIn)));
}

#[tokio::test]
async fn test_closed_record_allows_new_check_in() {
    let (state, clock) = setup(NationalIdPolicy::Numeric);
    let id = register_ana(&state).await;

    let first = state
        .engine
        .check_in(IdentityRef::Id(id), SHIFT, None)
        .await
        .unwrap();
    clock.advance(Duration::hours(4));
    state.engine.check_out_shift(id, SHIFT, None).await.unwrap();

    clock.advance(Duration::hours(1));
    let second = state
        .engine
        .check_in(IdentityRef::Id(id), SHIFT, None)
        .await
        .unwrap();
    assert_ne!(first.id, second.id);

    let today = state.projector.today_mine(id).await.unwrap();
    assert_eq!(today.len(), 2);
    assert!(today[0].check_out.is_some());
    assert!(today[1].check_out.is_none());
}

#[tokio::test]
async fn test_malformed_national_id_leaves_token_unconsumed() {
    let (state, _) = setup(NationalIdPolicy::Cpf);
    let id = state
        .engine
        .register("529.982.247-25", "Maria", Some("COREN-123"))
        .await
        .unwrap()
        .id;
    let token = state.engine.issue_session().await.unwrap().token;

    let result = state
        .engine
        .check_in(
            IdentityRef::NationalId("123.456.789-00".to_string()),
            SHIFT,
            Some(&token),
        )
        .await;
    assert!(matches!(result, Err(CheckinError::Validation(_))));

    state
        .engine
        .check_in(IdentityRef::Id(id), SHIFT, Some(&token))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unknown_identity_is_never_registered_by_check_in() {
    let (state, _) = setup(NationalIdPolicy::Numeric);

    let result = state
        .engine
        .check_in(IdentityRef::NationalId("42".to_string()), SHIFT, None)
        .await;
    assert!(matches!(result, Err(CheckinError::IdentityNotFound)));

    let resolution = state.engine.validate_identity("42").await.unwrap();
    assert!(!resolution.is_found());
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let (state, _) = setup(NationalIdPolicy::Numeric);
    register_ana(&state).await;

    let result = state.engine.register("000", "Ana Again", None).await;
    assert!(matches!(result, Err(CheckinError::IdentityConflict)));
}

#[tokio::test]
async fn test_daily_views_follow_operational_timezone() {
    let (state, clock) = setup(NationalIdPolicy::Numeric);
    let ana = register_ana(&state).await;
    let bia = state.engine.register("001", "Bia", None).await.unwrap().id;

    // 23:30 local on the 10th is 02:30Z on the 11th
    clock.set(Utc.with_ymd_and_hms(2025, 3, 11, 2, 30, 0).unwrap());
    state
        .engine
        .check_in(IdentityRef::Id(ana), SHIFT, None)
        .await
        .unwrap();

    // 00:30 local on the 11th
    clock.set(Utc.with_ymd_and_hms(2025, 3, 11, 3, 30, 0).unwrap());
    state
        .engine
        .check_in(IdentityRef::Id(bia), SHIFT, None)
        .await
        .unwrap();

    let tenth = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let on_tenth = state.projector.on_date(tenth, None).await.unwrap();
    assert_eq!(on_tenth.len(), 1);
    assert_eq!(on_tenth[0].display_name, "Ana");

    let all = state.projector.today_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].display_name, "Bia");

    let mine = state.projector.today_mine(bia).await.unwrap();
    assert!(mine.iter().all(|view| all.iter().any(|v| v.id == view.id)));
    assert!(state.projector.today_mine(ana).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_check_ins_open_one_record() {
    let (state, _) = setup(NationalIdPolicy::Numeric);
    let id = register_ana(&state).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = state.engine.clone();
        handles.push(tokio::spawn(async move {
            engine.check_in(IdentityRef::Id(id), SHIFT, None).await
        }));
    }

    let mut opened = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => opened += 1,
            Err(CheckinError::AlreadyCheckedIn) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(opened, 1);
}

#[tokio::test]
async fn test_sub_second_attendance_can_be_closed() {
    let (state, clock) = setup(NationalIdPolicy::Numeric);
    let id = register_ana(&state).await;

    clock.advance(Duration::milliseconds(900));
    let open = state
        .engine
        .check_in(IdentityRef::Id(id), SHIFT, None)
        .await
        .unwrap();

    clock.advance(Duration::milliseconds(500));
    let closed = state.engine.check_out(open.id, None).await.unwrap();
    assert_eq!(closed.hours_worked.unwrap().micros(), 500_000);
    assert_eq!(closed.hours_worked.unwrap().hours(), 0.0);
}
