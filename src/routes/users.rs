use axum::{
    extract::State,
    routing::{delete, get, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::CycleStatus;
use crate::phases;
use crate::state::AppState;
use crate::validate;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile).put(update_profile))
        .route("/cycle-status", put(update_cycle_status))
        .route("/timeline", get(timeline))
        .route("/", delete(remove))
}

async fn profile(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Value>, ApiError> {
    let user = state
        .store
        .find_user(&auth.email)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;
    Ok(Json(json!({ "success": true, "user": user })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest {
    name: Option<String>,
    age: Option<i32>,
    phone_number: Option<String>,
    avg_cycle_length: Option<i32>,
}

async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut user = state
        .store
        .find_user(&auth.email)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    if let Some(name) = body.name {
        validate::name(&name)?;
        user.name = name;
    }
    if let Some(age) = body.age {
        validate::age(age)?;
        user.age = age;
    }
    if let Some(phone) = body.phone_number {
        validate::phone(&phone)?;
        user.phone = phone;
    }
    if let Some(len) = body.avg_cycle_length {
        validate::cycle_length(len)?;
        user.avg_cycle_length = len;
    }
    state.store.update_user(&user).await?;

    Ok(Json(json!({
        "success": true,
        "message": "profile updated successfully",
        "user": user,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateStatusRequest {
    cycle_status: CycleStatus,
}

async fn update_cycle_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut user = state
        .store
        .find_user(&auth.email)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;
    user.cycle_status = body.cycle_status;
    state.store.update_user(&user).await?;
    Ok(Json(json!({
        "success": true,
        "message": "cycle status updated",
        "cycleStatus": user.cycle_status,
    })))
}

async fn remove(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Value>, ApiError> {
    state.store.delete_user(&auth.email).await?;
    Ok(Json(json!({
        "success": true,
        "message": "account deleted",
    })))
}

/// Projection of the upcoming period and ovulation windows for the
/// frontend timeline view.
async fn timeline(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Value>, ApiError> {
    let user = state
        .store
        .find_user(&auth.email)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;
    let cycles = state.store.list_cycles(&auth.email).await?;
    let latest = cycles
        .last()
        .ok_or_else(|| ApiError::not_found("no cycle data found"))?;

    let avg_cycle = user.avg_cycle_length as i64;
    let avg_period = phases::average_period_length(&cycles);
    let next_start = phases::predict_next_start(latest.start_date, avg_cycle);
    // Ovulation typically lands 14 days before the next period.
    let ovulation_start = next_start - chrono::Duration::days(14);

    let today = Utc::now().date_naive();
    let info = phases::determine_phase(
        latest.start_date,
        avg_cycle,
        latest.duration_days(),
        today,
    );

    Ok(Json(json!({
        "success": true,
        "timeline": {
            "currentPhase": info.phase,
            "daysIntoPhase": info.days_into_phase,
            "events": [
                {
                    "type": "Period",
                    "start": next_start,
                    "end": next_start + chrono::Duration::days(avg_period),
                },
                {
                    "type": "Ovulation",
                    "start": ovulation_start,
                    "end": ovulation_start + chrono::Duration::days(2),
                },
            ],
        },
    })))
}
