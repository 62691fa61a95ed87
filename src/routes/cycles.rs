use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{CycleEntry, CycleStatus};
use crate::notify::{MessageData, NotifyJob, Template};
use crate::phases;
use crate::state::AppState;
use crate::store::{CycleEntryPatch, NewCycleEntry, Store};
use crate::validate;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(history).post(create))
        .route("/current", get(current))
        .route("/predictions", get(predictions))
        .route("/:entry_id", axum::routing::put(update).delete(remove))
}

async fn history(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Value>, ApiError> {
    let cycles = state.store.list_cycles(&auth.email).await?;
    Ok(Json(json!({ "success": true, "cycles": cycles })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCycleRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

/// Append a cycle entry and refresh the user's derived state: average
/// cycle length (when the new duration deviates by more than the
/// threshold) and current cycle status. Split out of the handler so the
/// flow is testable against the in-memory store.
pub async fn log_cycle_entry(
    store: &dyn Store,
    email: &str,
    req: CreateCycleRequest,
    today: NaiveDate,
) -> Result<(CycleEntry, CycleStatus), ApiError> {
    validate::date_range(req.start_date, req.end_date)?;

    let entry = store
        .add_cycle(
            email,
            NewCycleEntry {
                start_date: req.start_date,
                end_date: req.end_date,
                symptoms: req.symptoms,
                notes: req.notes,
            },
        )
        .await?;

    let mut user = store
        .find_user(email)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;
    let cycles = store.list_cycles(email).await?;

    let duration = entry.duration_days();
    if let Some(new_avg) =
        phases::recalc_avg_cycle_length(&cycles, duration, user.avg_cycle_length as i64)
    {
        user.avg_cycle_length = new_avg as i32;
    }

    // Fall back on an empty list is unreachable; the entry was just added.
    let last = cycles.last().unwrap_or(&entry);
    user.cycle_status = if today >= last.start_date && today <= last.end_date {
        CycleStatus::Menstrual
    } else {
        let info = phases::determine_phase(
            last.start_date,
            user.avg_cycle_length as i64,
            last.duration_days(),
            today,
        );
        info.phase.into()
    };
    store.update_user(&user).await?;

    Ok((entry, user.cycle_status))
}

async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateCycleRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let today = Utc::now().date_naive();
    let (entry, status) = log_cycle_entry(state.store.as_ref(), &auth.email, body, today).await?;

    // Period-logged trigger: queued, never awaited by this request.
    let job = NotifyJob {
        email: auth.email.clone(),
        template: Template::CycleStart,
        data: MessageData::default().with_var("userName", auth.name.clone()),
    };
    if let Err(e) = state.notify_tx.try_send(job) {
        tracing::warn!("notify queue rejected period-logged job: {e}");
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "cycle entry added successfully",
            "cycle": entry,
            "cycleStatus": status,
        })),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCycleRequest {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    symptoms: Option<Vec<String>>,
    notes: Option<String>,
}

async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(entry_id): Path<Uuid>,
    Json(body): Json<UpdateCycleRequest>,
) -> Result<Json<Value>, ApiError> {
    if let (Some(start), Some(end)) = (body.start_date, body.end_date) {
        validate::date_range(start, end)?;
    }
    let entry = state
        .store
        .update_cycle(
            &auth.email,
            entry_id,
            CycleEntryPatch {
                start_date: body.start_date,
                end_date: body.end_date,
                symptoms: body.symptoms,
                notes: body.notes,
            },
        )
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "cycle entry updated successfully",
        "cycle": entry,
    })))
}

async fn remove(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state.store.delete_cycle(&auth.email, entry_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "cycle entry deleted successfully",
    })))
}

async fn current(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Value>, ApiError> {
    let user = state
        .store
        .find_user(&auth.email)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;
    let cycles = state.store.list_cycles(&auth.email).await?;
    let latest = cycles
        .last()
        .ok_or_else(|| ApiError::not_found("no cycle data found"))?;

    let today = Utc::now().date_naive();
    let next_start = phases::predict_next_start(latest.start_date, user.avg_cycle_length as i64);
    let days_until = (next_start - today).num_days().max(0);
    let info = phases::determine_phase(
        latest.start_date,
        user.avg_cycle_length as i64,
        latest.duration_days(),
        today,
    );

    Ok(Json(json!({
        "success": true,
        "currentCycle": {
            "entry": latest,
            "cycleStatus": user.cycle_status,
            "currentPhase": info.phase,
            "daysIntoPhase": info.days_into_phase,
            "daysUntilNextPeriod": days_until,
            "nextPeriodDate": next_start,
        },
    })))
}

async fn predictions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let user = state
        .store
        .find_user(&auth.email)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;
    let cycles = state.store.list_cycles(&auth.email).await?;
    let latest = cycles
        .last()
        .ok_or_else(|| ApiError::not_found("no cycle data found to make predictions"))?;

    let avg_period = phases::average_period_length(&cycles);
    let avg_cycle = user.avg_cycle_length as i64;

    let mut predictions = Vec::with_capacity(3);
    let mut start = latest.start_date;
    for _ in 0..3 {
        start = phases::predict_next_start(start, avg_cycle);
        let period_end = start + chrono::Duration::days(avg_period);
        let ovulation_start = start + chrono::Duration::days(avg_cycle - 14);
        let ovulation_end = ovulation_start + chrono::Duration::days(2);
        predictions.push(json!({
            "startDate": start,
            "endDate": period_end,
            "periodPhase": { "start": start, "end": period_end },
            "ovulationPhase": { "start": ovulation_start, "end": ovulation_end },
        }));
    }

    Ok(Json(json!({
        "success": true,
        "predictions": predictions,
        "currentPhase": user.cycle_status,
    })))
}
