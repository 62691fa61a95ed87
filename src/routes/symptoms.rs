use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::CycleEntry;
use crate::state::AppState;
use crate::store::{CycleEntryPatch, Store};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(history).post(log))
        .route("/:cycle_id", axum::routing::put(update).delete(clear))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSymptomsRequest {
    pub date: NaiveDate,
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Merge symptoms into the cycle entry covering `date`, or the most
/// recent entry when none covers it. Duplicates are dropped; notes are
/// appended on their own line.
pub async fn merge_symptoms(
    store: &dyn Store,
    email: &str,
    req: LogSymptomsRequest,
) -> Result<CycleEntry, ApiError> {
    if req.symptoms.is_empty() {
        return Err(ApiError::validation("please provide date and symptoms"));
    }

    let cycles = store.list_cycles(email).await?;
    let target = cycles
        .iter()
        .find(|c| req.date >= c.start_date && req.date <= c.end_date)
        .or_else(|| cycles.last())
        .ok_or_else(|| ApiError::not_found("no cycle data found, please log a cycle first"))?;

    let mut symptoms = target.symptoms.clone();
    for symptom in req.symptoms {
        if !symptoms.contains(&symptom) {
            symptoms.push(symptom);
        }
    }

    let notes = match req.notes.filter(|n| !n.is_empty()) {
        Some(extra) if target.notes.is_empty() => Some(extra),
        Some(extra) => Some(format!("{}\n{}", target.notes, extra)),
        None => None,
    };

    let patch = CycleEntryPatch {
        symptoms: Some(symptoms),
        notes,
        ..Default::default()
    };
    Ok(store.update_cycle(email, target.id, patch).await?)
}

async fn log(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<LogSymptomsRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    merge_symptoms(state.store.as_ref(), &auth.email, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "symptoms logged successfully",
        })),
    ))
}

async fn history(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Value>, ApiError> {
    let cycles = state.store.list_cycles(&auth.email).await?;
    let history: Vec<Value> = cycles
        .iter()
        .map(|c| {
            json!({
                "cycleId": c.id,
                "startDate": c.start_date,
                "endDate": c.end_date,
                "symptoms": c.symptoms,
                "notes": c.notes,
            })
        })
        .collect();
    Ok(Json(json!({ "success": true, "history": history })))
}

#[derive(Deserialize)]
struct UpdateSymptomsRequest {
    symptoms: Option<Vec<String>>,
    notes: Option<String>,
}

async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(cycle_id): Path<Uuid>,
    Json(body): Json<UpdateSymptomsRequest>,
) -> Result<Json<Value>, ApiError> {
    let entry = state
        .store
        .update_cycle(
            &auth.email,
            cycle_id,
            CycleEntryPatch {
                symptoms: body.symptoms,
                notes: body.notes,
                ..Default::default()
            },
        )
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "symptom log updated successfully",
        "symptoms": entry.symptoms,
        "notes": entry.notes,
    })))
}

async fn clear(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(cycle_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state
        .store
        .update_cycle(
            &auth.email,
            cycle_id,
            CycleEntryPatch {
                symptoms: Some(vec![]),
                notes: Some(String::new()),
                ..Default::default()
            },
        )
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "symptom log cleared successfully",
    })))
}
