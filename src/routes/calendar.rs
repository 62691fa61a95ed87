use axum::{
    extract::{Path, Query, State},
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
use crate::state::AppState;
use crate::store::{CalendarEventPatch, NewCalendarEvent};
use crate::validate;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:event_id", axum::routing::put(update).delete(remove))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateEventRequest {
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    category: String,
    title: String,
    #[serde(default)]
    note: String,
}

async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    validate::required(&body.category, "category")?;
    validate::required(&body.title, "title")?;
    let end_date = body.end_date.unwrap_or(body.start_date);
    validate::date_range(body.start_date, end_date)?;

    let event = state
        .store
        .add_event(
            &auth.email,
            NewCalendarEvent {
                start_date: body.start_date,
                end_date,
                category: body.category,
                title: body.title,
                note: body.note,
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "calendar event created successfully",
            "data": event,
        })),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventFilter {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    category: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filter): Query<EventFilter>,
) -> Result<Json<Value>, ApiError> {
    let mut events = state.store.list_events(&auth.email).await?;

    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
        events.retain(|e| e.start_date >= start && e.start_date <= end);
    }
    if let Some(category) = &filter.category {
        events.retain(|e| &e.category == category);
    }
    // Newest first for the calendar view.
    events.sort_by(|a, b| b.start_date.cmp(&a.start_date));

    Ok(Json(json!({ "success": true, "data": events })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateEventRequest {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    category: Option<String>,
    title: Option<String>,
    note: Option<String>,
}

async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<Uuid>,
    Json(body): Json<UpdateEventRequest>,
) -> Result<Json<Value>, ApiError> {
    if let (Some(start), Some(end)) = (body.start_date, body.end_date) {
        validate::date_range(start, end)?;
    }
    let event = state
        .store
        .update_event(
            &auth.email,
            event_id,
            CalendarEventPatch {
                start_date: body.start_date,
                end_date: body.end_date,
                category: body.category,
                title: body.title,
                note: body.note,
            },
        )
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "calendar event updated successfully",
        "data": event,
    })))
}

async fn remove(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state.store.delete_event(&auth.email, event_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "calendar event deleted successfully",
    })))
}
