use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::AlertTarget;
use crate::notify::{MessageData, Template};
use crate::state::AppState;
use crate::store::{AlertPatch, NewAlert};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route(
            "/:alert_id",
            get(get_one).put(update).delete(remove),
        )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAlertRequest {
    to: AlertTarget,
    #[serde(default)]
    symptoms: Vec<String>,
    #[serde(default)]
    notes: String,
    #[serde(default, rename = "sendSMS")]
    send_sms: bool,
    #[serde(default)]
    contact_ids: Vec<Uuid>,
}

async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateAlertRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if body.send_sms && body.contact_ids.is_empty() {
        return Err(ApiError::validation(
            "when sending SMS, contactIds must be a non-empty array",
        ));
    }

    let alert = state
        .store
        .add_alert(
            &auth.email,
            NewAlert {
                target: body.to,
                date: Utc::now(),
                symptoms: body.symptoms.clone(),
                notes: body.notes.clone(),
            },
        )
        .await?;

    if body.send_sms {
        let contacts: Vec<_> = state
            .store
            .list_contacts(&auth.email)
            .await?
            .into_iter()
            .filter(|c| body.contact_ids.contains(&c.id))
            .collect();

        let message = format!(
            "ALERT from {}: {}. {}",
            auth.name,
            body.symptoms.join(", "),
            body.notes
        );
        let data = MessageData {
            custom_message: Some(message),
            ..Default::default()
        };
        // Joined before responding; per-contact failures are recorded in
        // the results and logged, never fail the alert itself.
        state
            .dispatcher
            .dispatch(&auth.email, &contacts, Template::General, &data)
            .await;
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "alert created successfully",
            "alert": alert,
        })),
    ))
}

async fn list(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Value>, ApiError> {
    let mut alerts = state.store.list_alerts(&auth.email).await?;
    alerts.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(Json(json!({ "success": true, "alerts": alerts })))
}

async fn get_one(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(alert_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let alert = state
        .store
        .get_alert(&auth.email, alert_id)
        .await?
        .ok_or_else(|| ApiError::not_found("alert not found"))?;
    Ok(Json(json!({ "success": true, "alert": alert })))
}

#[derive(Deserialize)]
struct UpdateAlertRequest {
    symptoms: Option<Vec<String>>,
    notes: Option<String>,
}

async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(alert_id): Path<Uuid>,
    Json(body): Json<UpdateAlertRequest>,
) -> Result<Json<Value>, ApiError> {
    let alert = state
        .store
        .update_alert(
            &auth.email,
            alert_id,
            AlertPatch {
                symptoms: body.symptoms,
                notes: body.notes,
            },
        )
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "alert updated successfully",
        "alert": alert,
    })))
}

async fn remove(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(alert_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state.store.delete_alert(&auth.email, alert_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "alert deleted successfully",
    })))
}
