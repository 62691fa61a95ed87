use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::notify::{MessageData, Template};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/send", post(send))
        .route("/history", get(history))
        .route("/settings", put(settings))
        .route("/test", post(send_test))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest {
    contact_ids: Vec<Uuid>,
    template_name: Option<Template>,
    custom_message: Option<String>,
}

async fn send(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<SendRequest>,
) -> Result<Json<Value>, ApiError> {
    if body.contact_ids.is_empty() {
        return Err(ApiError::validation(
            "please provide at least one contact ID",
        ));
    }
    if body.template_name.is_none() && body.custom_message.is_none() {
        return Err(ApiError::validation(
            "please provide either a template name or custom message",
        ));
    }

    let user = state
        .store
        .find_user(&auth.email)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    let selected: Vec<_> = state
        .store
        .list_contacts(&auth.email)
        .await?
        .into_iter()
        .filter(|c| body.contact_ids.contains(&c.id) && c.receive_updates)
        .collect();
    if selected.is_empty() {
        return Err(ApiError::not_found(
            "no eligible contacts found with the provided IDs",
        ));
    }

    let data = MessageData {
        custom_message: body.custom_message,
        ..Default::default()
    }
    .with_var("userName", user.name)
    .with_var("cycleStatus", user.cycle_status.to_string());

    let results = state
        .dispatcher
        .dispatch(
            &auth.email,
            &selected,
            body.template_name.unwrap_or(Template::General),
            &data,
        )
        .await;

    Ok(Json(json!({
        "success": true,
        "message": "notifications sent",
        "results": results,
    })))
}

async fn history(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Value>, ApiError> {
    let mut notified: Vec<_> = state
        .store
        .list_contacts(&auth.email)
        .await?
        .into_iter()
        .filter(|c| c.last_notified.is_some())
        .collect();
    notified.sort_by(|a, b| b.last_notified.cmp(&a.last_notified));

    let history: Vec<Value> = notified
        .iter()
        .map(|c| {
            json!({
                "contactId": c.id,
                "contactName": c.name,
                "phoneNumber": c.phone,
                "lastNotified": c.last_notified,
            })
        })
        .collect();
    Ok(Json(json!({ "success": true, "history": history })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsRequest {
    global_settings: GlobalSettings,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GlobalSettings {
    receive_updates: bool,
}

async fn settings(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<SettingsRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .store
        .set_receive_updates_all(&auth.email, body.global_settings.receive_updates)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "notification settings updated for all contacts",
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestRequest {
    contact_id: Uuid,
}

async fn send_test(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<TestRequest>,
) -> Result<Json<Value>, ApiError> {
    let contact = state
        .store
        .list_contacts(&auth.email)
        .await?
        .into_iter()
        .find(|c| c.id == body.contact_id)
        .ok_or_else(|| ApiError::not_found("contact not found"))?;

    let data = MessageData {
        custom_message: Some("This is a test message from CycleConnect.".to_string()),
        ..Default::default()
    };
    let results = state
        .dispatcher
        .dispatch(&auth.email, &[contact], Template::General, &data)
        .await;
    let result = results
        .first()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("empty dispatch result")))?;

    Ok(Json(json!({
        "success": true,
        "message": "test notification sent",
        "result": result,
    })))
}
