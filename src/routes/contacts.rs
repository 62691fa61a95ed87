use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{ContactPatch, NewContact};
use crate::validate;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(add))
        .route("/:contact_id", axum::routing::put(update).delete(remove))
}

async fn list(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Value>, ApiError> {
    let contacts = state.store.list_contacts(&auth.email).await?;
    Ok(Json(json!({ "success": true, "contacts": contacts })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddContactRequest {
    name: String,
    phone_number: String,
    relation: String,
    #[serde(default)]
    custom_alerts: Vec<String>,
    #[serde(default = "default_receive_updates")]
    receive_updates: bool,
}

fn default_receive_updates() -> bool {
    true
}

async fn add(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<AddContactRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    validate::name(&body.name)?;
    validate::phone(&body.phone_number)?;
    validate::required(&body.relation, "relation")?;

    let contact = state
        .store
        .add_contact(
            &auth.email,
            NewContact {
                name: body.name,
                phone: body.phone_number,
                relation: body.relation,
                custom_alerts: body.custom_alerts,
                receive_updates: body.receive_updates,
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "contact added successfully",
            "contact": contact,
        })),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateContactRequest {
    name: Option<String>,
    phone_number: Option<String>,
    relation: Option<String>,
    custom_alerts: Option<Vec<String>>,
    receive_updates: Option<bool>,
}

async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(contact_id): Path<Uuid>,
    Json(body): Json<UpdateContactRequest>,
) -> Result<Json<Value>, ApiError> {
    if let Some(name) = &body.name {
        validate::name(name)?;
    }
    if let Some(phone) = &body.phone_number {
        validate::phone(phone)?;
    }

    let contact = state
        .store
        .update_contact(
            &auth.email,
            contact_id,
            ContactPatch {
                name: body.name,
                phone: body.phone_number,
                relation: body.relation,
                custom_alerts: body.custom_alerts,
                receive_updates: body.receive_updates,
            },
        )
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "contact updated successfully",
        "contact": contact,
    })))
}

async fn remove(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(contact_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state.store.delete_contact(&auth.email, contact_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "contact deleted successfully",
    })))
}
