use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{hash_password, issue_token, verify_password, AuthUser};
use crate::error::ApiError;
use crate::models::{CycleStatus, User};
use crate::state::AppState;
use crate::store::{NewContact, NewCycleEntry};
use crate::validate;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/verify", get(verify))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    user: RegisterUser,
    cycle_info: RegisterCycleInfo,
    #[serde(default)]
    contacts: Vec<RegisterContact>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterUser {
    email: String,
    name: String,
    age: i32,
    phone_number: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterCycleInfo {
    avg_cycle_length: i32,
    last_cycle_start: NaiveDate,
    last_cycle_end: NaiveDate,
    #[serde(default)]
    symptoms: Vec<String>,
    #[serde(default)]
    notes: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterContact {
    name: String,
    phone_number: String,
    relation: String,
    #[serde(default)]
    custom_alerts: Vec<String>,
}

/// Completes the multi-step signup: user record, initial cycle entry, and
/// emergency contacts in one request.
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    validate::email(&body.user.email)?;
    validate::name(&body.user.name)?;
    validate::age(body.user.age)?;
    validate::phone(&body.user.phone_number)?;
    validate::password(&body.user.password)?;
    validate::cycle_length(body.cycle_info.avg_cycle_length)?;
    validate::date_range(
        body.cycle_info.last_cycle_start,
        body.cycle_info.last_cycle_end,
    )?;
    for contact in &body.contacts {
        validate::name(&contact.name)?;
        validate::phone(&contact.phone_number)?;
    }

    let user = User {
        email: body.user.email.clone(),
        name: body.user.name,
        age: body.user.age,
        phone: body.user.phone_number,
        password_hash: hash_password(&body.user.password)?,
        avg_cycle_length: body.cycle_info.avg_cycle_length,
        cycle_status: CycleStatus::Inactive,
        created_at: Utc::now(),
    };
    state.store.create_user(&user).await?;

    state
        .store
        .add_cycle(
            &user.email,
            NewCycleEntry {
                start_date: body.cycle_info.last_cycle_start,
                end_date: body.cycle_info.last_cycle_end,
                symptoms: body.cycle_info.symptoms,
                notes: body.cycle_info.notes,
            },
        )
        .await?;

    for contact in body.contacts {
        state
            .store
            .add_contact(
                &user.email,
                NewContact {
                    name: contact.name,
                    phone: contact.phone_number,
                    relation: contact.relation,
                    custom_alerts: contact.custom_alerts,
                    receive_updates: true,
                },
            )
            .await?;
    }

    let token = issue_token(&user.email, &state.config.jwt_secret, state.config.jwt_expiration)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "user registered successfully",
            "token": token,
            "user": user,
        })),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = state
        .store
        .find_user(&body.email)
        .await?
        .filter(|u| verify_password(&body.password, &u.password_hash))
        .ok_or_else(|| ApiError::unauthorized("invalid email or password"))?;

    let token = issue_token(&user.email, &state.config.jwt_secret, state.config.jwt_expiration)?;
    Ok(Json(json!({
        "success": true,
        "message": "login successful",
        "token": token,
        "user": user,
    })))
}

async fn logout() -> Json<Value> {
    // Stateless tokens; the client discards its copy.
    Json(json!({ "success": true, "message": "logout successful" }))
}

async fn verify(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Value>, ApiError> {
    let user = state
        .store
        .find_user(&auth.email)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;
    Ok(Json(json!({ "success": true, "user": user })))
}
