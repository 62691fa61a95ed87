use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::insights::{self, InsightInput};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(symptom_insights))
}

/// AI-backed analysis of recent symptom history. Provider failures never
/// propagate; the worst case is the static fallback, still a 200.
async fn symptom_insights(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let user = state
        .store
        .find_user(&auth.email)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;
    let cycles = state.store.list_cycles(&auth.email).await?;
    if cycles.is_empty() {
        return Err(ApiError::not_found("no symptom history found to analyze"));
    }

    let recent = cycles[cycles.len().saturating_sub(3)..].to_vec();
    let common_symptoms = insights::top_symptoms(&recent, 5);

    let input = InsightInput {
        user_name: user.name,
        age: user.age,
        avg_cycle_length: user.avg_cycle_length,
        symptoms: common_symptoms.clone(),
        cycles: recent,
    };
    let insight = insights::get_insights(state.llm.as_ref(), &input).await;

    Ok(Json(json!({
        "success": true,
        "commonSymptoms": common_symptoms,
        "insights": insight.suggestions,
        "recommendations": insight.recommendations,
    })))
}
