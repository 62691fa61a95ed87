use axum::Router;

use crate::state::AppState;

pub mod alerts;
pub mod auth;
pub mod calendar;
pub mod contacts;
pub mod cycles;
pub mod insights;
pub mod notifications;
pub mod symptoms;
pub mod users;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::routes())
        .nest("/users", users::routes())
        .nest("/cycles", cycles::routes())
        .nest("/symptoms", symptoms::routes())
        .nest("/insights", insights::routes())
        .nest("/contacts", contacts::routes())
        .nest("/calendar", calendar::routes())
        .nest("/alerts", alerts::routes())
        .nest("/notifications", notifications::routes())
}
