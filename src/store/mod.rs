//! Persistence seam. Every collection is keyed by the owning user's email
//! plus a per-entry uuid; there are no cross-user references.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Alert, AlertTarget, CalendarEvent, Contact, CycleEntry, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound("record"),
            other => StoreError::Backend(other.into()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            StoreError::Conflict(what) => ApiError::Conflict(format!("{what} already exists")),
            StoreError::Backend(inner) => ApiError::Internal(inner),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCycleEntry {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub symptoms: Vec<String>,
    pub notes: String,
}

#[derive(Debug, Clone, Default)]
pub struct CycleEntryPatch {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub symptoms: Option<Vec<String>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCalendarEvent {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub category: String,
    pub title: String,
    pub note: String,
}

#[derive(Debug, Clone, Default)]
pub struct CalendarEventPatch {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub title: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewContact {
    pub name: String,
    pub phone: String,
    pub relation: String,
    pub custom_alerts: Vec<String>,
    pub receive_updates: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub relation: Option<String>,
    pub custom_alerts: Option<Vec<String>>,
    pub receive_updates: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewAlert {
    pub target: AlertTarget,
    pub date: DateTime<Utc>,
    pub symptoms: Vec<String>,
    pub notes: String,
}

#[derive(Debug, Clone, Default)]
pub struct AlertPatch {
    pub symptoms: Option<Vec<String>>,
    pub notes: Option<String>,
}

/// Everything the handlers need from persistence. Implemented by
/// [`PgStore`] in production and [`MemoryStore`] in tests.
#[async_trait]
pub trait Store: Send + Sync {
    // users
    async fn create_user(&self, user: &User) -> Result<(), StoreError>;
    async fn find_user(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn update_user(&self, user: &User) -> Result<(), StoreError>;
    async fn delete_user(&self, email: &str) -> Result<(), StoreError>;

    // cycle entries, append-ordered
    async fn list_cycles(&self, email: &str) -> Result<Vec<CycleEntry>, StoreError>;
    async fn add_cycle(&self, email: &str, entry: NewCycleEntry) -> Result<CycleEntry, StoreError>;
    async fn update_cycle(
        &self,
        email: &str,
        id: Uuid,
        patch: CycleEntryPatch,
    ) -> Result<CycleEntry, StoreError>;
    async fn delete_cycle(&self, email: &str, id: Uuid) -> Result<(), StoreError>;

    // calendar events
    async fn list_events(&self, email: &str) -> Result<Vec<CalendarEvent>, StoreError>;
    async fn add_event(
        &self,
        email: &str,
        event: NewCalendarEvent,
    ) -> Result<CalendarEvent, StoreError>;
    async fn update_event(
        &self,
        email: &str,
        id: Uuid,
        patch: CalendarEventPatch,
    ) -> Result<CalendarEvent, StoreError>;
    async fn delete_event(&self, email: &str, id: Uuid) -> Result<(), StoreError>;

    // contacts
    async fn list_contacts(&self, email: &str) -> Result<Vec<Contact>, StoreError>;
    async fn add_contact(&self, email: &str, contact: NewContact) -> Result<Contact, StoreError>;
    async fn update_contact(
        &self,
        email: &str,
        id: Uuid,
        patch: ContactPatch,
    ) -> Result<Contact, StoreError>;
    async fn delete_contact(&self, email: &str, id: Uuid) -> Result<(), StoreError>;
    async fn set_receive_updates_all(&self, email: &str, receive: bool) -> Result<(), StoreError>;
    /// Batch-persist last-notified timestamps after a dispatch completes.
    async fn mark_notified(
        &self,
        email: &str,
        ids: &[Uuid],
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    // alerts
    async fn list_alerts(&self, email: &str) -> Result<Vec<Alert>, StoreError>;
    async fn add_alert(&self, email: &str, alert: NewAlert) -> Result<Alert, StoreError>;
    async fn get_alert(&self, email: &str, id: Uuid) -> Result<Option<Alert>, StoreError>;
    async fn update_alert(
        &self,
        email: &str,
        id: Uuid,
        patch: AlertPatch,
    ) -> Result<Alert, StoreError>;
    async fn delete_alert(&self, email: &str, id: Uuid) -> Result<(), StoreError>;
}
