use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Where the user currently sits in their cycle, as shown on the dashboard.
/// `Inactive` is the state before any cycle has been logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleStatus {
    Inactive,
    Active,
    Menstrual,
    Follicular,
    Ovulation,
    Luteal,
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CycleStatus::Inactive => "inactive",
            CycleStatus::Active => "active",
            CycleStatus::Menstrual => "menstrual",
            CycleStatus::Follicular => "follicular",
            CycleStatus::Ovulation => "ovulation",
            CycleStatus::Luteal => "luteal",
        };
        f.write_str(s)
    }
}

impl FromStr for CycleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inactive" => Ok(CycleStatus::Inactive),
            "active" => Ok(CycleStatus::Active),
            "menstrual" => Ok(CycleStatus::Menstrual),
            "follicular" => Ok(CycleStatus::Follicular),
            "ovulation" => Ok(CycleStatus::Ovulation),
            "luteal" => Ok(CycleStatus::Luteal),
            other => Err(format!("unknown cycle status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub email: String,
    pub name: String,
    pub age: i32,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avg_cycle_length: i32,
    pub cycle_status: CycleStatus,
    pub created_at: DateTime<Utc>,
}

/// One logged period. Entries are append-only per user; the most recent
/// entry is the one with the greatest `created_at`.
#[derive(Debug, Clone, Serialize)]
pub struct CycleEntry {
    pub id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub symptoms: Vec<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl CycleEntry {
    /// Period duration in whole days.
    pub fn duration_days(&self) -> i64 {
        crate::phases::days_between(self.start_date, self.end_date)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub category: String,
    pub title: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub relation: String,
    pub custom_alerts: Vec<String>,
    pub receive_updates: bool,
    pub last_notified: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertTarget {
    #[serde(rename = "self")]
    Own,
    #[serde(rename = "contact")]
    Contact,
}

impl fmt::Display for AlertTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertTarget::Own => f.write_str("self"),
            AlertTarget::Contact => f.write_str("contact"),
        }
    }
}

impl FromStr for AlertTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "self" => Ok(AlertTarget::Own),
            "contact" => Ok(AlertTarget::Contact),
            other => Err(format!("unknown alert target: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub id: Uuid,
    pub target: AlertTarget,
    pub date: DateTime<Utc>,
    pub symptoms: Vec<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
