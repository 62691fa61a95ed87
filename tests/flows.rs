//! Service-level flows exercised against the in-memory store with mock
//! providers; no HTTP layer, no network.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use cycleconnect_backend::error::ApiError;
use cycleconnect_backend::models::{CycleStatus, User};
use cycleconnect_backend::notify::{
    spawn_worker, Dispatcher, MessageData, NotifyJob, SmsError, SmsSender, Template,
};
use cycleconnect_backend::routes::cycles::{log_cycle_entry, CreateCycleRequest};
use cycleconnect_backend::routes::symptoms::{merge_symptoms, LogSymptomsRequest};
use cycleconnect_backend::store::{MemoryStore, NewContact, Store};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn seed_user(store: &dyn Store, email: &str, avg_cycle_length: i32) {
    store
        .create_user(&User {
            email: email.to_string(),
            name: "Maya".to_string(),
            age: 28,
            phone: "+15550001234".to_string(),
            password_hash: "hash".to_string(),
            avg_cycle_length,
            cycle_status: CycleStatus::Inactive,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
}

fn cycle_request(start: NaiveDate, len: i64) -> CreateCycleRequest {
    CreateCycleRequest {
        start_date: start,
        end_date: start + chrono::Duration::days(len),
        symptoms: vec![],
        notes: String::new(),
    }
}

#[tokio::test]
async fn logging_during_period_sets_menstrual_status() {
    let store = MemoryStore::new();
    seed_user(&store, "maya@example.com", 28).await;

    let today = date(2024, 6, 3);
    let (entry, status) = log_cycle_entry(
        &store,
        "maya@example.com",
        cycle_request(date(2024, 6, 1), 5),
        today,
    )
    .await
    .unwrap();

    assert_eq!(entry.start_date, date(2024, 6, 1));
    assert_eq!(status, CycleStatus::Menstrual);

    let user = store.find_user("maya@example.com").await.unwrap().unwrap();
    assert_eq!(user.cycle_status, CycleStatus::Menstrual);
}

#[tokio::test]
async fn logging_a_past_period_classifies_todays_phase() {
    let store = MemoryStore::new();
    seed_user(&store, "maya@example.com", 28).await;

    // Period ended a week ago; day 10 of a 28-day cycle is follicular.
    let today = date(2024, 6, 11);
    let (_, status) = log_cycle_entry(
        &store,
        "maya@example.com",
        cycle_request(date(2024, 6, 1), 5),
        today,
    )
    .await
    .unwrap();

    assert_eq!(status, CycleStatus::Follicular);
}

#[tokio::test]
async fn deviating_entry_moves_the_stored_average() {
    let store = MemoryStore::new();
    seed_user(&store, "maya@example.com", 28).await;

    // Entry durations stand in for cycle lengths; prior 28, 27, 29.
    let mut start = date(2024, 1, 1);
    for len in [28, 27, 29] {
        log_cycle_entry(&store, "maya@example.com", cycle_request(start, len), start)
            .await
            .unwrap();
        start += chrono::Duration::days(len + 1);
    }
    let user = store.find_user("maya@example.com").await.unwrap().unwrap();
    assert_eq!(user.avg_cycle_length, 28, "small deviations leave it alone");

    // A 35-day entry deviates by 7; round(mean(27, 29, 35)) = 30.
    log_cycle_entry(&store, "maya@example.com", cycle_request(start, 35), start)
        .await
        .unwrap();
    let user = store.find_user("maya@example.com").await.unwrap().unwrap();
    assert_eq!(user.avg_cycle_length, 30);
}

#[tokio::test]
async fn inverted_date_range_is_rejected_before_the_store() {
    let store = MemoryStore::new();
    seed_user(&store, "maya@example.com", 28).await;

    let req = CreateCycleRequest {
        start_date: date(2024, 6, 10),
        end_date: date(2024, 6, 1),
        symptoms: vec![],
        notes: String::new(),
    };
    let err = log_cycle_entry(&store, "maya@example.com", req, date(2024, 6, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert!(store.list_cycles("maya@example.com").await.unwrap().is_empty());
}

#[tokio::test]
async fn symptoms_merge_into_the_covering_entry_without_duplicates() {
    let store = MemoryStore::new();
    seed_user(&store, "maya@example.com", 28).await;
    log_cycle_entry(
        &store,
        "maya@example.com",
        CreateCycleRequest {
            start_date: date(2024, 6, 1),
            end_date: date(2024, 6, 5),
            symptoms: vec!["cramps".into()],
            notes: "rough start".into(),
        },
        date(2024, 6, 1),
    )
    .await
    .unwrap();

    let entry = merge_symptoms(
        &store,
        "maya@example.com",
        LogSymptomsRequest {
            date: date(2024, 6, 3),
            symptoms: vec!["cramps".into(), "headache".into()],
            notes: Some("worse today".into()),
        },
    )
    .await
    .unwrap();

    assert_eq!(entry.symptoms, vec!["cramps", "headache"]);
    assert_eq!(entry.notes, "rough start\nworse today");
}

#[tokio::test]
async fn symptoms_outside_any_entry_fall_back_to_the_latest() {
    let store = MemoryStore::new();
    seed_user(&store, "maya@example.com", 28).await;
    log_cycle_entry(
        &store,
        "maya@example.com",
        cycle_request(date(2024, 5, 1), 5),
        date(2024, 5, 1),
    )
    .await
    .unwrap();
    log_cycle_entry(
        &store,
        "maya@example.com",
        cycle_request(date(2024, 6, 1), 5),
        date(2024, 6, 1),
    )
    .await
    .unwrap();

    // Date covers neither entry; the most recent one absorbs the log.
    merge_symptoms(
        &store,
        "maya@example.com",
        LogSymptomsRequest {
            date: date(2024, 6, 20),
            symptoms: vec!["fatigue".into()],
            notes: None,
        },
    )
    .await
    .unwrap();

    let cycles = store.list_cycles("maya@example.com").await.unwrap();
    assert!(cycles[0].symptoms.is_empty());
    assert_eq!(cycles[1].symptoms, vec!["fatigue"]);
}

#[tokio::test]
async fn symptoms_without_any_cycle_history_are_a_not_found() {
    let store = MemoryStore::new();
    seed_user(&store, "maya@example.com", 28).await;

    let err = merge_symptoms(
        &store,
        "maya@example.com",
        LogSymptomsRequest {
            date: date(2024, 6, 1),
            symptoms: vec!["cramps".into()],
            notes: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

struct RecordingSender {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl SmsSender for RecordingSender {
    async fn send(&self, to: &str, _body: &str) -> Result<String, SmsError> {
        self.sent.lock().unwrap().push(to.to_string());
        Ok(format!("SM{}", self.sent.lock().unwrap().len()))
    }
}

#[tokio::test]
async fn queued_job_notifies_only_opted_in_contacts() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    seed_user(store.as_ref(), "maya@example.com", 28).await;

    let opted_in = store
        .add_contact(
            "maya@example.com",
            NewContact {
                name: "Sam".into(),
                phone: "+15550001111".into(),
                relation: "partner".into(),
                custom_alerts: vec![],
                receive_updates: true,
            },
        )
        .await
        .unwrap();
    let opted_out = store
        .add_contact(
            "maya@example.com",
            NewContact {
                name: "Ida".into(),
                phone: "+15550002222".into(),
                relation: "friend".into(),
                custom_alerts: vec![],
                receive_updates: false,
            },
        )
        .await
        .unwrap();

    let sms = Arc::new(RecordingSender {
        sent: Mutex::new(vec![]),
    });
    let dispatcher = Arc::new(Dispatcher::new(sms.clone(), Arc::clone(&store)));
    let tx = spawn_worker(dispatcher, Arc::clone(&store));

    tx.send(NotifyJob {
        email: "maya@example.com".to_string(),
        template: Template::CycleStart,
        data: MessageData::default().with_var("userName", "Maya"),
    })
    .await
    .unwrap();

    // The worker runs off the request path; poll until it lands.
    let mut contacts = vec![];
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        contacts = store.list_contacts("maya@example.com").await.unwrap();
        if contacts.iter().any(|c| c.last_notified.is_some()) {
            break;
        }
    }

    let sent = sms.sent.lock().unwrap().clone();
    assert_eq!(sent, vec!["+15550001111".to_string()]);
    let sam = contacts.iter().find(|c| c.id == opted_in.id).unwrap();
    let ida = contacts.iter().find(|c| c.id == opted_out.id).unwrap();
    assert!(sam.last_notified.is_some());
    assert_eq!(ida.last_notified, None);
}
