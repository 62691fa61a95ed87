//! Notification dispatch: template rendering, concurrent batch sends with
//! per-contact failure isolation, and the background queue that handles
//! the period-logged trigger.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::Contact;
use crate::store::Store;

pub mod twilio;

pub use twilio::{SmsError, SmsSender, TwilioSms};

const QUEUE_DEPTH: usize = 64;
const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    #[serde(alias = "cycleStart")]
    CycleStart,
    #[serde(alias = "pmsWeek")]
    PmsWeek,
    Ovulation,
    General,
}

impl Template {
    pub fn text(self) -> &'static str {
        match self {
            Template::CycleStart => "Day 1 of {{userName}}'s cycle: Offer extra care today.",
            Template::PmsWeek => "PMS week for {{userName}}: Encourage rest and hydration.",
            Template::Ovulation => "Ovulation period: Energy levels may be higher.",
            Template::General => "CycleConnect update: Supporting {{userName}} through the cycle.",
        }
    }
}

/// Variables substituted into a template. A literal `custom_message`
/// overrides template substitution entirely.
#[derive(Debug, Clone, Default)]
pub struct MessageData {
    pub custom_message: Option<String>,
    pub vars: HashMap<String, String>,
}

impl MessageData {
    pub fn with_var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }
}

/// Substitute `{{placeholder}}` tokens. Unresolved tokens are left
/// verbatim.
pub fn render(template: Template, data: &MessageData) -> String {
    if let Some(custom) = &data.custom_message {
        return custom.clone();
    }
    let mut message = template.text().to_string();
    for (key, value) in &data.vars {
        message = message.replace(&format!("{{{{{key}}}}}"), value);
        message = message.replace(&format!("{{{{ {key} }}}}"), value);
    }
    message
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryResult {
    pub contact_id: Uuid,
    pub contact_name: String,
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

/// One delivery attempt per contact, run concurrently and joined. A
/// failed send is recorded and never aborts the rest of the batch.
pub async fn send_batch(
    sms: &dyn SmsSender,
    contacts: &[Contact],
    template: Template,
    data: &MessageData,
) -> Vec<DeliveryResult> {
    let sends = contacts.iter().map(|contact| {
        let message = render(
            template,
            &data.clone().with_var("contactName", contact.name.clone()),
        );
        async move {
            match sms.send(&contact.phone, &message).await {
                Ok(message_id) => DeliveryResult {
                    contact_id: contact.id,
                    contact_name: contact.name.clone(),
                    success: true,
                    message_id: Some(message_id),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!("SMS to {} failed: {e}", contact.name);
                    DeliveryResult {
                        contact_id: contact.id,
                        contact_name: contact.name.clone(),
                        success: false,
                        message_id: None,
                        error: Some(e.to_string()),
                    }
                }
            }
        }
    });
    join_all(sends).await
}

/// Injected into handlers; owns the provider and the timestamp
/// bookkeeping.
pub struct Dispatcher {
    sms: Arc<dyn SmsSender>,
    store: Arc<dyn Store>,
}

impl Dispatcher {
    pub fn new(sms: Arc<dyn SmsSender>, store: Arc<dyn Store>) -> Self {
        Self { sms, store }
    }

    /// Send to the given contacts and persist last-notified timestamps
    /// once after the whole batch. A crash between send and persist can
    /// leave notified contacts without timestamps; accepted.
    pub async fn dispatch(
        &self,
        email: &str,
        contacts: &[Contact],
        template: Template,
        data: &MessageData,
    ) -> Vec<DeliveryResult> {
        let results = send_batch(self.sms.as_ref(), contacts, template, data).await;

        let notified: Vec<Uuid> = results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.contact_id)
            .collect();
        if let Err(e) = self.store.mark_notified(email, &notified, Utc::now()).await {
            tracing::error!("failed to persist last-notified timestamps: {e}");
        }
        results
    }
}

/// A queued notification triggered outside the request path.
#[derive(Debug, Clone)]
pub struct NotifyJob {
    pub email: String,
    pub template: Template,
    pub data: MessageData,
}

/// Start the background worker that consumes [`NotifyJob`]s. Failed
/// recipients get one retry pass; outcomes are logged and never surfaced
/// to the request that enqueued the job.
pub fn spawn_worker(dispatcher: Arc<Dispatcher>, store: Arc<dyn Store>) -> mpsc::Sender<NotifyJob> {
    let (tx, mut rx) = mpsc::channel::<NotifyJob>(QUEUE_DEPTH);
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            process_job(&dispatcher, store.as_ref(), job).await;
        }
        tracing::info!("notification worker shutting down");
    });
    tx
}

async fn process_job(dispatcher: &Dispatcher, store: &dyn Store, job: NotifyJob) {
    let contacts = match store.list_contacts(&job.email).await {
        Ok(contacts) => contacts,
        Err(e) => {
            tracing::error!("notify job for {}: contact lookup failed: {e}", job.email);
            return;
        }
    };

    let eligible: Vec<Contact> = contacts.into_iter().filter(|c| c.receive_updates).collect();
    if eligible.is_empty() {
        tracing::debug!("notify job for {}: no eligible contacts", job.email);
        return;
    }

    let results = dispatcher
        .dispatch(&job.email, &eligible, job.template, &job.data)
        .await;

    let failed: Vec<Contact> = eligible
        .into_iter()
        .filter(|c| {
            results
                .iter()
                .any(|r| r.contact_id == c.id && !r.success)
        })
        .collect();
    if failed.is_empty() {
        tracing::info!("notify job for {}: {} sent", job.email, results.len());
        return;
    }

    tracing::warn!(
        "notify job for {}: retrying {} failed contact(s)",
        job.email,
        failed.len()
    );
    tokio::time::sleep(RETRY_DELAY).await;
    let retried = dispatcher
        .dispatch(&job.email, &failed, job.template, &job.data)
        .await;
    for result in retried.iter().filter(|r| !r.success) {
        tracing::error!(
            "notify job for {}: giving up on {}: {}",
            job.email,
            result.contact_name,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn contact(name: &str) -> Contact {
        Contact {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone: format!("+1555000{name}"),
            relation: "friend".to_string(),
            custom_alerts: vec![],
            receive_updates: true,
            last_notified: None,
            created_at: Utc::now(),
        }
    }

    /// Fails every Nth call (1-based), counting across the whole test.
    struct FlakySender {
        calls: AtomicUsize,
        fail_on: usize,
    }

    #[async_trait]
    impl SmsSender for FlakySender {
        async fn send(&self, _to: &str, _body: &str) -> Result<String, SmsError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.fail_on {
                Err(SmsError::Provider("simulated outage".into()))
            } else {
                Ok(format!("SM{n}"))
            }
        }
    }

    #[test]
    fn template_substitution() {
        let data = MessageData::default().with_var("userName", "Maya");
        assert_eq!(
            render(Template::CycleStart, &data),
            "Day 1 of Maya's cycle: Offer extra care today."
        );
    }

    #[test]
    fn unresolved_tokens_stay_verbatim() {
        let rendered = render(Template::General, &MessageData::default());
        assert!(rendered.contains("{{userName}}"));
    }

    #[test]
    fn custom_message_overrides_template() {
        let data = MessageData {
            custom_message: Some("checking in".to_string()),
            ..Default::default()
        };
        assert_eq!(render(Template::CycleStart, &data), "checking in");
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_batch() {
        let sender = FlakySender {
            calls: AtomicUsize::new(0),
            fail_on: 2,
        };
        let contacts = vec![contact("a"), contact("b"), contact("c")];

        let results = send_batch(
            &sender,
            &contacts,
            Template::General,
            &MessageData::default(),
        )
        .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|r| !r.success).count(), 1);
        assert!(!results[1].success);
        assert!(results[2].success, "third contact still processed");
    }

    #[tokio::test]
    async fn dispatch_persists_timestamps_for_successes_only() {
        use crate::store::{MemoryStore, NewContact};

        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        for name in ["a", "b", "c"] {
            store
                .add_contact(
                    "u@example.com",
                    NewContact {
                        name: name.to_string(),
                        phone: format!("+1555000{name}"),
                        relation: "friend".to_string(),
                        custom_alerts: vec![],
                        receive_updates: true,
                    },
                )
                .await
                .unwrap();
        }
        let contacts = store.list_contacts("u@example.com").await.unwrap();

        let sms = Arc::new(FlakySender {
            calls: AtomicUsize::new(0),
            fail_on: 2,
        });
        let dispatcher = Dispatcher::new(sms, Arc::clone(&store));

        let results = dispatcher
            .dispatch(
                "u@example.com",
                &contacts,
                Template::General,
                &MessageData::default(),
            )
            .await;
        assert_eq!(results.iter().filter(|r| r.success).count(), 2);

        let after = store.list_contacts("u@example.com").await.unwrap();
        let stamped = after.iter().filter(|c| c.last_notified.is_some()).count();
        assert_eq!(stamped, 2);
    }
}
