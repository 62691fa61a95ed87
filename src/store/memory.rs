//! In-memory [`Store`]: an arena of per-user records keyed by email.
//! Used by the test suite; behaves like the Postgres store, including
//! append ordering of entries.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Alert, CalendarEvent, Contact, CycleEntry, User};

use super::{
    AlertPatch, CalendarEventPatch, ContactPatch, CycleEntryPatch, NewAlert, NewCalendarEvent,
    NewContact, NewCycleEntry, Store, StoreError,
};

#[derive(Default)]
struct Account {
    user: Option<User>,
    cycles: Vec<CycleEntry>,
    events: Vec<CalendarEvent>,
    contacts: Vec<Contact>,
    alerts: Vec<Alert>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<String, Account>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let account = inner.entry(user.email.clone()).or_default();
        if account.user.is_some() {
            return Err(StoreError::Conflict("user"));
        }
        account.user = Some(user.clone());
        Ok(())
    }

    async fn find_user(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.get(email).and_then(|a| a.user.clone()))
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let slot = inner
            .get_mut(&user.email)
            .and_then(|a| a.user.as_mut())
            .ok_or(StoreError::NotFound("user"))?;
        *slot = user.clone();
        Ok(())
    }

    async fn delete_user(&self, email: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match inner.get(email) {
            Some(account) if account.user.is_some() => {
                inner.remove(email);
                Ok(())
            }
            _ => Err(StoreError::NotFound("user")),
        }
    }

    async fn list_cycles(&self, email: &str) -> Result<Vec<CycleEntry>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.get(email).map(|a| a.cycles.clone()).unwrap_or_default())
    }

    async fn add_cycle(&self, email: &str, entry: NewCycleEntry) -> Result<CycleEntry, StoreError> {
        let mut inner = self.inner.write().await;
        let account = inner.entry(email.to_string()).or_default();
        let entry = CycleEntry {
            id: Uuid::new_v4(),
            start_date: entry.start_date,
            end_date: entry.end_date,
            symptoms: entry.symptoms,
            notes: entry.notes,
            created_at: Utc::now(),
        };
        account.cycles.push(entry.clone());
        Ok(entry)
    }

    async fn update_cycle(
        &self,
        email: &str,
        id: Uuid,
        patch: CycleEntryPatch,
    ) -> Result<CycleEntry, StoreError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .get_mut(email)
            .and_then(|a| a.cycles.iter_mut().find(|c| c.id == id))
            .ok_or(StoreError::NotFound("cycle entry"))?;
        if let Some(start) = patch.start_date {
            entry.start_date = start;
        }
        if let Some(end) = patch.end_date {
            entry.end_date = end;
        }
        if let Some(symptoms) = patch.symptoms {
            entry.symptoms = symptoms;
        }
        if let Some(notes) = patch.notes {
            entry.notes = notes;
        }
        Ok(entry.clone())
    }

    async fn delete_cycle(&self, email: &str, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let account = inner.get_mut(email).ok_or(StoreError::NotFound("cycle entry"))?;
        let before = account.cycles.len();
        account.cycles.retain(|c| c.id != id);
        if account.cycles.len() == before {
            return Err(StoreError::NotFound("cycle entry"));
        }
        Ok(())
    }

    async fn list_events(&self, email: &str) -> Result<Vec<CalendarEvent>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.get(email).map(|a| a.events.clone()).unwrap_or_default())
    }

    async fn add_event(
        &self,
        email: &str,
        event: NewCalendarEvent,
    ) -> Result<CalendarEvent, StoreError> {
        let mut inner = self.inner.write().await;
        let account = inner.entry(email.to_string()).or_default();
        let event = CalendarEvent {
            id: Uuid::new_v4(),
            start_date: event.start_date,
            end_date: event.end_date,
            category: event.category,
            title: event.title,
            note: event.note,
            created_at: Utc::now(),
        };
        account.events.push(event.clone());
        Ok(event)
    }

    async fn update_event(
        &self,
        email: &str,
        id: Uuid,
        patch: CalendarEventPatch,
    ) -> Result<CalendarEvent, StoreError> {
        let mut inner = self.inner.write().await;
        let event = inner
            .get_mut(email)
            .and_then(|a| a.events.iter_mut().find(|e| e.id == id))
            .ok_or(StoreError::NotFound("calendar event"))?;
        if let Some(start) = patch.start_date {
            event.start_date = start;
        }
        if let Some(end) = patch.end_date {
            event.end_date = end;
        }
        if let Some(category) = patch.category {
            event.category = category;
        }
        if let Some(title) = patch.title {
            event.title = title;
        }
        if let Some(note) = patch.note {
            event.note = note;
        }
        Ok(event.clone())
    }

    async fn delete_event(&self, email: &str, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let account = inner
            .get_mut(email)
            .ok_or(StoreError::NotFound("calendar event"))?;
        let before = account.events.len();
        account.events.retain(|e| e.id != id);
        if account.events.len() == before {
            return Err(StoreError::NotFound("calendar event"));
        }
        Ok(())
    }

    async fn list_contacts(&self, email: &str) -> Result<Vec<Contact>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .get(email)
            .map(|a| a.contacts.clone())
            .unwrap_or_default())
    }

    async fn add_contact(&self, email: &str, contact: NewContact) -> Result<Contact, StoreError> {
        let mut inner = self.inner.write().await;
        let account = inner.entry(email.to_string()).or_default();
        let contact = Contact {
            id: Uuid::new_v4(),
            name: contact.name,
            phone: contact.phone,
            relation: contact.relation,
            custom_alerts: contact.custom_alerts,
            receive_updates: contact.receive_updates,
            last_notified: None,
            created_at: Utc::now(),
        };
        account.contacts.push(contact.clone());
        Ok(contact)
    }

    async fn update_contact(
        &self,
        email: &str,
        id: Uuid,
        patch: ContactPatch,
    ) -> Result<Contact, StoreError> {
        let mut inner = self.inner.write().await;
        let contact = inner
            .get_mut(email)
            .and_then(|a| a.contacts.iter_mut().find(|c| c.id == id))
            .ok_or(StoreError::NotFound("contact"))?;
        if let Some(name) = patch.name {
            contact.name = name;
        }
        if let Some(phone) = patch.phone {
            contact.phone = phone;
        }
        if let Some(relation) = patch.relation {
            contact.relation = relation;
        }
        if let Some(custom_alerts) = patch.custom_alerts {
            contact.custom_alerts = custom_alerts;
        }
        if let Some(receive) = patch.receive_updates {
            contact.receive_updates = receive;
        }
        Ok(contact.clone())
    }

    async fn delete_contact(&self, email: &str, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let account = inner.get_mut(email).ok_or(StoreError::NotFound("contact"))?;
        let before = account.contacts.len();
        account.contacts.retain(|c| c.id != id);
        if account.contacts.len() == before {
            return Err(StoreError::NotFound("contact"));
        }
        Ok(())
    }

    async fn set_receive_updates_all(&self, email: &str, receive: bool) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let account = inner.get_mut(email).ok_or(StoreError::NotFound("contact"))?;
        for contact in &mut account.contacts {
            contact.receive_updates = receive;
        }
        Ok(())
    }

    async fn mark_notified(
        &self,
        email: &str,
        ids: &[Uuid],
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(account) = inner.get_mut(email) {
            for contact in &mut account.contacts {
                if ids.contains(&contact.id) {
                    contact.last_notified = Some(at);
                }
            }
        }
        Ok(())
    }

    async fn list_alerts(&self, email: &str) -> Result<Vec<Alert>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.get(email).map(|a| a.alerts.clone()).unwrap_or_default())
    }

    async fn add_alert(&self, email: &str, alert: NewAlert) -> Result<Alert, StoreError> {
        let mut inner = self.inner.write().await;
        let account = inner.entry(email.to_string()).or_default();
        let now = Utc::now();
        let alert = Alert {
            id: Uuid::new_v4(),
            target: alert.target,
            date: alert.date,
            symptoms: alert.symptoms,
            notes: alert.notes,
            created_at: now,
            updated_at: now,
        };
        account.alerts.push(alert.clone());
        Ok(alert)
    }

    async fn get_alert(&self, email: &str, id: Uuid) -> Result<Option<Alert>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .get(email)
            .and_then(|a| a.alerts.iter().find(|al| al.id == id).cloned()))
    }

    async fn update_alert(
        &self,
        email: &str,
        id: Uuid,
        patch: AlertPatch,
    ) -> Result<Alert, StoreError> {
        let mut inner = self.inner.write().await;
        let alert = inner
            .get_mut(email)
            .and_then(|a| a.alerts.iter_mut().find(|al| al.id == id))
            .ok_or(StoreError::NotFound("alert"))?;
        if let Some(symptoms) = patch.symptoms {
            alert.symptoms = symptoms;
        }
        if let Some(notes) = patch.notes {
            alert.notes = notes;
        }
        alert.updated_at = Utc::now();
        Ok(alert.clone())
    }

    async fn delete_alert(&self, email: &str, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let account = inner.get_mut(email).ok_or(StoreError::NotFound("alert"))?;
        let before = account.alerts.len();
        account.alerts.retain(|a| a.id != id);
        if account.alerts.len() == before {
            return Err(StoreError::NotFound("alert"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate};

    fn new_entry(day: u32) -> NewCycleEntry {
        NewCycleEntry {
            start_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, day + 4).unwrap(),
            symptoms: vec!["cramps".into()],
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn cycles_keep_append_order_and_reads_are_idempotent() {
        let store = MemoryStore::new();
        for day in [1, 8, 15] {
            store.add_cycle("a@b.c", new_entry(day)).await.unwrap();
        }

        let first = store.list_cycles("a@b.c").await.unwrap();
        let second = store.list_cycles("a@b.c").await.unwrap();

        let starts: Vec<_> = first.iter().map(|c| c.start_date.day()).collect();
        assert_eq!(starts, vec![1, 8, 15]);
        let ids_a: Vec<_> = first.iter().map(|c| c.id).collect();
        let ids_b: Vec<_> = second.iter().map(|c| c.id).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[tokio::test]
    async fn collections_are_isolated_per_user() {
        let store = MemoryStore::new();
        store.add_cycle("a@b.c", new_entry(1)).await.unwrap();
        assert!(store.list_cycles("x@y.z").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_notified_only_touches_given_ids() {
        let store = MemoryStore::new();
        let c1 = store
            .add_contact(
                "a@b.c",
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
        let c2 = store
            .add_contact(
                "a@b.c",
                NewContact {
                    name: "Ida".into(),
                    phone: "+15550002222".into(),
                    relation: "friend".into(),
                    custom_alerts: vec![],
                    receive_updates: true,
                },
            )
            .await
            .unwrap();

        let now = Utc::now();
        store.mark_notified("a@b.c", &[c1.id], now).await.unwrap();

        let contacts = store.list_contacts("a@b.c").await.unwrap();
        let c1 = contacts.iter().find(|c| c.id == c1.id).unwrap();
        let c2 = contacts.iter().find(|c| c.id == c2.id).unwrap();
        assert_eq!(c1.last_notified, Some(now));
        assert_eq!(c2.last_notified, None);
    }
}
