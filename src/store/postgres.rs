//! Postgres-backed [`Store`]. Queries are runtime-checked so the crate
//! builds without a live database; the schema lives in `migrations/`.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, FromRow, PgPool, Row};
use uuid::Uuid;

use crate::models::{Alert, CalendarEvent, Contact, CycleEntry, User};

use super::{
    AlertPatch, CalendarEventPatch, ContactPatch, CycleEntryPatch, NewAlert, NewCalendarEvent,
    NewContact, NewCycleEntry, Store, StoreError,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    email: String,
    name: String,
    age: i32,
    phone: String,
    password_hash: String,
    avg_cycle_length: i32,
    cycle_status: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User, StoreError> {
        let cycle_status = self
            .cycle_status
            .parse()
            .map_err(|e: String| StoreError::Backend(anyhow!(e)))?;
        Ok(User {
            email: self.email,
            name: self.name,
            age: self.age,
            phone: self.phone,
            password_hash: self.password_hash,
            avg_cycle_length: self.avg_cycle_length,
            cycle_status,
            created_at: self.created_at,
        })
    }
}

fn cycle_from_row(row: PgRow) -> Result<CycleEntry, sqlx::Error> {
    Ok(CycleEntry {
        id: row.try_get("id")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        symptoms: row.try_get("symptoms")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
    })
}

fn event_from_row(row: PgRow) -> Result<CalendarEvent, sqlx::Error> {
    Ok(CalendarEvent {
        id: row.try_get("id")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        category: row.try_get("category")?,
        title: row.try_get("title")?,
        note: row.try_get("note")?,
        created_at: row.try_get("created_at")?,
    })
}

fn contact_from_row(row: PgRow) -> Result<Contact, sqlx::Error> {
    Ok(Contact {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        relation: row.try_get("relation")?,
        custom_alerts: row.try_get("custom_alerts")?,
        receive_updates: row.try_get("receive_updates")?,
        last_notified: row.try_get("last_notified")?,
        created_at: row.try_get("created_at")?,
    })
}

fn alert_from_row(row: PgRow) -> Result<Alert, StoreError> {
    let target: String = row.try_get("target").map_err(StoreError::from)?;
    let target = target
        .parse()
        .map_err(|e: String| StoreError::Backend(anyhow!(e)))?;
    Ok(Alert {
        id: row.try_get("id").map_err(StoreError::from)?,
        target,
        date: row.try_get("date").map_err(StoreError::from)?,
        symptoms: row.try_get("symptoms").map_err(StoreError::from)?,
        notes: row.try_get("notes").map_err(StoreError::from)?,
        created_at: row.try_get("created_at").map_err(StoreError::from)?,
        updated_at: row.try_get("updated_at").map_err(StoreError::from)?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO users \
             (email, name, age, phone, password_hash, avg_cycle_length, cycle_status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (email) DO NOTHING",
        )
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.age)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.avg_cycle_length)
        .bind(user.cycle_status.to_string())
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict("user"));
        }
        Ok(())
    }

    async fn find_user(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT email, name, age, phone, password_hash, avg_cycle_length, cycle_status, created_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET name = $2, age = $3, phone = $4, password_hash = $5, \
             avg_cycle_length = $6, cycle_status = $7 WHERE email = $1",
        )
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.age)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.avg_cycle_length)
        .bind(user.cycle_status.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }

    async fn delete_user(&self, email: &str) -> Result<(), StoreError> {
        // Owned rows cascade via the schema's foreign keys.
        let result = sqlx::query("DELETE FROM users WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }

    async fn list_cycles(&self, email: &str) -> Result<Vec<CycleEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, start_date, end_date, symptoms, notes, created_at \
             FROM cycle_entries WHERE email = $1 ORDER BY created_at, id",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| cycle_from_row(r).map_err(StoreError::from))
            .collect()
    }

    async fn add_cycle(&self, email: &str, entry: NewCycleEntry) -> Result<CycleEntry, StoreError> {
        let row = sqlx::query(
            "INSERT INTO cycle_entries (id, email, start_date, end_date, symptoms, notes, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, now()) \
             RETURNING id, start_date, end_date, symptoms, notes, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(entry.start_date)
        .bind(entry.end_date)
        .bind(&entry.symptoms)
        .bind(&entry.notes)
        .fetch_one(&self.pool)
        .await?;

        cycle_from_row(row).map_err(StoreError::from)
    }

    async fn update_cycle(
        &self,
        email: &str,
        id: Uuid,
        patch: CycleEntryPatch,
    ) -> Result<CycleEntry, StoreError> {
        let row = sqlx::query(
            "UPDATE cycle_entries SET \
               start_date = COALESCE($3, start_date), \
               end_date = COALESCE($4, end_date), \
               symptoms = COALESCE($5, symptoms), \
               notes = COALESCE($6, notes) \
             WHERE email = $1 AND id = $2 \
             RETURNING id, start_date, end_date, symptoms, notes, created_at",
        )
        .bind(email)
        .bind(id)
        .bind(patch.start_date)
        .bind(patch.end_date)
        .bind(patch.symptoms)
        .bind(patch.notes)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => cycle_from_row(row).map_err(StoreError::from),
            None => Err(StoreError::NotFound("cycle entry")),
        }
    }

    async fn delete_cycle(&self, email: &str, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM cycle_entries WHERE email = $1 AND id = $2")
            .bind(email)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("cycle entry"));
        }
        Ok(())
    }

    async fn list_events(&self, email: &str) -> Result<Vec<CalendarEvent>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, start_date, end_date, category, title, note, created_at \
             FROM calendar_events WHERE email = $1 ORDER BY created_at, id",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| event_from_row(r).map_err(StoreError::from))
            .collect()
    }

    async fn add_event(
        &self,
        email: &str,
        event: NewCalendarEvent,
    ) -> Result<CalendarEvent, StoreError> {
        let row = sqlx::query(
            "INSERT INTO calendar_events (id, email, start_date, end_date, category, title, note, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, now()) \
             RETURNING id, start_date, end_date, category, title, note, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(&event.category)
        .bind(&event.title)
        .bind(&event.note)
        .fetch_one(&self.pool)
        .await?;

        event_from_row(row).map_err(StoreError::from)
    }

    async fn update_event(
        &self,
        email: &str,
        id: Uuid,
        patch: CalendarEventPatch,
    ) -> Result<CalendarEvent, StoreError> {
        let row = sqlx::query(
            "UPDATE calendar_events SET \
               start_date = COALESCE($3, start_date), \
               end_date = COALESCE($4, end_date), \
               category = COALESCE($5, category), \
               title = COALESCE($6, title), \
               note = COALESCE($7, note) \
             WHERE email = $1 AND id = $2 \
             RETURNING id, start_date, end_date, category, title, note, created_at",
        )
        .bind(email)
        .bind(id)
        .bind(patch.start_date)
        .bind(patch.end_date)
        .bind(patch.category)
        .bind(patch.title)
        .bind(patch.note)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => event_from_row(row).map_err(StoreError::from),
            None => Err(StoreError::NotFound("calendar event")),
        }
    }

    async fn delete_event(&self, email: &str, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM calendar_events WHERE email = $1 AND id = $2")
            .bind(email)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("calendar event"));
        }
        Ok(())
    }

    async fn list_contacts(&self, email: &str) -> Result<Vec<Contact>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, phone, relation, custom_alerts, receive_updates, last_notified, created_at \
             FROM contacts WHERE email = $1 ORDER BY created_at, id",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| contact_from_row(r).map_err(StoreError::from))
            .collect()
    }

    async fn add_contact(&self, email: &str, contact: NewContact) -> Result<Contact, StoreError> {
        let row = sqlx::query(
            "INSERT INTO contacts (id, email, name, phone, relation, custom_alerts, receive_updates, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, now()) \
             RETURNING id, name, phone, relation, custom_alerts, receive_updates, last_notified, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(&contact.name)
        .bind(&contact.phone)
        .bind(&contact.relation)
        .bind(&contact.custom_alerts)
        .bind(contact.receive_updates)
        .fetch_one(&self.pool)
        .await?;

        contact_from_row(row).map_err(StoreError::from)
    }

    async fn update_contact(
        &self,
        email: &str,
        id: Uuid,
        patch: ContactPatch,
    ) -> Result<Contact, StoreError> {
        let row = sqlx::query(
            "UPDATE contacts SET \
               name = COALESCE($3, name), \
               phone = COALESCE($4, phone), \
               relation = COALESCE($5, relation), \
               custom_alerts = COALESCE($6, custom_alerts), \
               receive_updates = COALESCE($7, receive_updates) \
             WHERE email = $1 AND id = $2 \
             RETURNING id, name, phone, relation, custom_alerts, receive_updates, last_notified, created_at",
        )
        .bind(email)
        .bind(id)
        .bind(patch.name)
        .bind(patch.phone)
        .bind(patch.relation)
        .bind(patch.custom_alerts)
        .bind(patch.receive_updates)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => contact_from_row(row).map_err(StoreError::from),
            None => Err(StoreError::NotFound("contact")),
        }
    }

    async fn delete_contact(&self, email: &str, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM contacts WHERE email = $1 AND id = $2")
            .bind(email)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("contact"));
        }
        Ok(())
    }

    async fn set_receive_updates_all(&self, email: &str, receive: bool) -> Result<(), StoreError> {
        sqlx::query("UPDATE contacts SET receive_updates = $2 WHERE email = $1")
            .bind(email)
            .bind(receive)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_notified(
        &self,
        email: &str,
        ids: &[Uuid],
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE contacts SET last_notified = $3 WHERE email = $1 AND id = ANY($2)")
            .bind(email)
            .bind(ids.to_vec())
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_alerts(&self, email: &str) -> Result<Vec<Alert>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, target, date, symptoms, notes, created_at, updated_at \
             FROM alerts WHERE email = $1 ORDER BY created_at, id",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(alert_from_row).collect()
    }

    async fn add_alert(&self, email: &str, alert: NewAlert) -> Result<Alert, StoreError> {
        let row = sqlx::query(
            "INSERT INTO alerts (id, email, target, date, symptoms, notes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, now(), now()) \
             RETURNING id, target, date, symptoms, notes, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(alert.target.to_string())
        .bind(alert.date)
        .bind(&alert.symptoms)
        .bind(&alert.notes)
        .fetch_one(&self.pool)
        .await?;

        alert_from_row(row)
    }

    async fn get_alert(&self, email: &str, id: Uuid) -> Result<Option<Alert>, StoreError> {
        let row = sqlx::query(
            "SELECT id, target, date, symptoms, notes, created_at, updated_at \
             FROM alerts WHERE email = $1 AND id = $2",
        )
        .bind(email)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(alert_from_row).transpose()
    }

    async fn update_alert(
        &self,
        email: &str,
        id: Uuid,
        patch: AlertPatch,
    ) -> Result<Alert, StoreError> {
        let row = sqlx::query(
            "UPDATE alerts SET \
               symptoms = COALESCE($3, symptoms), \
               notes = COALESCE($4, notes), \
               updated_at = now() \
             WHERE email = $1 AND id = $2 \
             RETURNING id, target, date, symptoms, notes, created_at, updated_at",
        )
        .bind(email)
        .bind(id)
        .bind(patch.symptoms)
        .bind(patch.notes)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => alert_from_row(row),
            None => Err(StoreError::NotFound("alert")),
        }
    }

    async fn delete_alert(&self, email: &str, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM alerts WHERE email = $1 AND id = $2")
            .bind(email)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("alert"));
        }
        Ok(())
    }
}
