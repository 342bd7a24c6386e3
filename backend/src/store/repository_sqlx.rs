use std::sync::Arc;

use allocation::{
    CounterUpdate, Lead, LeadAssignment, LeadId, LeadStatus, Plan, Subscriber, SubscriberId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{AnyPool, Row};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::LeadStore;
use crate::error::StoreError;

/// SQLx-backed implementation of LeadStore.
/// Responsible only for persistence and row mapping.
#[derive(Clone)]
pub struct SqlxLeadStore {
    pool: Arc<AnyPool>,
}

impl SqlxLeadStore {
    pub fn new(pool: Arc<AnyPool>) -> Self {
        Self { pool }
    }

    /// Insert or replace a subscriber together with the categories it
    /// services.
    pub async fn register_subscriber(
        &self,
        subscriber: &Subscriber,
        categories: &[&str],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
INSERT INTO subscribers (user_id, active_plan, current_lead_count)
VALUES (?, ?, ?)
ON CONFLICT(user_id) DO UPDATE SET
  active_plan = excluded.active_plan,
  current_lead_count = excluded.current_lead_count;
"#,
        )
        .bind(subscriber.id.clone())
        .bind(subscriber.active_plan.as_str())
        .bind(subscriber.current_lead_count as i64)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM subscriber_categories WHERE user_id = ?;")
            .bind(subscriber.id.clone())
            .execute(&mut *tx)
            .await?;

        for category in categories {
            sqlx::query(
                "INSERT INTO subscriber_categories (user_id, service_category) VALUES (?, ?);",
            )
            .bind(subscriber.id.clone())
            .bind(category.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn fetch_subscriber(&self, id: &str) -> Result<Option<Subscriber>, StoreError> {
        let row = sqlx::query(
            r#"
SELECT user_id, active_plan, current_lead_count
FROM subscribers
WHERE user_id = ?;
"#,
        )
        .bind(id.to_string())
        .fetch_optional(&*self.pool)
        .await?;

        row.as_ref().map(row_to_subscriber).transpose()
    }

    pub async fn fetch_lead(&self, lead_id: LeadId) -> Result<Option<Lead>, StoreError> {
        let row = sqlx::query(
            r#"
SELECT name, email, phone, address, service_category, service,
       city, amount, pincode, source_file, created_at
FROM leads
WHERE lead_id = ?;
"#,
        )
        .bind(lead_id.to_string())
        .fetch_optional(&*self.pool)
        .await?;

        row.as_ref().map(row_to_lead).transpose()
    }

    pub async fn assignments_for_lead(
        &self,
        lead_id: LeadId,
    ) -> Result<Vec<LeadAssignment>, StoreError> {
        let rows = sqlx::query(
            r#"
SELECT lead_id, user_id, status, service_category
FROM lead_links
WHERE lead_id = ?
ORDER BY user_id;
"#,
        )
        .bind(lead_id.to_string())
        .fetch_all(&*self.pool)
        .await?;

        rows.iter().map(row_to_assignment).collect()
    }

    async fn subscriber_exists(&self, id: &SubscriberId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT user_id FROM subscribers WHERE user_id = ?;")
            .bind(id.clone())
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl LeadStore for SqlxLeadStore {
    #[instrument(skip_all, target = "store")]
    async fn create_lead(&self, lead: &Lead) -> Result<LeadId, StoreError> {
        let lead_id = Uuid::new_v4();

        sqlx::query(
            r#"
INSERT INTO leads (
  lead_id, name, email, phone, address, service_category, service,
  city, amount, pincode, source_file, created_at
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?);
"#,
        )
        .bind(lead_id.to_string())
        .bind(lead.name.clone())
        .bind(lead.email.clone())
        .bind(lead.phone.clone())
        .bind(lead.address.clone())
        .bind(lead.service_category.clone())
        .bind(lead.service.clone())
        .bind(lead.city.clone())
        .bind(lead.amount.clone())
        .bind(lead.pincode.clone())
        .bind(lead.source_file.clone())
        .bind(lead.created_at.to_rfc3339())
        .execute(&*self.pool)
        .await?;

        debug!(lead_id = %lead_id, "lead created");
        Ok(lead_id)
    }

    #[instrument(skip(self), target = "store")]
    async fn find_subscribers_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<Subscriber>, StoreError> {
        let rows = sqlx::query(
            r#"
SELECT s.user_id, s.active_plan, s.current_lead_count
FROM subscribers s
JOIN subscriber_categories c ON c.user_id = s.user_id
WHERE c.service_category = ?
ORDER BY s.user_id;
"#,
        )
        .bind(category.to_string())
        .fetch_all(&*self.pool)
        .await?;

        // One unmappable row fails the whole lookup.
        rows.iter()
            .map(row_to_subscriber)
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|e| {
                warn!(category = %category, error = %e, "malformed subscriber row");
            })
    }

    #[instrument(
        skip_all,
        target = "store",
        fields(lead_id = %assignment.lead_id, user_id = %assignment.subscriber_id)
    )]
    async fn create_assignment(&self, assignment: &LeadAssignment) -> Result<(), StoreError> {
        let res = sqlx::query(
            r#"
INSERT INTO lead_links (lead_id, user_id, status, service_category)
VALUES (?, ?, ?, ?);
"#,
        )
        .bind(assignment.lead_id.to_string())
        .bind(assignment.subscriber_id.clone())
        .bind(assignment.status.as_str())
        .bind(assignment.service_category.clone())
        .execute(&*self.pool)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Duplicate(format!(
                "lead {} already linked to {}",
                assignment.lead_id, assignment.subscriber_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(
        skip_all,
        target = "store",
        fields(user_id = %update.subscriber_id, new_count = update.new_count)
    )]
    async fn update_subscriber_count(&self, update: &CounterUpdate) -> Result<(), StoreError> {
        let res = sqlx::query(
            r#"
UPDATE subscribers
SET current_lead_count = ?
WHERE user_id = ? AND COALESCE(current_lead_count, 0) = ?;
"#,
        )
        .bind(update.new_count as i64)
        .bind(update.subscriber_id.clone())
        .bind(update.previous as i64)
        .execute(&*self.pool)
        .await?;

        if res.rows_affected() == 1 {
            return Ok(());
        }

        if self.subscriber_exists(&update.subscriber_id).await? {
            Err(StoreError::CounterConflict {
                subscriber_id: update.subscriber_id.clone(),
                expected: update.previous,
            })
        } else {
            Err(StoreError::NotFound(format!(
                "subscriber {}",
                update.subscriber_id
            )))
        }
    }
}

/* =========================
Row mapping + conversions
========================= */

fn row_to_subscriber(r: &sqlx::any::AnyRow) -> Result<Subscriber, StoreError> {
    let id: String = r.try_get("user_id")?;
    let plan: Option<String> = r.try_get("active_plan")?;
    let count: Option<i64> = r.try_get("current_lead_count")?;

    Ok(Subscriber {
        current_lead_count: i64_to_u32(count.unwrap_or(0))
            .map_err(|e| StoreError::Corrupt(format!("subscriber {id}: {e}")))?,
        active_plan: Plan::from_name(plan.as_deref()),
        id,
    })
}

fn row_to_lead(r: &sqlx::any::AnyRow) -> Result<Lead, StoreError> {
    let created_at: String = r.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| StoreError::Corrupt(format!("invalid created_at '{created_at}': {e}")))?
        .with_timezone(&Utc);

    Ok(Lead {
        name: r.try_get("name")?,
        email: r.try_get("email")?,
        phone: r.try_get("phone")?,
        address: r.try_get("address")?,
        service_category: r.try_get("service_category")?,
        service: r.try_get("service")?,
        city: r.try_get("city")?,
        amount: r.try_get("amount")?,
        pincode: r.try_get("pincode")?,
        source_file: r.try_get("source_file")?,
        created_at,
    })
}

fn row_to_assignment(r: &sqlx::any::AnyRow) -> Result<LeadAssignment, StoreError> {
    let lead_id: String = r.try_get("lead_id")?;
    let status: String = r.try_get("status")?;

    Ok(LeadAssignment {
        lead_id: Uuid::parse_str(&lead_id)
            .map_err(|e| StoreError::Corrupt(format!("invalid lead_id '{lead_id}': {e}")))?,
        subscriber_id: r.try_get("user_id")?,
        status: status
            .parse::<LeadStatus>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        service_category: r.try_get("service_category")?,
    })
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

/* =========================
Numeric safety helpers
========================= */

fn i64_to_u32(v: i64) -> Result<u32, String> {
    if v < 0 || v > u32::MAX as i64 {
        return Err(format!("out of range for u32: {v}"));
    }
    Ok(v as u32)
}
