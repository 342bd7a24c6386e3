use std::collections::HashMap;

use allocation::{CounterUpdate, Lead, LeadAssignment, LeadId, Subscriber, SubscriberId};
use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use super::LeadStore;
use crate::error::StoreError;

#[derive(Default)]
struct Inner {
    leads: Vec<(LeadId, Lead)>,
    /// Registration order is the order `find_subscribers_by_category` returns.
    subscribers: Vec<Subscriber>,
    categories: HashMap<SubscriberId, Vec<String>>,
    assignments: Vec<LeadAssignment>,
}

/// Process-local store, used by the tests.
#[derive(Default)]
pub struct InMemoryLeadStore {
    inner: Mutex<Inner>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a subscriber and the categories it services.
    pub fn register_subscriber(&self, subscriber: Subscriber, categories: &[&str]) {
        let mut g = self.inner.lock();

        g.categories.insert(
            subscriber.id.clone(),
            categories.iter().map(|c| c.to_string()).collect(),
        );

        match g.subscribers.iter_mut().find(|s| s.id == subscriber.id) {
            Some(existing) => *existing = subscriber,
            None => g.subscribers.push(subscriber),
        }
    }

    pub fn subscriber(&self, id: &str) -> Option<Subscriber> {
        self.inner
            .lock()
            .subscribers
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    pub fn leads(&self) -> Vec<(LeadId, Lead)> {
        self.inner.lock().leads.clone()
    }

    pub fn assignments(&self) -> Vec<LeadAssignment> {
        self.inner.lock().assignments.clone()
    }

    pub fn assignments_for_lead(&self, lead_id: LeadId) -> Vec<LeadAssignment> {
        self.inner
            .lock()
            .assignments
            .iter()
            .filter(|a| a.lead_id == lead_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn create_lead(&self, lead: &Lead) -> Result<LeadId, StoreError> {
        let id = Uuid::new_v4();
        self.inner.lock().leads.push((id, lead.clone()));
        Ok(id)
    }

    async fn find_subscribers_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<Subscriber>, StoreError> {
        let g = self.inner.lock();

        Ok(g.subscribers
            .iter()
            .filter(|s| {
                g.categories
                    .get(&s.id)
                    .is_some_and(|cats| cats.iter().any(|c| c == category))
            })
            .cloned()
            .collect())
    }

    async fn create_assignment(&self, assignment: &LeadAssignment) -> Result<(), StoreError> {
        let mut g = self.inner.lock();

        let duplicate = g.assignments.iter().any(|a| {
            a.lead_id == assignment.lead_id && a.subscriber_id == assignment.subscriber_id
        });
        if duplicate {
            return Err(StoreError::Duplicate(format!(
                "lead {} already linked to {}",
                assignment.lead_id, assignment.subscriber_id
            )));
        }

        g.assignments.push(assignment.clone());
        Ok(())
    }

    async fn update_subscriber_count(&self, update: &CounterUpdate) -> Result<(), StoreError> {
        let mut g = self.inner.lock();

        let sub = g
            .subscribers
            .iter_mut()
            .find(|s| s.id == update.subscriber_id)
            .ok_or_else(|| StoreError::NotFound(format!("subscriber {}", update.subscriber_id)))?;

        if sub.current_lead_count != update.previous {
            return Err(StoreError::CounterConflict {
                subscriber_id: update.subscriber_id.clone(),
                expected: update.previous,
            });
        }

        sub.current_lead_count = update.new_count;
        Ok(())
    }
}
