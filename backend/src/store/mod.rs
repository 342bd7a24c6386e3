//! Storage collaborator for the batch runner.

pub mod memory;
pub mod repository_sqlx;

use allocation::{CounterUpdate, Lead, LeadAssignment, LeadId, Subscriber};
use async_trait::async_trait;

use crate::error::StoreError;

pub use memory::InMemoryLeadStore;
pub use repository_sqlx::SqlxLeadStore;

#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Persist a lead and return the id the store assigned to it.
    async fn create_lead(&self, lead: &Lead) -> Result<LeadId, StoreError>;

    /// Subscribers servicing `category`, with plan and count as currently
    /// stored. May be empty.
    async fn find_subscribers_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<Subscriber>, StoreError>;

    async fn create_assignment(&self, assignment: &LeadAssignment) -> Result<(), StoreError>;

    /// Set a subscriber's lead count to `update.new_count`.
    ///
    /// Implementations that can compare-and-swap should only apply the
    /// write while the stored count still equals `update.previous`.
    async fn update_subscriber_count(&self, update: &CounterUpdate) -> Result<(), StoreError>;
}
