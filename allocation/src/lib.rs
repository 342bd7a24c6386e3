//! Allocation core: plan quotas, per-subscriber lock/unlock decisions and
//! the per-lead mutation set. Pure, with no I/O.

pub mod decision;
pub mod distributor;
pub mod error;
pub mod model;
pub mod policy;

pub use decision::decide;
pub use distributor::{Distribution, LeadDistributor};
pub use error::ValidationError;
pub use model::{
    CounterUpdate, Lead, LeadAssignment, LeadId, LeadStatus, Plan, PlannedAssignment, Subscriber,
    SubscriberId,
};
pub use policy::{PlanPolicy, Quota, quota_for};
