//! Plan policy: how many leads a subscriber may see unlocked under each plan.

use crate::model::Plan;

/// Maximum number of unlocked leads for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    Limited(u32),
    Unbounded,
}

impl Quota {
    pub fn is_bounded(&self) -> bool {
        matches!(self, Quota::Limited(_))
    }

    /// True if a subscriber that has already unlocked `count` leads may
    /// unlock one more.
    pub fn admits(&self, count: u32) -> bool {
        match self {
            Quota::Limited(limit) => count < *limit,
            Quota::Unbounded => true,
        }
    }
}

/// Quota table keyed by plan.
///
/// Only the bounded tiers are tunable: `professional` is always unbounded
/// and `none` is always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanPolicy {
    pub basic: u32,
    pub premium: u32,
}

impl Default for PlanPolicy {
    fn default() -> Self {
        Self {
            basic: 10,
            premium: 25,
        }
    }
}

impl PlanPolicy {
    pub fn quota_for(&self, plan: Plan) -> Quota {
        match plan {
            Plan::Basic => Quota::Limited(self.basic),
            Plan::Premium => Quota::Limited(self.premium),
            Plan::Professional => Quota::Unbounded,
            Plan::None => Quota::Limited(0),
        }
    }
}

/// Quota under the default table.
pub fn quota_for(plan: Plan) -> Quota {
    PlanPolicy::default().quota_for(plan)
}

/// Quota for a raw stored plan name; unknown names fall back to `none`.
pub fn quota_for_name(name: &str) -> Quota {
    quota_for(Plan::from_name(Some(name)))
}
