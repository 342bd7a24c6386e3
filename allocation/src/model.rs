//! Shared types used by the allocation core.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Store-assigned identity of a persisted lead.
pub type LeadId = uuid::Uuid;

/// Identity of a subscriber ("user") in the backing store.
pub type SubscriberId = String;

/// A normalized service inquiry derived from one uploaded row.
///
/// Every field except `source_file` and `created_at` is optional at this
/// stage; `service_category` is required before a lead can be distributed
/// (see [`Lead::category`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub service_category: Option<String>,
    pub service: Option<String>,
    pub city: Option<String>,
    pub amount: Option<String>,
    pub pincode: Option<String>,

    /// Name of the uploaded file the row came from.
    pub source_file: String,
    /// Assigned when the row is normalized.
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// The category used for matching, if present and non-blank.
    pub fn category(&self) -> Result<&str, ValidationError> {
        match self.service_category.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => Ok(c),
            _ => Err(ValidationError::MissingCategory),
        }
    }

    /// Short human-readable identification used in logs and error reports.
    pub fn describe(&self) -> String {
        let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        format!(
            "name={} email={} phone={} category={}",
            field(&self.name),
            field(&self.email),
            field(&self.phone),
            field(&self.service_category)
        )
    }
}

/// Subscription tier. Closed set; anything unrecognized is `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    None,
    Basic,
    Premium,
    Professional,
}

impl Plan {
    /// Resolve a stored plan name. Names are exact and lowercase; absent,
    /// unknown or mis-cased names map to `None`.
    pub fn from_name(name: Option<&str>) -> Self {
        name.and_then(|n| n.parse().ok()).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::None => "none",
            Plan::Basic => "basic",
            Plan::Premium => "premium",
            Plan::Professional => "professional",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Plan::None),
            "basic" => Ok(Plan::Basic),
            "premium" => Ok(Plan::Premium),
            "professional" => Ok(Plan::Professional),
            other => Err(ValidationError::UnknownPlan(other.to_string())),
        }
    }
}

/// A subscriber as read at matching time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub active_plan: Plan,
    pub current_lead_count: u32,
}

impl Subscriber {
    pub fn new(id: impl Into<SubscriberId>, active_plan: Plan, current_lead_count: u32) -> Self {
        Self {
            id: id.into(),
            active_plan,
            current_lead_count,
        }
    }
}

/// Visibility of a lead for one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    Locked,
    Unlocked,
}

impl LeadStatus {
    pub fn is_unlocked(&self) -> bool {
        matches!(self, LeadStatus::Unlocked)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Locked => "locked",
            LeadStatus::Unlocked => "unlocked",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "locked" => Ok(LeadStatus::Locked),
            "unlocked" => Ok(LeadStatus::Unlocked),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// An assignment decided for a lead that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAssignment {
    pub subscriber_id: SubscriberId,
    pub status: LeadStatus,
    pub service_category: String,
}

impl PlannedAssignment {
    /// Attach the store-assigned lead id.
    pub fn bind(&self, lead_id: LeadId) -> LeadAssignment {
        LeadAssignment {
            lead_id,
            subscriber_id: self.subscriber_id.clone(),
            status: self.status,
            service_category: self.service_category.clone(),
        }
    }
}

/// The link between one lead and one subscriber. Terminal once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadAssignment {
    pub lead_id: LeadId,
    pub subscriber_id: SubscriberId,
    pub status: LeadStatus,
    pub service_category: String,
}

/// A staged usage-counter increment.
///
/// `previous` is the count observed in the snapshot the decision was made
/// from, so the store can reject the write if the row moved underneath us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterUpdate {
    pub subscriber_id: SubscriberId,
    pub previous: u32,
    pub new_count: u32,
}
