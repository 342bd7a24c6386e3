//! Lead distributor.
//!
//! For one lead and the subscribers that service its category, it:
//!   1. Looks up each subscriber's quota through `policy`.
//!   2. Decides locked/unlocked per subscriber through `decision`.
//!   3. Stages one assignment per subscriber and one counter increment per
//!      bounded-plan unlock.
//!
//! Nothing here touches a store. The caller applies the returned
//! [`Distribution`] in order: lead, assignments, counter updates.

use tracing::{debug, instrument};

use crate::decision::decide;
use crate::error::ValidationError;
use crate::model::{CounterUpdate, Lead, PlannedAssignment, Subscriber};
use crate::policy::PlanPolicy;

/// The mutation set produced for a single lead.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    pub lead: Lead,
    /// Trimmed category the subscribers were matched on.
    pub category: String,
    /// One entry per matched subscriber, in input order.
    pub assignments: Vec<PlannedAssignment>,
    pub counter_updates: Vec<CounterUpdate>,
}

impl Distribution {
    pub fn unlocked(&self) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.status.is_unlocked())
            .count()
    }

    pub fn locked(&self) -> usize {
        self.assignments.len() - self.unlocked()
    }

    pub fn has_recipients(&self) -> bool {
        !self.assignments.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LeadDistributor {
    policy: PlanPolicy,
}

impl LeadDistributor {
    pub fn new(policy: PlanPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PlanPolicy {
        &self.policy
    }

    /// Decide every matched subscriber's copy of `lead`.
    ///
    /// `subscribers` is the snapshot taken at the start of this lead. Each
    /// decision only looks at its own subscriber's plan and count, so no
    /// subscriber influences another's outcome.
    #[instrument(skip_all, target = "distributor", fields(subscribers = subscribers.len()))]
    pub fn distribute(
        &self,
        lead: &Lead,
        subscribers: &[Subscriber],
    ) -> Result<Distribution, ValidationError> {
        let category = lead.category()?.to_string();

        let mut assignments = Vec::with_capacity(subscribers.len());
        let mut counter_updates = Vec::new();

        for sub in subscribers {
            let quota = self.policy.quota_for(sub.active_plan);
            let status = decide(sub.active_plan, sub.current_lead_count, quota);

            debug!(
                subscriber_id = %sub.id,
                plan = %sub.active_plan,
                count = sub.current_lead_count,
                status = %status,
                "lead decision"
            );

            // Unbounded plans are never counted.
            if status.is_unlocked() && quota.is_bounded() {
                counter_updates.push(CounterUpdate {
                    subscriber_id: sub.id.clone(),
                    previous: sub.current_lead_count,
                    new_count: sub.current_lead_count + 1,
                });
            }

            assignments.push(PlannedAssignment {
                subscriber_id: sub.id.clone(),
                status,
                service_category: category.clone(),
            });
        }

        Ok(Distribution {
            lead: lead.clone(),
            category,
            assignments,
            counter_updates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LeadStatus, Plan};

    fn lead(category: Option<&str>) -> Lead {
        Lead {
            name: Some("Asha".into()),
            phone: Some("9800000000".into()),
            service_category: category.map(Into::into),
            source_file: "leads.xlsx".into(),
            ..Default::default()
        }
    }

    fn sub(id: &str, plan: Plan, count: u32) -> Subscriber {
        Subscriber::new(id, plan, count)
    }

    #[test]
    fn empty_subscriber_set_is_not_an_error() {
        let d = LeadDistributor::default()
            .distribute(&lead(Some("electrical")), &[])
            .unwrap();

        assert!(d.assignments.is_empty());
        assert!(d.counter_updates.is_empty());
        assert!(!d.has_recipients());
        assert_eq!(d.category, "electrical");
    }

    #[test]
    fn missing_category_is_rejected() {
        let out = LeadDistributor::default().distribute(&lead(None), &[sub("a", Plan::Basic, 0)]);
        assert_eq!(out, Err(ValidationError::MissingCategory));
    }

    #[test]
    fn one_assignment_per_subscriber_in_input_order() {
        let subs = vec![
            sub("c", Plan::None, 0),
            sub("a", Plan::Professional, 40),
            sub("b", Plan::Basic, 10),
        ];

        let d = LeadDistributor::default()
            .distribute(&lead(Some("plumbing")), &subs)
            .unwrap();

        let ids: Vec<_> = d.assignments.iter().map(|a| a.subscriber_id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);

        let statuses: Vec<_> = d.assignments.iter().map(|a| a.status).collect();
        assert_eq!(
            statuses,
            [LeadStatus::Locked, LeadStatus::Unlocked, LeadStatus::Locked]
        );
        assert!(d.assignments.iter().all(|a| a.service_category == "plumbing"));
    }

    #[test]
    fn only_bounded_unlocks_are_counted() {
        let subs = vec![
            sub("basic", Plan::Basic, 3),
            sub("pro", Plan::Professional, 100),
            sub("premium", Plan::Premium, 24),
            sub("full", Plan::Premium, 25),
        ];

        let d = LeadDistributor::default()
            .distribute(&lead(Some("plumbing")), &subs)
            .unwrap();

        assert_eq!(d.unlocked(), 3);
        assert_eq!(d.locked(), 1);
        assert_eq!(
            d.counter_updates,
            vec![
                CounterUpdate {
                    subscriber_id: "basic".into(),
                    previous: 3,
                    new_count: 4
                },
                CounterUpdate {
                    subscriber_id: "premium".into(),
                    previous: 24,
                    new_count: 25
                },
            ]
        );
    }

    #[test]
    fn decisions_are_local_to_each_subscriber() {
        // Many subscribers at the edge of the same quota all unlock; nothing
        // is rationed across them.
        let subs: Vec<_> = (0..5).map(|i| sub(&format!("s{i}"), Plan::Basic, 9)).collect();

        let d = LeadDistributor::default()
            .distribute(&lead(Some("plumbing")), &subs)
            .unwrap();

        assert_eq!(d.unlocked(), 5);
        assert_eq!(d.counter_updates.len(), 5);
        assert!(d.counter_updates.iter().all(|u| u.new_count == 10));
    }

    #[test]
    fn custom_policy_is_applied() {
        let distributor = LeadDistributor::new(PlanPolicy {
            basic: 1,
            premium: 2,
        });

        let d = distributor
            .distribute(
                &lead(Some("plumbing")),
                &[sub("a", Plan::Basic, 1), sub("b", Plan::Premium, 1)],
            )
            .unwrap();

        assert_eq!(d.assignments[0].status, LeadStatus::Locked);
        assert_eq!(d.assignments[1].status, LeadStatus::Unlocked);
    }

    #[test]
    fn repeated_calls_yield_identical_output() {
        let subs = vec![
            sub("a", Plan::Basic, 9),
            sub("b", Plan::Premium, 30),
            sub("c", Plan::Professional, 0),
        ];
        let l = lead(Some("plumbing"));
        let distributor = LeadDistributor::default();

        let first = distributor.distribute(&l, &subs).unwrap();
        for _ in 0..10 {
            assert_eq!(distributor.distribute(&l, &subs).unwrap(), first);
        }
    }
}
