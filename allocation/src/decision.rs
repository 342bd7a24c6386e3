//! Determines whether a subscriber receives a lead unlocked or locked,
//! given its plan and how many leads it has already unlocked.
//
//  This module is deliberately pure: no async, no IO.

use crate::model::{LeadStatus, Plan};
use crate::policy::Quota;

/// Decide the visibility of one lead for one subscriber.
///
///   - `professional` is always unlocked and is never counted
///   - otherwise unlocked iff `current_count < quota`
///
/// A count equal to the quota locks the lead.
pub fn decide(plan: Plan, current_count: u32, quota: Quota) -> LeadStatus {
    if plan == Plan::Professional {
        return LeadStatus::Unlocked;
    }

    if quota.admits(current_count) {
        LeadStatus::Unlocked
    } else {
        LeadStatus::Locked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::quota_for;

    #[test]
    fn professional_ignores_count() {
        let q = quota_for(Plan::Professional);
        assert_eq!(decide(Plan::Professional, 0, q), LeadStatus::Unlocked);
        assert_eq!(decide(Plan::Professional, 10_000, q), LeadStatus::Unlocked);
    }

    #[test]
    fn professional_bypasses_even_a_zero_quota() {
        assert_eq!(
            decide(Plan::Professional, 5, Quota::Limited(0)),
            LeadStatus::Unlocked
        );
    }

    #[test]
    fn basic_below_quota_unlocks() {
        let q = quota_for(Plan::Basic);
        assert_eq!(decide(Plan::Basic, 0, q), LeadStatus::Unlocked);
        assert_eq!(decide(Plan::Basic, 9, q), LeadStatus::Unlocked);
    }

    #[test]
    fn count_equal_to_quota_locks() {
        assert_eq!(
            decide(Plan::Basic, 10, quota_for(Plan::Basic)),
            LeadStatus::Locked
        );
        assert_eq!(
            decide(Plan::Premium, 25, quota_for(Plan::Premium)),
            LeadStatus::Locked
        );
    }

    #[test]
    fn none_is_always_locked() {
        let q = quota_for(Plan::None);
        assert_eq!(decide(Plan::None, 0, q), LeadStatus::Locked);
        assert_eq!(decide(Plan::None, 3, q), LeadStatus::Locked);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::policy::{quota_for, quota_for_name};
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]
        #[test]
        fn professional_always_unlocked(count in any::<u32>()) {
            prop_assert_eq!(
                decide(Plan::Professional, count, quota_for(Plan::Professional)),
                LeadStatus::Unlocked
            );
        }

        #[test]
        fn bounded_plans_respect_quota(
            plan in prop_oneof![Just(Plan::Basic), Just(Plan::Premium)],
            count in 0u32..100,
        ) {
            let q = quota_for(plan);
            let limit = match q {
                Quota::Limited(l) => l,
                Quota::Unbounded => unreachable!("bounded plan"),
            };

            let expected = if count < limit { LeadStatus::Unlocked } else { LeadStatus::Locked };
            prop_assert_eq!(decide(plan, count, q), expected);
        }

        #[test]
        fn unrecognized_plans_always_locked(
            name in "[a-z]{1,12}".prop_filter("recognized plan", |n| {
                !matches!(n.as_str(), "basic" | "premium" | "professional")
            }),
            count in any::<u32>(),
        ) {
            let plan = Plan::from_name(Some(&name));
            prop_assert_eq!(decide(plan, count, quota_for_name(&name)), LeadStatus::Locked);
        }

        #[test]
        fn mis_cased_plan_names_are_locked(
            name in prop::sample::select(vec!["Basic", "PREMIUM", "Professional", " basic"]),
            count in 0u32..10,
        ) {
            let plan = Plan::from_name(Some(name));
            prop_assert_eq!(plan, Plan::None);
            prop_assert_eq!(decide(plan, count, quota_for_name(name)), LeadStatus::Locked);
        }
    }
}
