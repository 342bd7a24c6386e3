use std::sync::Arc;

use allocation::{CounterUpdate, Lead, LeadAssignment, LeadStatus, Plan, Subscriber};
use chrono::{DateTime, Utc};

use leadflow::{
    db::Db,
    error::StoreError,
    store::{LeadStore, SqlxLeadStore},
};

// -----------------------
// DB + helpers
// -----------------------

/// Isolated in-memory DB per test.
async fn setup_db() -> Db {
    Db::in_memory().await.expect("in-memory sqlite db")
}

async fn setup_store() -> (Db, SqlxLeadStore) {
    let db = setup_db().await;
    let store = SqlxLeadStore::new(db.pool.clone());
    (db, store)
}

fn ts() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T08:30:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn lead(category: &str) -> Lead {
    Lead {
        name: Some("Asha".into()),
        email: Some("asha@example.com".into()),
        city: Some("Pune".into()),
        service_category: Some(category.into()),
        source_file: "march.xlsx".into(),
        created_at: ts(),
        ..Default::default()
    }
}

// -----------------------
// Tests
// -----------------------

#[tokio::test]
async fn lead_round_trips_through_the_table() {
    let (_db, store) = setup_store().await;

    let stored = lead("plumbing");
    let id = store.create_lead(&stored).await.unwrap();

    let fetched = store.fetch_lead(id).await.unwrap().expect("lead row");
    assert_eq!(fetched, stored);

    let other = store.create_lead(&stored).await.unwrap();
    assert_ne!(id, other, "every create gets a fresh id");
}

#[tokio::test]
async fn subscribers_are_matched_by_category_in_id_order() {
    let (_db, store) = setup_store().await;

    store
        .register_subscriber(&Subscriber::new("u-2", Plan::Premium, 4), &["plumbing"])
        .await
        .unwrap();
    store
        .register_subscriber(&Subscriber::new("u-1", Plan::Basic, 0), &["plumbing", "painting"])
        .await
        .unwrap();
    store
        .register_subscriber(&Subscriber::new("u-3", Plan::Professional, 0), &["painting"])
        .await
        .unwrap();

    let found = store.find_subscribers_by_category("plumbing").await.unwrap();
    let ids: Vec<_> = found.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["u-1", "u-2"]);
    assert_eq!(found[1].active_plan, Plan::Premium);
    assert_eq!(found[1].current_lead_count, 4);

    assert!(store.find_subscribers_by_category("roofing").await.unwrap().is_empty());
}

#[tokio::test]
async fn null_plan_and_count_read_as_none_and_zero() {
    let (db, store) = setup_store().await;

    sqlx::query(
        "INSERT INTO subscribers (user_id, active_plan, current_lead_count) \
         VALUES ('legacy', NULL, NULL);",
    )
    .execute(&*db.pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO subscribers (user_id, active_plan, current_lead_count) \
         VALUES ('odd', 'Gold', 3);",
    )
    .execute(&*db.pool)
    .await
    .unwrap();

    let legacy = store.fetch_subscriber("legacy").await.unwrap().unwrap();
    assert_eq!(legacy.active_plan, Plan::None);
    assert_eq!(legacy.current_lead_count, 0);

    let odd = store.fetch_subscriber("odd").await.unwrap().unwrap();
    assert_eq!(odd.active_plan, Plan::None);

    // Legacy NULL counts still satisfy the compare-and-swap.
    store
        .update_subscriber_count(&CounterUpdate {
            subscriber_id: "legacy".into(),
            previous: 0,
            new_count: 1,
        })
        .await
        .unwrap();
    let legacy = store.fetch_subscriber("legacy").await.unwrap().unwrap();
    assert_eq!(legacy.current_lead_count, 1);
}

#[tokio::test]
async fn unmappable_subscriber_row_fails_the_lookup() {
    let (db, store) = setup_store().await;
    store
        .register_subscriber(&Subscriber::new("u-1", Plan::Basic, 0), &["plumbing"])
        .await
        .unwrap();
    store
        .register_subscriber(&Subscriber::new("u-2", Plan::Basic, 0), &["plumbing"])
        .await
        .unwrap();

    sqlx::query("UPDATE subscribers SET current_lead_count = 5000000000 WHERE user_id = 'u-2';")
        .execute(&*db.pool)
        .await
        .unwrap();

    let err = store.find_subscribers_by_category("plumbing").await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)), "got {err:?}");
}

#[tokio::test]
async fn assignments_are_unique_per_lead_and_subscriber() {
    let (_db, store) = setup_store().await;

    let lead_id = store.create_lead(&lead("plumbing")).await.unwrap();
    let link = LeadAssignment {
        lead_id,
        subscriber_id: "u-1".into(),
        status: LeadStatus::Unlocked,
        service_category: "plumbing".into(),
    };

    store.create_assignment(&link).await.unwrap();
    store
        .create_assignment(&LeadAssignment {
            subscriber_id: "u-2".into(),
            status: LeadStatus::Locked,
            ..link.clone()
        })
        .await
        .unwrap();

    let err = store.create_assignment(&link).await.unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)), "got {err:?}");

    let links = store.assignments_for_lead(lead_id).await.unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0], link);
    assert_eq!(links[1].status, LeadStatus::Locked);
}

#[tokio::test]
async fn counter_update_is_compare_and_swap() {
    let (_db, store) = setup_store().await;
    store
        .register_subscriber(&Subscriber::new("u-1", Plan::Basic, 3), &["plumbing"])
        .await
        .unwrap();

    let update = CounterUpdate {
        subscriber_id: "u-1".into(),
        previous: 3,
        new_count: 4,
    };
    store.update_subscriber_count(&update).await.unwrap();

    // Replaying the same update finds 4, not 3.
    let err = store.update_subscriber_count(&update).await.unwrap_err();
    assert!(
        matches!(
            err,
            StoreError::CounterConflict { ref subscriber_id, expected: 3 } if subscriber_id == "u-1"
        ),
        "got {err:?}"
    );

    let sub = store.fetch_subscriber("u-1").await.unwrap().unwrap();
    assert_eq!(sub.current_lead_count, 4);
}

#[tokio::test]
async fn counter_update_for_unknown_subscriber_is_not_found() {
    let (_db, store) = setup_store().await;

    let err = store
        .update_subscriber_count(&CounterUpdate {
            subscriber_id: "ghost".into(),
            previous: 0,
            new_count: 1,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn store_is_usable_behind_the_trait_object() {
    let (_db, store) = setup_store().await;
    store
        .register_subscriber(&Subscriber::new("u-1", Plan::Basic, 0), &["plumbing"])
        .await
        .unwrap();

    let store: Arc<dyn LeadStore> = Arc::new(store);
    let found = store.find_subscribers_by_category("plumbing").await.unwrap();
    assert_eq!(found.len(), 1);
}
