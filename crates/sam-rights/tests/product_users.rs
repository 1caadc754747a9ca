mod common;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Datelike, Utc};
use common::{FakeUsersStore, TOPIC, claims, decode_job, producer, published};
use sam_core::{DomainEvent, EventKind, ProductType};
use sam_jobqueue::InMemoryJobQueue;
use sam_platform::{
    NominativeUserInput, UpsertConcurrentUserRequest, UpsertNominativeUsersRequest,
};
use sam_rights::{ProductUsersService, ServiceError};

fn service(store: &Arc<FakeUsersStore>, queue: &Arc<InMemoryJobQueue>) -> ProductUsersService {
    ProductUsersService::new(store.clone(), producer(queue.clone()))
}

fn concurrent_request() -> UpsertConcurrentUserRequest {
    UpsertConcurrentUserRequest {
        scope: "s1".to_string(),
        product_name: "Visual Studio".to_string(),
        product_editor: "microsoft".to_string(),
        product_version: "2022".to_string(),
        number_of_users: 40,
        profile_user: "developer".to_string(),
        team: "platform".to_string(),
        ..Default::default()
    }
}

fn user(email: &str, profile: &str, activation_date: &str) -> NominativeUserInput {
    NominativeUserInput {
        user_name: "doe".to_string(),
        first_name: "jane".to_string(),
        email: email.to_string(),
        profile: profile.to_string(),
        activation_date: activation_date.to_string(),
    }
}

fn nominative_request(users: Vec<NominativeUserInput>) -> UpsertNominativeUsersRequest {
    UpsertNominativeUsersRequest {
        scope: "s1".to_string(),
        product_name: "Jira".to_string(),
        product_editor: "atlassian".to_string(),
        user_details: users,
        ..Default::default()
    }
}

#[tokio::test]
async fn concurrent_user_creates_a_saas_product_and_publishes() {
    let store = Arc::new(FakeUsersStore::default());
    let queue = Arc::new(InMemoryJobQueue::new());

    service(&store, &queue)
        .upsert_concurrent_user(&claims(&["s1"]), concurrent_request())
        .await
        .unwrap();

    let products = store.products().await;
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].swidtag, "Visual_Studio_microsoft_2022");
    assert_eq!(products[0].product_type, ProductType::Saas);

    let events = published(&queue).await;
    let [DomainEvent::UpsertConcurrentUserRecord(event)] = events.as_slice() else {
        panic!("expected a single concurrent user upsert, got {events:?}");
    };
    assert_eq!(event.swidtag, "Visual_Studio_microsoft_2022");
    assert_eq!(event.number_of_users, 40);
    assert_eq!(event.purchase_date.day(), 1);
    assert_eq!(event.purchase_date.month(), Utc::now().date_naive().month());
}

#[tokio::test]
async fn unknown_aggregation_is_rejected_before_any_write() {
    let store = Arc::new(FakeUsersStore::default());
    let queue = Arc::new(InMemoryJobQueue::new());

    let err = service(&store, &queue)
        .upsert_concurrent_user(
            &claims(&["s1"]),
            UpsertConcurrentUserRequest {
                is_aggregation: true,
                aggregation_id: 9,
                ..concurrent_request()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Validation(_)));
    assert!(store.concurrent_users().await.is_empty());
    assert!(queue.is_empty().await);
}

#[tokio::test]
async fn aggregation_records_carry_no_swidtag() {
    let store = Arc::new(FakeUsersStore::default());
    store.add_aggregation(3, "s1", "oracle-bundle").await;
    let queue = Arc::new(InMemoryJobQueue::new());

    service(&store, &queue)
        .upsert_concurrent_user(
            &claims(&["s1"]),
            UpsertConcurrentUserRequest {
                is_aggregation: true,
                aggregation_id: 3,
                ..concurrent_request()
            },
        )
        .await
        .unwrap();

    assert!(store.products().await.is_empty());
    let DomainEvent::UpsertConcurrentUserRecord(event) = &published(&queue).await[0] else {
        panic!("expected a concurrent user upsert");
    };
    assert_eq!(event.aggregation_id, 3);
    assert_eq!(event.swidtag, "");
}

#[tokio::test]
async fn deleting_the_last_user_removes_the_product_after_the_user_event() {
    let store = Arc::new(FakeUsersStore::default());
    let queue = Arc::new(InMemoryJobQueue::new());
    let service = service(&store, &queue);
    let claims = claims(&["s1"]);

    service
        .upsert_concurrent_user(&claims, concurrent_request())
        .await
        .unwrap();
    let id = store.concurrent_users().await[0].id;

    service
        .delete_concurrent_user(&claims, "s1", id)
        .await
        .unwrap();

    assert!(store.products().await.is_empty());
    let kinds: Vec<EventKind> = published(&queue)
        .await
        .iter()
        .map(DomainEvent::kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::UpsertConcurrentUserRecord,
            EventKind::DeleteConcurrentUserRecord,
            EventKind::DeleteProductRecord,
        ]
    );
}

#[tokio::test]
async fn product_with_remaining_users_is_kept() {
    let store = Arc::new(FakeUsersStore::default());
    let queue = Arc::new(InMemoryJobQueue::new());
    let service = service(&store, &queue);
    let claims = claims(&["s1"]);

    for team in ["platform", "data"] {
        service
            .upsert_concurrent_user(
                &claims,
                UpsertConcurrentUserRequest {
                    team: team.to_string(),
                    ..concurrent_request()
                },
            )
            .await
            .unwrap();
    }
    let id = store.concurrent_users().await[0].id;
    service
        .delete_concurrent_user(&claims, "s1", id)
        .await
        .unwrap();

    assert_eq!(store.products().await.len(), 1);
    assert!(
        published(&queue)
            .await
            .iter()
            .all(|event| event.kind() != EventKind::DeleteProductRecord)
    );
}

#[tokio::test]
async fn nominative_batch_shares_one_correlation_id() {
    let store = Arc::new(FakeUsersStore::default());
    let queue = Arc::new(InMemoryJobQueue::new());

    let response = service(&store, &queue)
        .upsert_nominative_users(
            &claims(&["s1"]),
            nominative_request(vec![
                user("a@corp.io", "admin", "2024-03-05"),
                user("b@corp.io", "admin", "24/5/3"),
                user("c@corp.io", "viewer", "not a date"),
                user("a@corp.io", "admin", ""),
                user("broken", "admin", ""),
            ]),
        )
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.accepted_users, 3);
    assert_eq!(response.rejected_users, 2);
    assert_eq!(store.nominative_users().await.len(), 3);

    let jobs = queue.jobs(TOPIC).await;
    assert_eq!(jobs.len(), 3);
    let correlation_ids: HashSet<_> = jobs
        .iter()
        .map(|queued| queued.job.correlation_id.clone())
        .collect();
    assert_eq!(correlation_ids.len(), 1);
    assert!(correlation_ids.iter().all(Option::is_some));

    let DomainEvent::UpsertNominativeUserRecord(third) = decode_job(&jobs[2]) else {
        panic!("expected a nominative user upsert");
    };
    assert_eq!(third.swidtag, "Jira_atlassian");
    assert_eq!(third.user.email, "c@corp.io");
    assert_eq!(third.user.activation_date, None);
}

#[tokio::test]
async fn separate_calls_are_not_correlated() {
    let store = Arc::new(FakeUsersStore::default());
    let queue = Arc::new(InMemoryJobQueue::new());
    let service = service(&store, &queue);
    let claims = claims(&["s1"]);

    for team in ["a", "b", "c"] {
        service
            .upsert_concurrent_user(
                &claims,
                UpsertConcurrentUserRequest {
                    team: team.to_string(),
                    ..concurrent_request()
                },
            )
            .await
            .unwrap();
    }

    let jobs = queue.jobs(TOPIC).await;
    assert_eq!(jobs.len(), 3);
    assert!(jobs.iter().all(|queued| queued.job.correlation_id.is_none()));
}

#[tokio::test]
async fn deleting_a_nominative_user_mirrors_the_concurrent_cleanup() {
    let store = Arc::new(FakeUsersStore::default());
    let queue = Arc::new(InMemoryJobQueue::new());
    let service = service(&store, &queue);
    let claims = claims(&["s1"]);

    service
        .upsert_nominative_users(
            &claims,
            nominative_request(vec![user("a@corp.io", "admin", "")]),
        )
        .await
        .unwrap();
    let id = store.nominative_users().await[0].id;

    service
        .delete_nominative_user(&claims, "s1", id)
        .await
        .unwrap();

    let events = published(&queue).await;
    assert_eq!(events.len(), 3);
    let DomainEvent::DeleteNominativeUserRecord(deleted) = &events[1] else {
        panic!("expected a nominative user delete");
    };
    assert_eq!(deleted.email, "a@corp.io");
    assert_eq!(deleted.swidtag, "Jira_atlassian");
    assert_eq!(events[2].kind(), EventKind::DeleteProductRecord);
}

#[tokio::test]
async fn scope_outside_the_claims_is_denied() {
    let store = Arc::new(FakeUsersStore::default());
    let queue = Arc::new(InMemoryJobQueue::new());
    let service = service(&store, &queue);

    let err = service
        .delete_nominative_user(&claims(&["s2"]), "s1", 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::PermissionDenied(_)));

    let err = service
        .delete_concurrent_user(&claims(&["s1"]), "s1", 42)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = service
        .upsert_nominative_users(
            &claims(&["s1"]),
            UpsertNominativeUsersRequest {
                product_name: String::new(),
                ..nominative_request(Vec::new())
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert!(queue.is_empty().await);
}
