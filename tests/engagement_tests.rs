//! Integration tests for engagement counting: emit, ingest, aggregate.

mod common;

use rstest::rstest;

use common::{TestApp, username};
use taskpulse::application::AggregationError;
use taskpulse::domain::{EngagementKind, TaskStatistics};

#[rstest]
#[tokio::test]
async fn fresh_task_counts_zero_after_ingestion() {
    let app = TestApp::new().await;
    let task_id = app.create_task(&username("alice"), "new").await;
    let aggregation = app.dependencies.aggregation();

    assert_eq!(
        aggregation.count_for_task(task_id, EngagementKind::Like).await,
        Err(AggregationError::NotYetCreated(task_id))
    );

    app.ingest().await;

    assert_eq!(
        aggregation.task_statistics(task_id).await,
        Ok(TaskStatistics { likes: 0, views: 0 })
    );
}

#[rstest]
#[tokio::test]
async fn counts_distinct_actors() {
    let app = TestApp::new().await;
    let task_id = app.create_task(&username("alice"), "popular").await;
    let workflows = app.dependencies.workflows();

    workflows.like_task(&username("bob"), task_id).await.unwrap();
    workflows.like_task(&username("bob"), task_id).await.unwrap();
    workflows.like_task(&username("carol"), task_id).await.unwrap();
    workflows.view_task(&username("bob"), task_id).await.unwrap();
    app.ingest().await;

    let statistics = app
        .dependencies
        .aggregation()
        .task_statistics(task_id)
        .await
        .unwrap();

    assert_eq!(statistics, TaskStatistics { likes: 2, views: 1 });
}

#[rstest]
#[tokio::test]
async fn owner_liking_own_task_counts() {
    let app = TestApp::new().await;
    let alice = username("alice");
    let task_id = app.create_task(&alice, "mine").await;

    app.dependencies.workflows().like_task(&alice, task_id).await.unwrap();
    app.ingest().await;

    let likes = app
        .dependencies
        .aggregation()
        .count_for_task(task_id, EngagementKind::Like)
        .await
        .unwrap();
    assert_eq!(likes, 1);
}

#[rstest]
#[tokio::test]
async fn top_users_without_likes_report_zero() {
    let app = TestApp::new().await;
    let alice = username("alice");
    for title in ["a", "b", "c"] {
        app.create_task(&alice, title).await;
    }
    app.ingest().await;

    let top = app.dependencies.aggregation().top_users(3).await.unwrap();

    assert_eq!(top.len(), 1);
    assert_eq!(top[0].author, alice);
    assert_eq!(top[0].likes, 0);
}

#[rstest]
#[tokio::test]
async fn top_tasks_ranks_by_distinct_likers() {
    let app = TestApp::new().await;
    let quiet = app.create_task(&username("alice"), "quiet").await;
    let loud = app.create_task(&username("bob"), "loud").await;
    let workflows = app.dependencies.workflows();
    for actor in ["carol", "dave"] {
        workflows.like_task(&username(actor), loud).await.unwrap();
    }
    workflows.view_task(&username("carol"), quiet).await.unwrap();
    app.ingest().await;

    let top = app
        .dependencies
        .aggregation()
        .top_tasks(EngagementKind::Like, 5)
        .await
        .unwrap();

    assert_eq!(top[0].task_id, loud);
    assert_eq!(top[0].statistics, TaskStatistics { likes: 2, views: 0 });
    assert_eq!(top[1].task_id, quiet);
    assert_eq!(top[1].statistics, TaskStatistics { likes: 0, views: 1 });
}

#[rstest]
#[tokio::test]
async fn ingestion_is_incremental() {
    let app = TestApp::new().await;
    let task_id = app.create_task(&username("alice"), "t").await;

    assert_eq!(app.ingest().await, 2);
    assert_eq!(app.ingest().await, 0);

    app.dependencies
        .workflows()
        .view_task(&username("bob"), task_id)
        .await
        .unwrap();

    assert_eq!(app.ingest().await, 1);
}
