//! Integration tests for the task ledger.

mod common;

use rstest::rstest;

use common::{TestApp, username};
use taskpulse::application::LedgerError;
use taskpulse::domain::{TaskContent, TaskId};

#[rstest]
#[tokio::test]
async fn created_task_reads_back() {
    let app = TestApp::new().await;
    let alice = username("alice");
    let content = TaskContent::new("write report", "quarterly", "open");

    let task_id = app.dependencies.ledger().create(&alice, content.clone()).await.unwrap();
    let task = app.dependencies.ledger().get_by_id(task_id).await.unwrap();

    assert_eq!(task.owner, alice);
    assert_eq!(task.content, content);
}

#[rstest]
#[tokio::test]
async fn ids_increase_strictly() {
    let app = TestApp::new().await;
    let alice = username("alice");

    let first = app.create_task(&alice, "a").await;
    let second = app.create_task(&alice, "b").await;

    assert!(second > first);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_never_collide() {
    const CALLERS: i64 = 32;
    let app = TestApp::new().await;
    let ledger = app.dependencies.ledger().clone();

    let handles: Vec<_> = (0..CALLERS)
        .map(|index| {
            let ledger = ledger.clone();
            let owner = username(&format!("user{index}"));
            tokio::spawn(async move {
                ledger
                    .create(&owner, TaskContent::new(format!("task {index}"), "", "open"))
                    .await
            })
        })
        .collect();
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }
    ids.sort();

    assert_eq!(ids, (1..=CALLERS).map(TaskId::new).collect::<Vec<_>>());
    let page = ledger.list_page(0, 100).await.unwrap();
    assert_eq!(page.actual_count, 32);
}

#[rstest]
#[tokio::test]
async fn non_owner_sees_same_error_as_missing_task() {
    let app = TestApp::new().await;
    let task_id = app.create_task(&username("alice"), "private").await;
    let mallory = username("mallory");
    let ledger = app.dependencies.ledger();

    let foreign = ledger
        .update(task_id, &mallory, TaskContent::default())
        .await
        .unwrap_err();
    let missing = ledger
        .update(TaskId::new(999), &mallory, TaskContent::default())
        .await
        .unwrap_err();

    assert!(matches!(foreign, LedgerError::NotFound(_)));
    assert!(matches!(missing, LedgerError::NotFound(_)));
    assert_eq!(
        ledger.get_by_id(task_id).await.unwrap().content.title,
        "private"
    );
}

#[rstest]
#[tokio::test]
async fn non_owner_cannot_delete() {
    let app = TestApp::new().await;
    let task_id = app.create_task(&username("alice"), "keep me").await;

    let result = app
        .dependencies
        .ledger()
        .delete(task_id, &username("mallory"))
        .await;

    assert_eq!(result, Err(LedgerError::NotFound(task_id)));
    assert!(app.dependencies.ledger().get_by_id(task_id).await.is_ok());
}

#[rstest]
#[tokio::test]
async fn concurrent_deletes_succeed_exactly_once() {
    let app = TestApp::new().await;
    let alice = username("alice");
    let task_id = app.create_task(&alice, "race").await;
    let ledger = app.dependencies.ledger().clone();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let ledger = ledger.clone();
            let alice = alice.clone();
            tokio::spawn(async move { ledger.delete(task_id, &alice).await })
        })
        .collect();
    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => successes += 1,
            Err(error) => assert_eq!(error, LedgerError::NotFound(task_id)),
        }
    }

    assert_eq!(successes, 1);
}

#[rstest]
#[tokio::test]
async fn page_returns_tasks_in_id_order() {
    let app = TestApp::new().await;
    let alice = username("alice");
    let mut created = Vec::new();
    for title in ["one", "two", "three"] {
        created.push(app.create_task(&alice, title).await);
    }

    let page = app.dependencies.ledger().list_page(0, 10).await.unwrap();

    assert_eq!(page.actual_count, 3);
    assert_eq!(
        page.tasks.iter().map(|task| task.id).collect::<Vec<_>>(),
        created
    );
}

#[rstest]
#[case(0, 2, 2)]
#[case(2, 2, 1)]
#[case(3, 2, 0)]
#[tokio::test]
async fn page_count_reflects_rows_returned(
    #[case] offset: u64,
    #[case] page_size: u32,
    #[case] expected: usize,
) {
    let app = TestApp::new().await;
    let alice = username("alice");
    for title in ["one", "two", "three"] {
        app.create_task(&alice, title).await;
    }

    let page = app
        .dependencies
        .ledger()
        .list_page(offset, page_size)
        .await
        .unwrap();

    assert_eq!(page.actual_count, expected);
    assert_eq!(page.tasks.len(), expected);
}
