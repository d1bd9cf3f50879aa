mod common;

use std::sync::Arc;

use serde_json::json;
use tallysync::entity::task::TaskStatus;
use tallysync::local::{LocalCollection, NewHabit, NewSubtask, NewTask};
use tallysync::remote::MemoryRemote;
use tallysync::sync::{Direction, EntityKind, SyncEngine, SyncPass};

use common::{at, day, store, task_model, USER_ID};

const ROOT: &str = "users/uid-1";

#[tokio::test]
async fn test_push_creates_missing_task() {
    let store = store().await;
    let remote = Arc::new(MemoryRemote::new());
    store
        .tasks()
        .create_with_id(task_model(5, "Buy milk", at(1, 9)))
        .await
        .unwrap();

    let engine = SyncEngine::new(store.clone(), remote.clone());
    let stats = engine.run(&SyncPass::push(), USER_ID, "token").await.unwrap();

    assert_eq!(stats.get("tasks_created"), 1);
    let node = remote.raw(&format!("{ROOT}/tasks/5")).await;
    assert_eq!(node["id"], json!(5));
    assert_eq!(node["title"], json!("Buy milk"));
    assert_eq!(node["status"], json!("pending"));
    assert_eq!(node["updated_at"], json!("2024-01-01T09:00:00"));
    assert_eq!(node["created_at"], json!("2024-01-01T09:00:00"));
}

#[tokio::test]
async fn test_second_push_writes_nothing() {
    let store = store().await;
    let remote = Arc::new(MemoryRemote::new());
    let task = store
        .create_task(NewTask {
            title: "Water plants".into(),
            description: Some("balcony".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    store
        .create_subtask(task.id, NewSubtask {
            title: "Fill can".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let habit = store
        .create_habit(NewHabit {
            title: "Read".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    store.add_completion(habit.id, day(3)).await.unwrap();
    store.set_user_name("Ana").await.unwrap();

    let engine = SyncEngine::new(store.clone(), remote.clone());
    engine.run(&SyncPass::push(), USER_ID, "token").await.unwrap();
    let writes = remote.write_count();
    assert!(writes > 0);

    let stats = engine.run(&SyncPass::push(), USER_ID, "token").await.unwrap();
    assert_eq!(stats.total(), 0);
    assert_eq!(remote.write_count(), writes);
}

#[tokio::test]
async fn test_push_removes_remote_records_deleted_locally() {
    let store = store().await;
    let remote = Arc::new(MemoryRemote::new());
    for id in [1, 3] {
        store
            .tasks()
            .create_with_id(task_model(id, &format!("task {id}"), at(1, 9)))
            .await
            .unwrap();
    }
    for id in [1, 2, 3] {
        remote
            .seed(
                &format!("{ROOT}/tasks/{id}"),
                json!({
                    "id": id,
                    "title": format!("task {id}"),
                    "status": "pending",
                    "created_at": "2024-01-01T09:00:00",
                    "updated_at": "2024-01-01T09:00:00",
                }),
            )
            .await;
    }

    let engine = SyncEngine::new(store.clone(), remote.clone());
    let pass = SyncPass::only(Direction::Push, [EntityKind::Tasks]);
    let stats = engine.run(&pass, USER_ID, "token").await.unwrap();

    assert_eq!(stats.get("tasks_deleted"), 1);
    assert_eq!(stats.get("tasks_updated"), 0);
    assert!(remote.raw(&format!("{ROOT}/tasks/2")).await.is_null());
    assert_eq!(remote.raw(&format!("{ROOT}/tasks/1/title")).await, json!("task 1"));
    assert_eq!(remote.raw(&format!("{ROOT}/tasks/3/title")).await, json!("task 3"));
}

#[tokio::test]
async fn test_push_sends_only_changed_fields() {
    let store = store().await;
    let remote = Arc::new(MemoryRemote::new());
    store
        .tasks()
        .create_with_id(task_model(1, "Buy milk", at(1, 9)))
        .await
        .unwrap();
    remote
        .seed(
            &format!("{ROOT}/tasks/1"),
            json!({
                "id": 1,
                "title": "Buy milk",
                "status": "pending",
                "updated_at": "2024-01-01T09:00:00",
                "remote_only": "kept",
            }),
        )
        .await;

    let task = store.set_task_status(1, TaskStatus::Completed).await.unwrap();

    let engine = SyncEngine::new(store.clone(), remote.clone());
    let pass = SyncPass::only(Direction::Push, [EntityKind::Tasks]);
    let stats = engine.run(&pass, USER_ID, "token").await.unwrap();

    assert_eq!(stats.get("tasks_updated"), 1);
    let node = remote.raw(&format!("{ROOT}/tasks/1")).await;
    assert_eq!(node["status"], json!("completed"));
    assert_eq!(node["remote_only"], json!("kept"));
    assert_ne!(node["updated_at"], json!("2024-01-01T09:00:00"));
    assert!(task.updated_at.unwrap() > at(1, 9));
}

#[tokio::test]
async fn test_push_nests_subtasks_and_completions() {
    let store = store().await;
    let remote = Arc::new(MemoryRemote::new());
    let task = store
        .create_task(NewTask {
            title: "Move".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let sub = store
        .create_subtask(task.id, NewSubtask {
            title: "Pack books".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let habit = store
        .create_habit(NewHabit {
            title: "Run".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    store.add_completion(habit.id, day(1)).await.unwrap();
    store.add_completion(habit.id, day(2)).await.unwrap();
    remote
        .seed(
            &format!("{ROOT}/habits/{}/completions/2023-12-31", habit.id),
            json!(true),
        )
        .await;

    let engine = SyncEngine::new(store.clone(), remote.clone());
    let stats = engine.run(&SyncPass::push(), USER_ID, "token").await.unwrap();

    assert_eq!(stats.get("subtasks_created"), 1);
    assert_eq!(
        remote
            .raw(&format!("{ROOT}/tasks/{}/subtasks/{}/title", task.id, sub.id))
            .await,
        json!("Pack books")
    );

    assert_eq!(stats.get("completions_added"), 2);
    assert_eq!(stats.get("completions_removed"), 1);
    assert_eq!(
        remote
            .raw(&format!("{ROOT}/habits/{}/completions", habit.id))
            .await,
        json!({"2024-01-01": true, "2024-01-02": true})
    );
}

#[tokio::test]
async fn test_push_points_within_tolerance_is_skipped() {
    let store = store().await;
    let remote = Arc::new(MemoryRemote::new());
    store.add_points(1.5).await.unwrap();
    remote.seed(&format!("{ROOT}/points"), json!(1.5004)).await;

    let engine = SyncEngine::new(store.clone(), remote.clone());
    let pass = SyncPass::only(Direction::Push, [EntityKind::Points]);
    let stats = engine.run(&pass, USER_ID, "token").await.unwrap();
    assert_eq!(stats.get("points_updated"), 0);

    store.add_points(0.25).await.unwrap();
    let stats = engine.run(&pass, USER_ID, "token").await.unwrap();
    assert_eq!(stats.get("points_updated"), 1);
    assert_eq!(remote.raw(&format!("{ROOT}/points")).await, json!(1.75));
}

#[tokio::test]
async fn test_push_user_name() {
    let store = store().await;
    let remote = Arc::new(MemoryRemote::new());
    let engine = SyncEngine::new(store.clone(), remote.clone());
    let pass = SyncPass::only(Direction::Push, [EntityKind::Settings]);

    // Unset locally: nothing to send.
    let stats = engine.run(&pass, USER_ID, "token").await.unwrap();
    assert_eq!(stats.total(), 0);

    store.set_user_name("Ana").await.unwrap();
    let stats = engine.run(&pass, USER_ID, "token").await.unwrap();
    assert_eq!(stats.get("settings_updated"), 1);
    assert_eq!(
        remote.raw(&format!("{ROOT}/settings/user_name")).await,
        json!("Ana")
    );
}
