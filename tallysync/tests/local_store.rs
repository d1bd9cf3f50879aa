mod common;

use tallysync::entity::reward::RewardStatus;
use tallysync::error::{StoreError, ValidationError};
use tallysync::local::{
    NewGoal, NewHabit, NewReward, NewSubtask, NewTask, SkillLevel, DEFAULT_USER_NAME, GOAL_POINTS,
};

use common::{day, store};

fn validation(err: StoreError) -> ValidationError {
    match err {
        StoreError::Validation(e) => e,
        other => panic!("expected a validation error, got {other}"),
    }
}

#[tokio::test]
async fn test_task_crud_and_cascade() {
    let store = store().await;

    let err = store
        .create_task(NewTask {
            title: "   ".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(validation(err), ValidationError::EmptyField("title"));

    let task = store
        .create_task(NewTask {
            title: "  Buy milk ".into(),
            description: Some("".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(task.title, "Buy milk");
    assert_eq!(task.description, None);
    assert_eq!(task.created_at, task.updated_at);

    let sub = store
        .create_subtask(task.id, NewSubtask {
            title: "Oat milk".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let toggled = store.toggle_subtask(sub.id).await.unwrap();
    assert!(toggled.completed);

    assert!(store.delete_task(task.id).await.unwrap());
    assert!(store.get_task(task.id).await.unwrap().is_none());
    assert!(!store.delete_subtask(sub.id).await.unwrap());
}

#[tokio::test]
async fn test_subtask_needs_existing_task() {
    let store = store().await;
    let err = store
        .create_subtask(42, NewSubtask {
            title: "orphan".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(
        validation(err),
        ValidationError::NotFound { kind: "task", id: 42 }
    );
}

#[tokio::test]
async fn test_completion_is_a_set_with_point_side_effects() {
    let store = store().await;
    let habit = store
        .create_habit(NewHabit {
            title: "Walk".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(store.add_completion(habit.id, day(1)).await.unwrap());
    assert!(!store.add_completion(habit.id, day(1)).await.unwrap());
    assert!(store.add_completion(habit.id, day(2)).await.unwrap());
    assert_eq!(store.total_points().await.unwrap(), 0.02);

    // Toggling removes exactly that day.
    assert!(!store.toggle_completion(habit.id, day(1)).await.unwrap());
    assert_eq!(store.completion_dates(habit.id).await.unwrap(), vec![day(2)]);
    assert_eq!(store.total_points().await.unwrap(), 0.01);

    assert!(store.toggle_completion(habit.id, day(1)).await.unwrap());
    assert!(store.is_completed_on(habit.id, day(1)).await.unwrap());
}

#[tokio::test]
async fn test_habit_target_days_range() {
    let store = store().await;
    let err = store
        .create_habit(NewHabit {
            title: "Gym".into(),
            target_days: 8,
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(
        validation(err),
        ValidationError::OutOfRange { field: "target_days", .. }
    ));
}

#[tokio::test]
async fn test_points_never_go_negative() {
    let store = store().await;
    store.add_points(0.3).await.unwrap();
    assert_eq!(store.add_points(-1.0).await.unwrap(), 0.0);
    assert_eq!(store.total_points().await.unwrap(), 0.0);
}

#[tokio::test]
async fn test_reaching_a_goal_awards_points_once() {
    let store = store().await;
    let goal = store
        .create_goal(NewGoal {
            title: "Read 10 books".into(),
            target_value: Some(10.0),
            ..Default::default()
        })
        .await
        .unwrap();

    store.set_goal_progress(goal.id, 4.0).await.unwrap();
    assert_eq!(store.total_points().await.unwrap(), 0.0);
    store.set_goal_progress(goal.id, 10.0).await.unwrap();
    assert_eq!(store.total_points().await.unwrap(), GOAL_POINTS);
    store.set_goal_progress(goal.id, 12.0).await.unwrap();
    assert_eq!(store.total_points().await.unwrap(), GOAL_POINTS);

    let err = store
        .create_goal(NewGoal {
            title: "Nothing".into(),
            target_value: Some(0.0),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(validation(err), ValidationError::NonPositive { .. }));
}

#[tokio::test]
async fn test_reward_lifecycle() {
    let store = store().await;
    let err = store
        .create_reward(NewReward {
            name: "Free".into(),
            target_points: 0.0,
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(
        validation(err),
        ValidationError::NonPositive { field: "target_points", .. }
    ));

    let reward = store
        .create_reward(NewReward {
            name: "Cinema".into(),
            target_points: 1.0,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(reward.status, RewardStatus::ToReach);
    assert!(store.claim_reward(reward.id).await.is_err());

    store.add_points(1.5).await.unwrap();
    assert_eq!(
        store.get_reward(reward.id).await.unwrap().unwrap().status,
        RewardStatus::Claimable
    );

    // The new target has to be out of reach.
    assert!(store.reuse_reward(reward.id, 1.2).await.is_err());
    let reused = store.reuse_reward(reward.id, 3.0).await.unwrap();
    assert_eq!(reused.status, RewardStatus::ToReach);
    assert_eq!(reused.target_points, 3.0);

    store.add_points(2.0).await.unwrap();
    let claimed = store.claim_reward(reward.id).await.unwrap();
    assert_eq!(claimed.status, RewardStatus::Claimed);
    assert!(claimed.claimed_at.is_some());

    // Claimed rewards stay claimed whatever the balance does.
    store.add_points(-10.0).await.unwrap();
    assert_eq!(store.update_reward_statuses().await.unwrap(), 0);
    assert_eq!(
        store.get_reward(reward.id).await.unwrap().unwrap().status,
        RewardStatus::Claimed
    );
}

#[tokio::test]
async fn test_user_name_defaults() {
    let store = store().await;
    assert_eq!(store.user_name().await.unwrap(), DEFAULT_USER_NAME);
    store.set_user_name(" Ana ").await.unwrap();
    assert_eq!(store.user_name().await.unwrap(), "Ana");
    assert!(store.set_user_name("").await.is_err());
}

#[tokio::test]
async fn test_level_follows_points() {
    let store = store().await;
    let (level, sublevel) = store.level().await.unwrap();
    assert_eq!(level, SkillLevel::Nobody);
    assert_eq!(sublevel, 0.0);

    store.add_points(55.0).await.unwrap();
    let info = store.level_info().await.unwrap();
    assert_eq!(info.level, SkillLevel::Beginner);
    assert_eq!(info.label, "Beginner 1.50");
    assert_eq!(info.next_level, Some(SkillLevel::Novice));
    assert_eq!(info.points_to_next, 45.0);
}
