//! End-to-end scenarios across services, coordinator and mock remotes.

use chrono::NaiveDate;
use lifesync_engine::{Clock, PullStatus};
use lifesync_protocol::{ids, Record, RecordMeta};
use lifesync_services::{
    DailyTask, DailyTaskState, DayInitAction, NewIdea, NewTask, PolicyViolation, Preset,
    ReviewType, Task, DAILY_INIT_MARKER,
};
use lifesync_testkit::{at, TestWorld};
use std::time::Duration;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn young_local_preset_survives_authoritative_remote() {
    let world = TestWorld::offline();
    let presets = &world.services.presets;

    world.set_time(at(2024, 6, 1, 7));
    let stale = presets.create("Old habit").await.unwrap();
    world.set_time(at(2024, 6, 1, 9));
    let young = presets.create("Stretch").await.unwrap();
    world.clock.advance(Duration::from_secs(10 * 60));

    // Neither is awaiting a push: only the grace window can keep them.
    presets
        .coordinator()
        .pending()
        .clear_many([stale.meta.id.clone(), young.meta.id.clone()])
        .await
        .unwrap();
    let mut elsewhere = Preset::new("Read".into(), 0, 1_000);
    elsewhere.meta = RecordMeta::with_id("preset_remote", 1_000, 1_000);
    world.remotes.presets.insert(elsewhere);
    world.cloud.set(true);

    let report = presets.sync_bidirectional(false).await.unwrap().unwrap();
    assert_eq!(report.status, PullStatus::Completed);
    assert_eq!(report.kept_local_only, 1);
    assert_eq!(report.dropped_local_only, 1);
    assert_eq!(report.added, 1);

    let local = ids(&presets.list().await.unwrap());
    assert!(local.contains(young.id()));
    assert!(local.contains("preset_remote"));
    assert!(!local.contains(stale.id()));

    world.flush().await;
    assert!(world.remotes.presets.get(young.id()).is_some());
    assert!(presets.coordinator().pending().all().await.unwrap().is_empty());
}

#[tokio::test]
async fn completed_daily_task_exports_then_locks() {
    let world = TestWorld::online();
    world.services.presets.create("Stretch").await.unwrap();
    let day = world.services.initialize_day().await.unwrap();
    let daily = day.tasks[0].clone();

    let completed = world.services.daily.complete(daily.id()).await.unwrap();
    assert!(completed.completed);
    assert_eq!(completed.completed_at, Some(world.clock.now_ms()));
    assert_eq!(completed.state(), DailyTaskState::CompletedUnsynced);

    world.flush().await;
    let synced = world.services.daily.get(daily.id()).await.unwrap();
    assert!(synced.synced_to_collection);

    let exported: Vec<Task> = world.services.tasks.list().await.unwrap();
    assert_eq!(exported.len(), 1);
    assert_eq!(exported[0].title, "Stretch");
    assert!(world.remotes.tasks.get(exported[0].id()).is_some());
    assert!(world
        .remotes
        .daily
        .get(daily.id())
        .is_some_and(|d| d.synced_to_collection));

    let err = world.services.daily.delete(daily.id()).await.unwrap_err();
    assert_eq!(
        err.policy(),
        Some(&PolicyViolation::ExportedDailyTaskDelete {
            id: daily.meta.id.clone()
        })
    );
    assert!(world.services.daily.uncomplete(daily.id()).await.is_err());
}

#[tokio::test]
async fn day_rollover_replaces_strays_and_is_idempotent() {
    let world = TestWorld::online();
    world.services.presets.create("Stretch").await.unwrap();
    world.services.presets.create("Read").await.unwrap();
    let first_day = world.services.initialize_day().await.unwrap();
    assert_eq!(first_day.date, date(2024, 6, 1));
    world.flush().await;

    world.set_time(at(2024, 6, 2, 8));
    let now = world.clock.now_ms();
    let remote_stray = DailyTask::new("preset_x".into(), "Stray".into(), date(2024, 6, 2), now);
    world.remotes.daily.insert(remote_stray.clone());
    let local_stray = DailyTask::new("preset_y".into(), "Partial".into(), date(2024, 6, 2), now);
    let stored = local_stray.clone();
    world
        .services
        .daily
        .coordinator()
        .write(move |tasks| tasks.push(stored))
        .await
        .unwrap();
    world.flush().await;

    let report = world.services.initialize_day().await.unwrap();
    assert_eq!(report.action, DayInitAction::Generated);
    assert_eq!(report.date, date(2024, 6, 2));
    let titles: Vec<_> = report.tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Stretch", "Read"]);

    world.flush().await;
    assert!(world.remotes.daily.get(remote_stray.id()).is_none());
    assert!(world.remotes.daily.get(local_stray.id()).is_none());
    for task in &report.tasks {
        assert!(world.remotes.daily.get(task.id()).is_some());
    }
    assert_eq!(world.remotes.daily.calls().update, 0);

    let marker = world
        .services
        .daily
        .coordinator()
        .markers()
        .get_marker(DAILY_INIT_MARKER)
        .await
        .unwrap();
    assert_eq!(marker, Some(date(2024, 6, 2)));

    let again = world.services.initialize_day().await.unwrap();
    assert_eq!(again.action, DayInitAction::Unchanged);
    assert_eq!(ids(&again.tasks), ids(&report.tasks));

    let yesterday = world.services.daily.list_for(date(2024, 6, 1)).await.unwrap();
    assert_eq!(ids(&yesterday), ids(&first_day.tasks));
}

#[tokio::test]
async fn offline_mode_makes_no_remote_calls() {
    let world = TestWorld::offline();
    let s = &world.services;

    let task = s.tasks.create(NewTask::titled("Write report")).await.unwrap();
    s.tasks.set_completed(task.id(), true).await.unwrap();
    let idea = s
        .ideas
        .create(NewIdea {
            title: "Garden".into(),
            ..NewIdea::default()
        })
        .await
        .unwrap();
    s.ideas.delete(idea.id()).await.unwrap();
    s.reviews.save_current(ReviewType::Daily, "ok day").await.unwrap();
    s.presets.create("Stretch").await.unwrap();
    let day = s.initialize_day().await.unwrap();
    s.daily.complete(day.tasks[0].id()).await.unwrap();
    let report = s.sync_all(true).await.unwrap();
    world.flush().await;

    assert_eq!(report.tasks.pull.status, PullStatus::Offline);
    assert_eq!(world.remotes.total_calls(), 0);
    assert_eq!(s.tasks.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn local_storage_failure_is_the_only_surfaced_error() {
    let world = TestWorld::online();
    world.remotes.set_online(false);
    let created = world
        .services
        .tasks
        .create(NewTask::titled("remote is down"))
        .await;
    assert!(created.is_ok());

    world.fail_writes(true);
    let err = world
        .services
        .tasks
        .create(NewTask::titled("disk is full"))
        .await
        .unwrap_err();
    assert!(err.is_local());
    assert!(world.services.presets.create("x").await.unwrap_err().is_local());

    world.fail_writes(false);
    world.flush().await;
    assert_eq!(world.services.tasks.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn pull_writes_trigger_no_pushes() {
    let world = TestWorld::online();
    for n in 0..3 {
        let mut task = Task::new(NewTask::titled(format!("remote {n}")), 0);
        task.meta = RecordMeta::with_id(format!("task_r{n}"), 0, 100);
        world.remotes.tasks.insert(task);
    }

    let report = world.services.tasks.sync_from_cloud().await.unwrap();
    assert_eq!(report.added, 3);
    world.flush().await;

    assert_eq!(world.remotes.tasks.calls().writes(), 0);
    assert_eq!(world.services.tasks.list().await.unwrap().len(), 3);
    assert!(world
        .services
        .tasks
        .coordinator()
        .pending()
        .all()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn tombstoned_task_never_comes_back() {
    let world = TestWorld::online();
    let task = world.services.tasks.create(NewTask::titled("gone")).await.unwrap();
    world.flush().await;

    world.remotes.tasks.set_online(false);
    world.services.tasks.delete(task.id()).await.unwrap();
    world.flush().await;
    world.remotes.tasks.set_online(true);

    let mut newer = world.remotes.tasks.get(task.id()).unwrap();
    newer.meta.updated_at += 1_000_000;
    world.remotes.tasks.insert(newer);

    let report = world.services.tasks.sync().await.unwrap();
    assert_eq!(report.pull.suppressed, 1);
    assert!(world.services.tasks.list().await.unwrap().is_empty());

    world.flush().await;
    assert!(world.remotes.tasks.get(task.id()).is_none());
    assert!(!world
        .services
        .tasks
        .coordinator()
        .tombstones()
        .contains(task.id())
        .await
        .unwrap());
}

#[tokio::test(start_paused = true)]
async fn slow_remote_never_blocks_local_writes() {
    let world = TestWorld::online();
    world.remotes.tasks.set_latency(Some(Duration::from_secs(30)));

    let task = world.services.tasks.create(NewTask::titled("a")).await.unwrap();
    assert_eq!(world.services.tasks.list().await.unwrap().len(), 1);

    world.flush().await;
    let coordinator = world.services.tasks.coordinator();
    assert!(coordinator.pending().contains(task.id()).await.unwrap());
    assert_eq!(coordinator.stats().pushes_failed, 1);
    assert_eq!(coordinator.stats().last_error.as_deref(), Some(lifesync_engine::SyncError::Timeout.to_string().as_str()));
}

#[tokio::test]
async fn state_survives_restart() {
    let world = TestWorld::file(false).await;
    let task = world.services.tasks.create(NewTask::titled("keep")).await.unwrap();
    let doomed = world.services.tasks.create(NewTask::titled("drop")).await.unwrap();
    world.services.tasks.delete(doomed.id()).await.unwrap();

    let restarted = world.restart().await;
    let tasks = restarted.services.tasks.list().await.unwrap();
    assert_eq!(ids(&tasks).into_iter().collect::<Vec<_>>(), vec![task.meta.id.clone()]);
    let coordinator = restarted.services.tasks.coordinator();
    assert!(coordinator.tombstones().contains(doomed.id()).await.unwrap());
    assert!(coordinator.pending().contains(task.id()).await.unwrap());

    restarted.cloud.set(true);
    restarted.services.tasks.sync().await.unwrap();
    restarted.flush().await;
    assert!(restarted.remotes.tasks.get(task.id()).is_some());
    assert!(restarted.remotes.tasks.get(doomed.id()).is_none());
}
