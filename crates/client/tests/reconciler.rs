//! Integration tests for the poll loop.
//!
//! Each test runs a [`Reconciler`] against a [`ScriptedBackend`] and
//! observes it only through the views it publishes.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;

use common::{job, user, wait_for_view, ScriptedBackend};
use thesis_client::reconciler::{Command, Reconciler, ReconcilerConfig, ReconcilerHandle};
use thesis_client::view::Table;
use thesis_core::job::JobStatus;
use thesis_core::state::Applied;
use thesis_core::stats::{Stats, PLACEHOLDER};
use thesis_core::sync::{FetchPhase, Resource};
use thesis_core::user::UserStatus;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

fn stats(templates: u64, renders: u64) -> Stats {
    Stats {
        total_templates: templates,
        total_renders: renders,
    }
}

fn fleet() -> Arc<ScriptedBackend> {
    ScriptedBackend::new(
        vec![
            job("a1", "bob", JobStatus::Rendering),
            job("b2", "alice", JobStatus::Done),
            job("c3", "bob", JobStatus::Error),
        ],
        vec![user("bob", UserStatus::Active), user("alice", UserStatus::Blocked)],
        stats(3, 7),
    )
}

/// A long poll interval so that only the start-up tick and explicit
/// refreshes drive fetches.
fn quiet_config() -> ReconcilerConfig {
    ReconcilerConfig {
        poll_interval: Duration::from_secs(3600),
        ..ReconcilerConfig::default()
    }
}

/// Poll `condition` every few milliseconds, failing the test after two
/// seconds.
async fn wait_until(mut condition: impl FnMut() -> bool) {
    let wait = async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(2), wait)
        .await
        .expect("timed out waiting for condition");
}

fn start(
    backend: Arc<ScriptedBackend>,
    config: ReconcilerConfig,
) -> (ReconcilerHandle, CancellationToken, JoinHandle<()>) {
    let (reconciler, handle) = Reconciler::new(backend, config);
    let cancel = CancellationToken::new();
    let task = tokio::spawn(reconciler.run(cancel.clone()));
    (handle, cancel, task)
}

// ---------------------------------------------------------------------------
// Test: one-shot sync
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sync_once_fills_state() {
    let (mut reconciler, _handle) = Reconciler::new(fleet(), ReconcilerConfig::default());

    let applied = reconciler.sync_once(Resource::Jobs).await;
    assert_eq!(
        applied,
        Some(Applied {
            changed: true,
            follow_up: false
        })
    );
    assert_eq!(reconciler.state().jobs.jobs().len(), 3);
    assert_eq!(reconciler.state().jobs.user_options(), ["alice", "bob"]);
    assert!(!reconciler.state().users.is_loaded());
}

/// Unchanged stats do not count as a change.
#[tokio::test]
async fn repeated_identical_stats_are_not_a_change() {
    let (mut reconciler, _handle) = Reconciler::new(fleet(), ReconcilerConfig::default());

    let first = reconciler.sync_once(Resource::Stats).await.unwrap();
    let second = reconciler.sync_once(Resource::Stats).await.unwrap();
    assert!(first.changed);
    assert!(!second.changed);
}

// ---------------------------------------------------------------------------
// Test: poll loop
// ---------------------------------------------------------------------------

/// The start-up tick fetches every resource and publishes a full view.
#[tokio::test]
async fn startup_tick_publishes_every_resource() {
    let (handle, cancel, task) = start(fleet(), quiet_config());

    let view = wait_for_view(&handle, |v| {
        v.jobs.rows().len() == 3 && v.users.rows().len() == 2 && v.total_renders == "7"
    })
    .await;
    assert_eq!(view.total_templates, "3");
    assert_eq!(view.user_options, ["alice", "bob"]);
    assert!(view.notices.is_empty());

    cancel.cancel();
    task.await.unwrap();
}

/// Filters survive a refresh that brings new jobs.
#[tokio::test]
async fn filters_apply_to_refreshed_jobs() {
    let backend = fleet();
    let (handle, cancel, task) = start(Arc::clone(&backend), quiet_config());
    wait_for_view(&handle, |v| v.jobs.rows().len() == 3).await;

    handle.set_user_filter(Some("bob".to_string()));
    handle.set_status_filter(Some(JobStatus::Rendering));
    wait_for_view(&handle, |v| v.jobs.rows().len() == 1).await;

    let mut jobs = backend.jobs();
    jobs.push(job("d4", "bob", JobStatus::Rendering));
    jobs.push(job("e5", "alice", JobStatus::Rendering));
    backend.set_jobs(jobs);
    handle.send(Command::Refresh(Resource::Jobs));

    let view = wait_for_view(&handle, |v| v.jobs.rows().len() == 2).await;
    let uids: Vec<_> = view.jobs.rows().iter().map(|r| r.uid.as_str()).collect();
    assert_eq!(uids, ["a1", "d4"]);
    assert_eq!(view.filter.user.as_deref(), Some("bob"));
    assert_eq!(view.jobs.rows()[1].index, 2);

    cancel.cancel();
    task.await.unwrap();
}

/// Selecting a user whose jobs all disappear resets the user filter.
#[tokio::test]
async fn vanished_user_selection_is_reset() {
    let backend = fleet();
    let (handle, cancel, task) = start(Arc::clone(&backend), quiet_config());
    wait_for_view(&handle, |v| v.jobs.rows().len() == 3).await;

    handle.set_user_filter(Some("alice".to_string()));
    wait_for_view(&handle, |v| v.jobs.rows().len() == 1).await;

    backend.set_jobs(vec![job("a1", "bob", JobStatus::Rendering)]);
    handle.send(Command::Refresh(Resource::Jobs));

    let view = wait_for_view(&handle, |v| v.filter.user.is_none()).await;
    assert_eq!(view.user_options, ["bob"]);
    assert_eq!(view.jobs.rows().len(), 1);

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn filter_matching_nothing_renders_empty_table() {
    let (handle, cancel, task) = start(fleet(), quiet_config());
    wait_for_view(&handle, |v| v.jobs.rows().len() == 3).await;

    handle.set_uid_filter("zz");
    wait_for_view(&handle, |v| v.jobs == Table::Empty).await;

    handle.clear_filters();
    let view = wait_for_view(&handle, |v| v.jobs.rows().len() == 3).await;
    assert!(view.filter.is_empty());

    cancel.cancel();
    task.await.unwrap();
}

// ---------------------------------------------------------------------------
// Test: degraded mode
// ---------------------------------------------------------------------------

/// A failing refresh keeps the last good rows and adds a notice; the next
/// success clears it.
#[tokio::test]
async fn failed_refresh_keeps_last_good_rows() {
    let backend = fleet();
    let (handle, cancel, task) = start(Arc::clone(&backend), quiet_config());
    wait_for_view(&handle, |v| v.jobs.rows().len() == 3).await;

    backend.fail("fetch_jobs");
    handle.send(Command::Refresh(Resource::Jobs));
    let view = wait_for_view(&handle, |v| !v.notices.is_empty()).await;
    assert_eq!(view.jobs.rows().len(), 3);
    assert!(view.notices[0].starts_with("jobs:"));

    backend.recover("fetch_jobs");
    handle.send(Command::Refresh(Resource::Jobs));
    wait_for_view(&handle, |v| v.notices.is_empty()).await;

    cancel.cancel();
    task.await.unwrap();
}

/// Users that never loaded show an error row instead of an empty table.
#[tokio::test]
async fn never_loaded_users_render_error() {
    let backend = fleet();
    backend.fail("fetch_users");
    let (handle, cancel, task) = start(backend, quiet_config());

    let view = wait_for_view(&handle, |v| {
        matches!(v.users, Table::Error(_)) && v.jobs.rows().len() == 3
    })
    .await;
    assert_eq!(view.notices.len(), 1);

    cancel.cancel();
    task.await.unwrap();
}

/// A failed stats fetch shows placeholders, and the next success shows
/// numbers again even though they did not change.
#[tokio::test]
async fn stats_failure_shows_placeholder_until_recovery() {
    let backend = fleet();
    let (handle, cancel, task) = start(Arc::clone(&backend), quiet_config());
    wait_for_view(&handle, |v| v.total_renders == "7").await;

    backend.fail("fetch_stats");
    handle.send(Command::Refresh(Resource::Stats));
    let view = wait_for_view(&handle, |v| v.total_renders == PLACEHOLDER).await;
    assert_eq!(view.total_templates, PLACEHOLDER);

    backend.recover("fetch_stats");
    handle.send(Command::Refresh(Resource::Stats));
    wait_for_view(&handle, |v| v.total_renders == "7").await;

    backend.set_stats(stats(4, 7));
    handle.send(Command::Refresh(Resource::Stats));
    wait_for_view(&handle, |v| v.total_templates == "4").await;

    cancel.cancel();
    task.await.unwrap();
}

// ---------------------------------------------------------------------------
// Test: configuration and lifecycle
// ---------------------------------------------------------------------------

/// The own-history view polls only the caller's history.
#[tokio::test]
async fn own_history_polls_only_history() {
    let backend = fleet();
    let (handle, cancel, task) = start(
        Arc::clone(&backend),
        ReconcilerConfig::own_history(Duration::from_secs(3600)),
    );
    let view = wait_for_view(&handle, |v| v.jobs.rows().len() == 3).await;

    assert_eq!(backend.calls(), ["fetch_history"]);
    assert_eq!(view.users, Table::Loading);
    assert_eq!(view.jobs.rows()[0].actions.len(), 1);

    cancel.cancel();
    task.await.unwrap();
}

/// Short intervals keep polling on their own.
#[tokio::test]
async fn ticker_repolls_without_commands() {
    let backend = fleet();
    let config = ReconcilerConfig {
        poll_interval: Duration::from_millis(20),
        ..ReconcilerConfig::default()
    };
    let (handle, cancel, task) = start(Arc::clone(&backend), config);
    wait_for_view(&handle, |v| v.jobs.rows().len() == 3).await;

    backend.set_jobs(vec![job("z9", "carol", JobStatus::Queued)]);
    let view = wait_for_view(&handle, |v| v.job_row("z9").is_some()).await;
    assert_eq!(view.user_options, ["carol"]);

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn cancellation_stops_the_loop() {
    let (handle, cancel, task) = start(fleet(), quiet_config());
    cancel.cancel();

    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("reconciler did not stop")
        .unwrap();
    assert!(!handle.send(Command::Refresh(Resource::Jobs)));
}

/// One-shot callers fetch, filter and read the view without the loop.
#[tokio::test]
async fn one_shot_commands_filter_the_view() {
    let (mut reconciler, _handle) = Reconciler::new(fleet(), quiet_config());
    reconciler.sync_once(Resource::Jobs).await;

    reconciler
        .handle_command(Command::SetUserFilter(Some("bob".to_string())))
        .await;
    reconciler
        .handle_command(Command::SetUidFilter("C3".to_string()))
        .await;

    let view = reconciler.view();
    let uids: Vec<_> = view.jobs.rows().iter().map(|r| r.uid.as_str()).collect();
    assert_eq!(uids, ["c3"]);
}

/// A one-shot refresh fetches inline and leaves the resource idle, so the
/// next sync still reaches the backend.
#[tokio::test]
async fn one_shot_refresh_does_not_wedge_later_syncs() {
    let backend = fleet();
    let (mut reconciler, _handle) = Reconciler::new(Arc::clone(&backend), quiet_config());

    reconciler.handle_command(Command::Refresh(Resource::Jobs)).await;
    assert_eq!(reconciler.state().sync.phase(Resource::Jobs), FetchPhase::Idle);
    assert_eq!(reconciler.view().jobs.rows().len(), 3);

    backend.set_jobs(vec![job("z9", "carol", JobStatus::Queued)]);
    let applied = reconciler.sync_once(Resource::Jobs).await;
    assert_matches!(applied, Some(Applied { changed: true, .. }));
    assert!(reconciler.view().job_row("z9").is_some());
    assert_eq!(backend.count("fetch_jobs"), 2);
}

// ---------------------------------------------------------------------------
// Test: slow fetches
// ---------------------------------------------------------------------------

/// Refreshes sent while a fetch is outstanding collapse into exactly one
/// follow-up fetch, issued after the first one completes.
#[tokio::test]
async fn refreshes_during_fetch_issue_one_follow_up() {
    let backend = fleet();
    backend.delay("fetch_jobs", Duration::from_millis(200));
    let (handle, cancel, task) = start(Arc::clone(&backend), quiet_config());

    wait_until(|| backend.in_flight("fetch_jobs") == 1).await;
    assert!(handle.send(Command::Refresh(Resource::Jobs)));
    assert!(handle.send(Command::Refresh(Resource::Jobs)));

    wait_until(|| backend.count("fetch_jobs") == 2 && backend.in_flight("fetch_jobs") == 0).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(backend.count("fetch_jobs"), 2);
    assert_eq!(backend.max_in_flight("fetch_jobs"), 1);

    cancel.cancel();
    task.await.unwrap();
}

/// Ticks that fire while a fetch is outstanding are dropped rather than
/// stacking up concurrent fetches of the same resource.
#[tokio::test]
async fn ticks_during_slow_fetch_are_dropped() {
    let backend = fleet();
    backend.delay("fetch_jobs", Duration::from_millis(200));
    let config = ReconcilerConfig {
        poll_interval: Duration::from_millis(20),
        ..ReconcilerConfig::default()
    };
    let (handle, cancel, task) = start(Arc::clone(&backend), config);

    wait_until(|| backend.in_flight("fetch_jobs") == 1).await;
    handle.send(Command::Refresh(Resource::Jobs));
    handle.send(Command::Refresh(Resource::Jobs));
    tokio::time::sleep(Duration::from_millis(600)).await;

    cancel.cancel();
    task.await.unwrap();

    // About thirty ticks fired; each fetch takes ten of them.
    let fetches = backend.count("fetch_jobs");
    assert!((2..=4).contains(&fetches), "unexpected fetch count {fetches}");
    assert_eq!(backend.max_in_flight("fetch_jobs"), 1);
    assert!(backend.count("fetch_users") > fetches);
}
