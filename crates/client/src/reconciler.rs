//! Poll loop / reconciler.
//!
//! A [`Reconciler`] is the single owner of one view's [`ConsoleState`].
//! It runs as one task: timer ticks, refresh and filter commands from
//! [`ReconcilerHandle`]s, and fetch completions are all handled on that
//! task, so the cache has exactly one writer.  Fetches themselves run as
//! spawned tasks so a slow resource never holds up the others; their
//! results come back over a channel and are applied in completion order.
//!
//! Every state change publishes a freshly rendered [`ConsoleView`] on a
//! `watch` channel.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thesis_core::job::{Job, JobStatus};
use thesis_core::state::{Applied, ConsoleState};
use thesis_core::stats::Stats;
use thesis_core::sync::{FetchFailure, Resource};
use thesis_core::user::User;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::backend::{ConsoleBackend, JobSource};
use crate::dispatcher::RefreshTrigger;
use crate::view::{render, ConsoleView, ViewOptions};

/// Default reconciliation cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub poll_interval: Duration,
    /// Resource classes polled on every tick.
    pub resources: Vec<Resource>,
    pub view: ViewOptions,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            resources: Resource::ALL.to_vec(),
            view: ViewOptions::default(),
        }
    }
}

impl ReconcilerConfig {
    /// Configuration for a user's own render history: jobs only.
    pub fn own_history(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            resources: vec![Resource::Jobs],
            view: ViewOptions {
                source: JobSource::Own,
                ..ViewOptions::default()
            },
        }
    }
}

/// Requests accepted by a running reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Refresh(Resource),
    SetUidFilter(String),
    SetStatusFilter(Option<JobStatus>),
    SetUserFilter(Option<String>),
    ClearFilters,
}

/// Result of one fetch, delivered back to the owning task.
#[derive(Debug)]
enum Completion {
    Jobs(Result<Vec<Job>, FetchFailure>),
    Users(Result<Vec<User>, FetchFailure>),
    Stats(Result<Stats, FetchFailure>),
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Cheap, cloneable access to a reconciler from other tasks.
#[derive(Clone)]
pub struct ReconcilerHandle {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<Arc<ConsoleView>>,
}

impl ReconcilerHandle {
    /// Send a command. Returns `false` if the reconciler has stopped.
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn set_uid_filter(&self, query: impl Into<String>) -> bool {
        self.send(Command::SetUidFilter(query.into()))
    }

    pub fn set_status_filter(&self, status: Option<JobStatus>) -> bool {
        self.send(Command::SetStatusFilter(status))
    }

    pub fn set_user_filter(&self, user: Option<String>) -> bool {
        self.send(Command::SetUserFilter(user))
    }

    pub fn clear_filters(&self) -> bool {
        self.send(Command::ClearFilters)
    }

    /// The most recently published view.
    pub fn view(&self) -> Arc<ConsoleView> {
        self.view.borrow().clone()
    }

    /// A receiver that is notified whenever a new view is published.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ConsoleView>> {
        self.view.clone()
    }
}

impl RefreshTrigger for ReconcilerHandle {
    fn refresh(&self, resource: Resource) {
        if !self.send(Command::Refresh(resource)) {
            tracing::debug!(%resource, "Reconciler stopped, refresh discarded");
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

pub struct Reconciler<B: ConsoleBackend> {
    backend: Arc<B>,
    state: ConsoleState,
    config: ReconcilerConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    view_tx: watch::Sender<Arc<ConsoleView>>,
}

impl<B: ConsoleBackend> Reconciler<B> {
    pub fn new(backend: Arc<B>, config: ReconcilerConfig) -> (Self, ReconcilerHandle) {
        let state = ConsoleState::new();
        let initial = Arc::new(render(&state, Utc::now(), &config.view));
        let (view_tx, view_rx) = watch::channel(initial);
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let reconciler = Self {
            backend,
            state,
            config,
            commands,
            completions_tx,
            completions_rx,
            view_tx,
        };
        let handle = ReconcilerHandle {
            commands: commands_tx,
            view: view_rx,
        };
        (reconciler, handle)
    }

    pub fn state(&self) -> &ConsoleState {
        &self.state
    }

    /// The view as of the last state change.
    pub fn view(&self) -> Arc<ConsoleView> {
        self.view_tx.borrow().clone()
    }

    /// Fetch `resource` once, inline, and apply the result.
    ///
    /// Used by one-shot commands.  Returns `None` if a fetch of the same
    /// resource is already outstanding.
    pub async fn sync_once(&mut self, resource: Resource) -> Option<Applied> {
        if !self.state.sync.request(resource) {
            return None;
        }
        let completion = fetch(self.backend.as_ref(), resource, self.config.view.source).await;
        let applied = self.apply(completion);
        Some(applied)
    }

    /// Run the poll loop until `cancel` is triggered.
    ///
    /// The first tick fires immediately, so every polled resource is
    /// fetched once on start-up.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            resources = ?self.config.resources,
            "Reconciler started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Reconciler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.on_tick();
                }
                Some(command) = self.commands.recv() => {
                    self.on_command(command);
                }
                Some(completion) = self.completions_rx.recv() => {
                    let resource = completion.resource();
                    let applied = self.apply(completion);
                    if applied.follow_up {
                        tracing::debug!(%resource, "Issuing follow-up refresh");
                        self.spawn_fetch(resource);
                    }
                }
            }
        }
    }

    fn on_tick(&mut self) {
        for &resource in &self.config.resources {
            if self.state.sync.begin_tick(resource) {
                self.spawn_fetch(resource);
            } else {
                tracing::debug!(%resource, "Fetch still outstanding, tick dropped");
            }
        }
    }

    /// Apply a command without the run loop.
    ///
    /// `Refresh` fetches inline through [`Reconciler::sync_once`]; filter
    /// commands update the job board and publish the view.  Commands sent
    /// through a [`ReconcilerHandle`] only take effect while [`Reconciler::run`]
    /// is running.
    pub async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Refresh(resource) => {
                if self.sync_once(resource).await.is_none() {
                    tracing::debug!(%resource, "Refresh skipped, fetch outstanding");
                }
            }
            command => self.on_command(command),
        }
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Refresh(resource) => {
                if self.state.sync.request(resource) {
                    self.spawn_fetch(resource);
                } else {
                    tracing::debug!(%resource, "Refresh queued behind outstanding fetch");
                }
                return;
            }
            Command::SetUidFilter(query) => self.state.jobs.set_uid_filter(query),
            Command::SetStatusFilter(status) => self.state.jobs.set_status_filter(status),
            Command::SetUserFilter(user) => self.state.jobs.set_user_filter(user),
            Command::ClearFilters => self.state.jobs.clear_filters(),
        }
        self.publish();
    }

    fn spawn_fetch(&self, resource: Resource) {
        let backend = Arc::clone(&self.backend);
        let tx = self.completions_tx.clone();
        let source = self.config.view.source;
        tokio::spawn(async move {
            let completion = fetch(backend.as_ref(), resource, source).await;
            // The reconciler may be gone; its view no longer exists.
            let _ = tx.send(completion);
        });
    }

    fn apply(&mut self, completion: Completion) -> Applied {
        let applied = match completion {
            Completion::Jobs(result) => self.state.apply_jobs(result),
            Completion::Users(result) => self.state.apply_users(result),
            Completion::Stats(result) => self.state.apply_stats(result),
        };
        if applied.changed {
            self.publish();
        }
        applied
    }

    fn publish(&self) {
        let view = render(&self.state, Utc::now(), &self.config.view);
        self.view_tx.send_replace(Arc::new(view));
    }
}

impl Completion {
    fn resource(&self) -> Resource {
        match self {
            Completion::Jobs(_) => Resource::Jobs,
            Completion::Users(_) => Resource::Users,
            Completion::Stats(_) => Resource::Stats,
        }
    }
}

async fn fetch<B: ConsoleBackend + ?Sized>(
    backend: &B,
    resource: Resource,
    source: JobSource,
) -> Completion {
    match resource {
        Resource::Jobs => Completion::Jobs(classify(resource, backend.fetch_jobs(source).await)),
        Resource::Users => Completion::Users(classify(resource, backend.fetch_users().await)),
        Resource::Stats => Completion::Stats(classify(resource, backend.fetch_stats().await)),
    }
}

fn classify<T>(
    resource: Resource,
    result: Result<T, crate::api::ThesisApiError>,
) -> Result<T, FetchFailure> {
    result.map_err(|e| {
        let failure = e.classify();
        tracing::warn!(%resource, error = %e, "Fetch failed");
        failure
    })
}
