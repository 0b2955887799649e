//! Per-resource fetch state machine.
//!
//! Each resource class moves `Idle -> Fetching -> Idle` independently of
//! the others.  At most one fetch per class is outstanding: a timer tick
//! arriving while a fetch is in flight is dropped, while an explicit
//! refresh request is remembered and turned into one follow-up fetch once
//! the outstanding one completes.

/// The three independently reconciled resource classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Jobs,
    Users,
    Stats,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Jobs, Resource::Users, Resource::Stats];

    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Jobs => "jobs",
            Resource::Users => "users",
            Resource::Stats => "stats",
        }
    }

    fn index(self) -> usize {
        match self {
            Resource::Jobs => 0,
            Resource::Users => 1,
            Resource::Stats => 2,
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a reconciliation fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchFailure {
    /// The request never produced a response (connect, timeout, reset).
    #[error("network error: {0}")]
    Network(String),

    /// 401/403 from the backend.
    #[error("not authorized")]
    Unauthorized,

    /// Any other non-2xx status.
    #[error("backend rejected the request ({status})")]
    Rejected { status: u16 },

    /// 2xx with a body that does not match the expected shape.
    #[error("unexpected payload: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchPhase {
    #[default]
    Idle,
    Fetching,
}

#[derive(Debug, Clone, Default)]
struct ResourceSync {
    phase: FetchPhase,
    follow_up: bool,
    last_error: Option<FetchFailure>,
}

#[derive(Debug, Clone, Default)]
pub struct SyncTracker {
    resources: [ResourceSync; 3],
}

impl SyncTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self, resource: Resource) -> FetchPhase {
        self.resources[resource.index()].phase
    }

    /// Failure of the most recent completed fetch, if it failed.
    pub fn last_error(&self, resource: Resource) -> Option<&FetchFailure> {
        self.resources[resource.index()].last_error.as_ref()
    }

    /// Timer tick: start a fetch unless one is already outstanding.
    ///
    /// Returns `true` when the caller must issue the fetch.
    pub fn begin_tick(&mut self, resource: Resource) -> bool {
        let sync = &mut self.resources[resource.index()];
        match sync.phase {
            FetchPhase::Fetching => false,
            FetchPhase::Idle => {
                sync.phase = FetchPhase::Fetching;
                true
            }
        }
    }

    /// Explicit refresh: start now, or remember it if a fetch is in flight.
    ///
    /// Returns `true` when the caller must issue the fetch.
    pub fn request(&mut self, resource: Resource) -> bool {
        let sync = &mut self.resources[resource.index()];
        match sync.phase {
            FetchPhase::Fetching => {
                sync.follow_up = true;
                false
            }
            FetchPhase::Idle => {
                sync.phase = FetchPhase::Fetching;
                true
            }
        }
    }

    /// Complete the outstanding fetch.
    ///
    /// Returns `true` when a remembered refresh request must be issued now;
    /// in that case the resource is already back in `Fetching`.
    pub fn finish(&mut self, resource: Resource, outcome: Result<(), FetchFailure>) -> bool {
        let sync = &mut self.resources[resource.index()];
        sync.last_error = outcome.err();
        if std::mem::take(&mut sync.follow_up) {
            sync.phase = FetchPhase::Fetching;
            true
        } else {
            sync.phase = FetchPhase::Idle;
            false
        }
    }
}
