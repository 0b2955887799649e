//! The console context object.
//!
//! [`ConsoleState`] owns every piece of client-side state for one console
//! view: the job board, the managed user list, the stats counters and the
//! per-resource sync tracker.  It has exactly one writer (the reconciler
//! that holds it), and all transitions are plain method calls.

use crate::filter::JobBoard;
use crate::job::Job;
use crate::stats::{Stats, StatsBoard};
use crate::sync::{FetchFailure, Resource, SyncTracker};
use crate::user::User;

/// Managed accounts from `GET /api/admin/users`.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Vec<User>,
    loaded: bool,
}

impl UserDirectory {
    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users.iter().any(|u| u.username == username)
    }

    /// Replace the list wholesale.
    pub fn set_users(&mut self, users: Vec<User>) {
        self.users = users;
        self.loaded = true;
    }
}

/// What applying a fetch result did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Applied {
    /// The rendered view must be refreshed.
    pub changed: bool,
    /// A remembered refresh request must be issued now.
    pub follow_up: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ConsoleState {
    pub jobs: JobBoard,
    pub users: UserDirectory,
    pub stats: StatsBoard,
    pub sync: SyncTracker,
}

impl ConsoleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a job list fetch. The cache is untouched on failure.
    pub fn apply_jobs(&mut self, result: Result<Vec<Job>, FetchFailure>) -> Applied {
        let outcome = result.map(|jobs| self.jobs.set_jobs(jobs));
        Applied {
            changed: true,
            follow_up: self.sync.finish(Resource::Jobs, outcome),
        }
    }

    /// Apply a user list fetch. The list is untouched on failure.
    pub fn apply_users(&mut self, result: Result<Vec<User>, FetchFailure>) -> Applied {
        let outcome = result.map(|users| self.users.set_users(users));
        Applied {
            changed: true,
            follow_up: self.sync.finish(Resource::Users, outcome),
        }
    }

    /// Apply a stats fetch.
    ///
    /// Success re-renders only if a counter moved; failure always does,
    /// since the counters switch to the placeholder.
    pub fn apply_stats(&mut self, result: Result<Stats, FetchFailure>) -> Applied {
        let (changed, outcome) = match result {
            Ok(stats) => (self.stats.apply(stats).any(), Ok(())),
            Err(failure) => {
                self.stats.fail();
                (true, Err(failure))
            }
        };
        Applied {
            changed,
            follow_up: self.sync.finish(Resource::Stats, outcome),
        }
    }

    /// Whether the last fetch of `resource` failed.
    pub fn is_degraded(&self, resource: Resource) -> bool {
        self.sync.last_error(resource).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;

    fn job(uid: &str, user: &str) -> Job {
        Job {
            uid: uid.into(),
            template_name: String::new(),
            user: user.into(),
            date: String::new(),
            status: JobStatus::Done,
            progress: Some(1.0),
            output_path: None,
        }
    }

    #[test]
    fn failed_job_fetch_keeps_cache_and_marks_degraded() {
        let mut state = ConsoleState::new();
        state.sync.begin_tick(Resource::Jobs);
        state.apply_jobs(Ok(vec![job("a1", "bob")]));

        state.sync.begin_tick(Resource::Jobs);
        let applied = state.apply_jobs(Err(FetchFailure::Network("reset".into())));
        assert!(applied.changed);
        assert!(!applied.follow_up);
        assert_eq!(state.jobs.jobs(), &[job("a1", "bob")]);
        assert!(state.is_degraded(Resource::Jobs));
        assert!(!state.is_degraded(Resource::Users));
    }

    #[test]
    fn successful_fetch_clears_degraded_marker() {
        let mut state = ConsoleState::new();
        state.sync.begin_tick(Resource::Users);
        state.apply_users(Err(FetchFailure::Malformed("expected array".into())));
        assert!(state.is_degraded(Resource::Users));
        assert!(!state.users.is_loaded());

        state.sync.begin_tick(Resource::Users);
        state.apply_users(Ok(vec![]));
        assert!(!state.is_degraded(Resource::Users));
        assert!(state.users.is_loaded());
    }

    #[test]
    fn stats_failure_then_same_value_is_a_change() {
        let stats = Stats {
            total_templates: 5,
            total_renders: 9,
        };
        let mut state = ConsoleState::new();

        state.sync.begin_tick(Resource::Stats);
        assert!(state.apply_stats(Ok(stats)).changed);

        state.sync.begin_tick(Resource::Stats);
        assert!(!state.apply_stats(Ok(stats)).changed);

        state.sync.begin_tick(Resource::Stats);
        assert!(state.apply_stats(Err(FetchFailure::Rejected { status: 502 })).changed);

        state.sync.begin_tick(Resource::Stats);
        assert!(state.apply_stats(Ok(stats)).changed);
    }
}
