//! Job cache and compound filter engine.
//!
//! [`JobBoard`] owns the last fetched job list together with the filter
//! state.  Replacing the list never touches the filter values, and every
//! filter mutation re-derives the visible rows immediately, so the view is
//! always consistent with both without another fetch.

use std::collections::BTreeSet;

use crate::job::{Job, JobStatus};

// ---------------------------------------------------------------------------
// Filter state
// ---------------------------------------------------------------------------

/// The three independent job predicates, combined with logical AND.
///
/// An empty uid query or a `None` selection matches every job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    /// Case-insensitive substring of the job uid.
    pub uid_query: String,
    pub status: Option<JobStatus>,
    /// Exact owner username.
    pub user: Option<String>,
}

impl JobFilter {
    pub fn matches_uid(&self, job: &Job) -> bool {
        self.uid_query.is_empty()
            || job.uid.to_lowercase().contains(&self.uid_query.to_lowercase())
    }

    pub fn matches_status(&self, job: &Job) -> bool {
        self.status.as_ref().map_or(true, |status| &job.status == status)
    }

    pub fn matches_user(&self, job: &Job) -> bool {
        self.user.as_deref().map_or(true, |user| job.user == user)
    }

    /// Apply the uid, status and user predicates in that order.
    pub fn matches(&self, job: &Job) -> bool {
        self.matches_uid(job) && self.matches_status(job) && self.matches_user(job)
    }

    pub fn is_empty(&self) -> bool {
        self.uid_query.is_empty() && self.status.is_none() && self.user.is_none()
    }
}

/// Distinct non-empty job owners, sorted ascending.
///
/// These are the choices of the owner filter.  They come from the job list,
/// not from the managed account list.
pub fn derive_user_options(jobs: &[Job]) -> Vec<String> {
    jobs.iter()
        .map(|job| job.user.as_str())
        .filter(|user| !user.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// Result of applying the filters to the cached jobs.
#[derive(Debug, PartialEq)]
pub enum FilteredJobs<'a> {
    /// Nothing matched (or the cache is empty).
    Empty,
    Rows(Vec<&'a Job>),
}

impl FilteredJobs<'_> {
    pub fn len(&self) -> usize {
        match self {
            FilteredJobs::Empty => 0,
            FilteredJobs::Rows(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FilteredJobs::Empty)
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobBoard {
    jobs: Vec<Job>,
    filter: JobFilter,
    user_options: Vec<String>,
    /// Indices into `jobs` that pass the current filter, in list order.
    visible: Vec<usize>,
    loaded: bool,
}

impl JobBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached list wholesale.
    ///
    /// Jobs missing from `jobs` simply disappear.  The owner options are
    /// recomputed; the selected owner survives only if still offered.
    pub fn set_jobs(&mut self, jobs: Vec<Job>) {
        self.jobs = jobs;
        self.loaded = true;
        self.user_options = derive_user_options(&self.jobs);

        let selection_gone = self
            .filter
            .user
            .as_ref()
            .is_some_and(|user| self.user_options.binary_search(user).is_err());
        if selection_gone {
            self.filter.user = None;
        }

        self.rederive();
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Whether at least one fetch has populated the cache.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn find(&self, uid: &str) -> Option<&Job> {
        self.jobs.iter().find(|job| job.uid == uid)
    }

    pub fn filter(&self) -> &JobFilter {
        &self.filter
    }

    pub fn user_options(&self) -> &[String] {
        &self.user_options
    }

    pub fn set_uid_filter(&mut self, query: impl Into<String>) {
        self.filter.uid_query = query.into();
        self.rederive();
    }

    pub fn set_status_filter(&mut self, status: Option<JobStatus>) {
        self.filter.status = status;
        self.rederive();
    }

    pub fn set_user_filter(&mut self, user: Option<String>) {
        self.filter.user = user.filter(|u| !u.is_empty());
        self.rederive();
    }

    pub fn clear_filters(&mut self) {
        self.filter = JobFilter::default();
        self.rederive();
    }

    /// Jobs passing the current filter, or [`FilteredJobs::Empty`].
    pub fn filtered(&self) -> FilteredJobs<'_> {
        if self.visible.is_empty() {
            return FilteredJobs::Empty;
        }
        FilteredJobs::Rows(self.visible.iter().map(|&i| &self.jobs[i]).collect())
    }

    fn rederive(&mut self) {
        self.visible = self
            .jobs
            .iter()
            .enumerate()
            .filter(|(_, job)| self.filter.matches(job))
            .map(|(i, _)| i)
            .collect();
    }
}
