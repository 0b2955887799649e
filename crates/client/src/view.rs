//! Presentation adapter: turns [`ConsoleState`] into display rows.
//!
//! Rendering is a pure function of the state, the current time and the
//! view options.  Every row carries its own actions, each bound to the
//! identifier that row displays, so a re-render can never leave a button
//! pointing at another row's job or account.

use std::fmt;

use thesis_core::filter::{FilteredJobs, JobFilter};
use thesis_core::format::{format_status, short_date, time_ago, StatusBadge};
use thesis_core::job::Job;
use thesis_core::output_path::DEFAULT_DOWNLOAD_ROOT;
use thesis_core::state::ConsoleState;
use thesis_core::sync::Resource;
use thesis_core::types::Timestamp;
use thesis_core::user::User;

use crate::backend::JobSource;
use crate::dispatcher::AdminAction;

/// Placeholder for a job without a template name.
pub const MISSING_TEMPLATE: &str = "—";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewOptions {
    pub source: JobSource,
    pub download_root: String,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            source: JobSource::Admin,
            download_root: DEFAULT_DOWNLOAD_ROOT.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// An action button on a rendered row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowAction {
    CopyUid(String),
    RestartJob(String),
    DeleteJob(String),
    BlockUser(String),
    UnblockUser(String),
    DeleteUser(String),
}

impl RowAction {
    /// The moderation command behind this button, if it is one.
    pub fn admin_action(&self) -> Option<AdminAction> {
        match self {
            RowAction::CopyUid(_) => None,
            RowAction::RestartJob(uid) => Some(AdminAction::RestartJob { uid: uid.clone() }),
            RowAction::DeleteJob(uid) => Some(AdminAction::DeleteJob { uid: uid.clone() }),
            RowAction::BlockUser(username) => Some(AdminAction::BlockUser {
                username: username.clone(),
            }),
            RowAction::UnblockUser(username) => Some(AdminAction::UnblockUser {
                username: username.clone(),
            }),
            RowAction::DeleteUser(username) => Some(AdminAction::DeleteUser {
                username: username.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRow {
    /// 1-based position in the filtered list.
    pub index: usize,
    pub uid: String,
    pub template: String,
    pub user: String,
    pub when: String,
    pub badge: StatusBadge,
    pub percent: u8,
    pub download: Option<String>,
    pub actions: Vec<RowAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub username: String,
    pub role: String,
    pub status: &'static str,
    pub actions: Vec<RowAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Table<R> {
    /// No fetch has completed yet.
    Loading,
    /// No fetch has ever succeeded; carries the failure text.
    Error(String),
    /// Loaded, but nothing to show.
    Empty,
    Rows(Vec<R>),
}

impl<R> Table<R> {
    pub fn rows(&self) -> &[R] {
        match self {
            Table::Rows(rows) => rows,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleView {
    pub total_templates: String,
    pub total_renders: String,
    pub jobs: Table<JobRow>,
    pub users: Table<UserRow>,
    pub filter: JobFilter,
    pub user_options: Vec<String>,
    /// Degraded-resource messages shown above the tables.
    pub notices: Vec<String>,
}

impl ConsoleView {
    /// Find the rendered job row for `uid`.
    pub fn job_row(&self, uid: &str) -> Option<&JobRow> {
        self.jobs.rows().iter().find(|row| row.uid == uid)
    }

    pub fn user_row(&self, username: &str) -> Option<&UserRow> {
        self.users.rows().iter().find(|row| row.username == username)
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn render(state: &ConsoleState, now: Timestamp, options: &ViewOptions) -> ConsoleView {
    let mut notices = Vec::new();
    for resource in Resource::ALL {
        if let Some(failure) = state.sync.last_error(resource) {
            notices.push(format!("{resource}: refresh failed ({failure})"));
        }
    }

    ConsoleView {
        total_templates: state.stats.templates().to_string(),
        total_renders: state.stats.renders().to_string(),
        jobs: render_jobs(state, now, options),
        users: render_users(state),
        filter: state.jobs.filter().clone(),
        user_options: state.jobs.user_options().to_vec(),
        notices,
    }
}

fn render_jobs(state: &ConsoleState, now: Timestamp, options: &ViewOptions) -> Table<JobRow> {
    if !state.jobs.is_loaded() {
        return match state.sync.last_error(Resource::Jobs) {
            Some(failure) => Table::Error(format!("Failed to load jobs: {failure}")),
            None => Table::Loading,
        };
    }

    match state.jobs.filtered() {
        FilteredJobs::Empty => Table::Empty,
        FilteredJobs::Rows(jobs) => Table::Rows(
            jobs.into_iter()
                .enumerate()
                .map(|(i, job)| job_row(i + 1, job, now, options))
                .collect(),
        ),
    }
}

fn job_row(index: usize, job: &Job, now: Timestamp, options: &ViewOptions) -> JobRow {
    let mut actions = vec![RowAction::CopyUid(job.uid.clone())];
    if options.source == JobSource::Admin {
        actions.push(RowAction::RestartJob(job.uid.clone()));
        actions.push(RowAction::DeleteJob(job.uid.clone()));
    }

    let when = match options.source {
        JobSource::Admin => short_date(&job.date),
        JobSource::Own => time_ago(now, &job.date),
    };

    JobRow {
        index,
        uid: job.uid.clone(),
        template: if job.template_name.is_empty() {
            MISSING_TEMPLATE.to_string()
        } else {
            job.template_name.clone()
        },
        user: job.user.clone(),
        when,
        badge: format_status(&job.status),
        percent: job.percent(),
        download: job.download_link(&options.download_root),
        actions,
    }
}

fn render_users(state: &ConsoleState) -> Table<UserRow> {
    if !state.users.is_loaded() {
        return match state.sync.last_error(Resource::Users) {
            Some(failure) => Table::Error(format!("Failed to load users: {failure}")),
            None => Table::Loading,
        };
    }
    if state.users.users().is_empty() {
        return Table::Empty;
    }
    Table::Rows(state.users.users().iter().map(user_row).collect())
}

fn user_row(user: &User) -> UserRow {
    let toggle = if user.is_blocked() {
        RowAction::UnblockUser(user.username.clone())
    } else {
        RowAction::BlockUser(user.username.clone())
    };
    UserRow {
        username: user.username.clone(),
        role: user.role.clone(),
        status: user.status.as_str(),
        actions: vec![toggle, RowAction::DeleteUser(user.username.clone())],
    }
}

// ---------------------------------------------------------------------------
// Terminal output
// ---------------------------------------------------------------------------

impl fmt::Display for ConsoleView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Templates: {}   Renders: {}",
            self.total_templates, self.total_renders
        )?;
        for notice in &self.notices {
            writeln!(f, "! {notice}")?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "{:>3}  {:<24} {:<20} {:<12} {:<16} {:<10} {:>4}  {}",
            "#", "UID", "TEMPLATE", "USER", "DATE", "STATUS", "%", "DOWNLOAD"
        )?;
        match &self.jobs {
            Table::Loading => writeln!(f, "  Loading...")?,
            Table::Error(msg) => writeln!(f, "  {msg}")?,
            Table::Empty => writeln!(f, "  No renders")?,
            Table::Rows(rows) => {
                for row in rows {
                    writeln!(
                        f,
                        "{:>3}  {:<24} {:<20} {:<12} {:<16} {:<10} {:>4}  {}",
                        row.index,
                        row.uid,
                        row.template,
                        row.user,
                        row.when,
                        row.badge.label,
                        row.percent,
                        row.download.as_deref().unwrap_or(""),
                    )?;
                }
            }
        }

        if !matches!(self.users, Table::Loading) {
            writeln!(f)?;
            writeln!(f, "{:<20} {:<10} {}", "USERNAME", "ROLE", "STATUS")?;
            match &self.users {
                Table::Loading => {}
                Table::Error(msg) => writeln!(f, "  {msg}")?,
                Table::Empty => writeln!(f, "  No users")?,
                Table::Rows(rows) => {
                    for row in rows {
                        writeln!(f, "{:<20} {:<10} {}", row.username, row.role, row.status)?;
                    }
                }
            }
        }
        Ok(())
    }
}
