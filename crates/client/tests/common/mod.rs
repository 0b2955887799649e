// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use thesis_client::api::ThesisApiError;
use thesis_client::backend::{ConsoleBackend, JobSource};
use thesis_client::reconciler::ReconcilerHandle;
use thesis_client::view::ConsoleView;
use thesis_core::job::{Job, JobStatus};
use thesis_core::stats::Stats;
use thesis_core::user::{Credentials, Identity, NewUser, User, UserStatus};

/// Build a job owned by `user`.
pub fn job(uid: &str, user: &str, status: JobStatus) -> Job {
    Job {
        uid: uid.to_string(),
        template_name: "intro".to_string(),
        user: user.to_string(),
        date: "2024-05-10T11:58:30Z".to_string(),
        status,
        progress: Some(0.5),
        output_path: None,
    }
}

pub fn user(username: &str, status: UserStatus) -> User {
    User {
        username: username.to_string(),
        role: "user".to_string(),
        status,
    }
}

#[derive(Default)]
struct Data {
    jobs: Vec<Job>,
    users: Vec<User>,
    stats: Option<Stats>,
    failing: HashSet<&'static str>,
    calls: Vec<String>,
    delays: HashMap<&'static str, Duration>,
    in_flight: HashMap<&'static str, usize>,
    max_in_flight: HashMap<&'static str, usize>,
}

/// In-memory backend that behaves like the render backend: commands
/// mutate the data that later fetches return.
///
/// Any operation can be made to fail with a 500 via [`fail`](Self::fail),
/// and fetches can be slowed down via [`delay`](Self::delay).
#[derive(Default)]
pub struct ScriptedBackend {
    data: Mutex<Data>,
}

impl ScriptedBackend {
    pub fn new(jobs: Vec<Job>, users: Vec<User>, stats: Stats) -> Arc<Self> {
        Arc::new(Self {
            data: Mutex::new(Data {
                jobs,
                users,
                stats: Some(stats),
                ..Data::default()
            }),
        })
    }

    pub fn set_jobs(&self, jobs: Vec<Job>) {
        self.data.lock().unwrap().jobs = jobs;
    }

    pub fn set_stats(&self, stats: Stats) {
        self.data.lock().unwrap().stats = Some(stats);
    }

    pub fn users(&self) -> Vec<User> {
        self.data.lock().unwrap().users.clone()
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.data.lock().unwrap().jobs.clone()
    }

    /// Make `operation` (e.g. `"fetch_jobs"`) fail until [`recover`](Self::recover).
    pub fn fail(&self, operation: &'static str) {
        self.data.lock().unwrap().failing.insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.data.lock().unwrap().failing.remove(operation);
    }

    /// Every operation invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.data.lock().unwrap().calls.clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.data.lock().unwrap().calls.iter().filter(|c| *c == operation).count()
    }

    /// Hold every later `operation` fetch for `delay` before answering.
    pub fn delay(&self, operation: &'static str, delay: Duration) {
        self.data.lock().unwrap().delays.insert(operation, delay);
    }

    /// Fetches of `operation` currently waiting out their delay.
    pub fn in_flight(&self, operation: &str) -> usize {
        self.data.lock().unwrap().in_flight.get(operation).copied().unwrap_or(0)
    }

    /// Highest number of overlapping `operation` fetches seen so far.
    pub fn max_in_flight(&self, operation: &str) -> usize {
        self.data.lock().unwrap().max_in_flight.get(operation).copied().unwrap_or(0)
    }

    /// Count the fetch as in flight for its configured delay.  The lock is
    /// not held while sleeping.
    async fn hold(&self, operation: &'static str) {
        let delay = {
            let mut data = self.data.lock().unwrap();
            let current = {
                let n = data.in_flight.entry(operation).or_default();
                *n += 1;
                *n
            };
            let max = data.max_in_flight.entry(operation).or_default();
            *max = (*max).max(current);
            data.delays.get(operation).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut data = self.data.lock().unwrap();
        if let Some(n) = data.in_flight.get_mut(operation) {
            *n -= 1;
        }
    }

    fn call(&self, operation: &'static str) -> Result<std::sync::MutexGuard<'_, Data>, ThesisApiError> {
        let mut data = self.data.lock().unwrap();
        data.calls.push(operation.to_string());
        if data.failing.contains(operation) {
            return Err(ThesisApiError::ApiError {
                status: 500,
                body: format!(r#"{{"error":"{operation} exploded"}}"#),
            });
        }
        Ok(data)
    }
}

#[async_trait]
impl ConsoleBackend for ScriptedBackend {
    async fn login(&self, _credentials: &Credentials) -> Result<(), ThesisApiError> {
        self.call("login").map(drop)
    }

    async fn logout(&self) -> Result<(), ThesisApiError> {
        self.call("logout").map(drop)
    }

    async fn whoami(&self) -> Result<Identity, ThesisApiError> {
        self.call("whoami")?;
        Ok(Identity {
            username: "admin".to_string(),
            role: "admin".to_string(),
        })
    }

    async fn fetch_stats(&self) -> Result<Stats, ThesisApiError> {
        self.hold("fetch_stats").await;
        let data = self.call("fetch_stats")?;
        data.stats.ok_or_else(|| ThesisApiError::Decode("no stats".to_string()))
    }

    async fn fetch_jobs(&self, source: JobSource) -> Result<Vec<Job>, ThesisApiError> {
        let operation = match source {
            JobSource::Admin => "fetch_jobs",
            JobSource::Own => "fetch_history",
        };
        self.hold(operation).await;
        Ok(self.call(operation)?.jobs.clone())
    }

    async fn fetch_users(&self) -> Result<Vec<User>, ThesisApiError> {
        self.hold("fetch_users").await;
        Ok(self.call("fetch_users")?.users.clone())
    }

    async fn create_user(&self, new_user: &NewUser) -> Result<(), ThesisApiError> {
        let mut data = self.call("create_user")?;
        if data.users.iter().any(|u| u.username == new_user.username) {
            return Err(ThesisApiError::ApiError {
                status: 409,
                body: r#"{"error":"User already exists"}"#.to_string(),
            });
        }
        data.users.push(User {
            username: new_user.username.clone(),
            role: new_user.role.clone(),
            status: UserStatus::Active,
        });
        Ok(())
    }

    async fn block_user(&self, username: &str) -> Result<(), ThesisApiError> {
        let mut data = self.call("block_user")?;
        for u in data.users.iter_mut().filter(|u| u.username == username) {
            u.status = UserStatus::Blocked;
        }
        Ok(())
    }

    async fn unblock_user(&self, username: &str) -> Result<(), ThesisApiError> {
        let mut data = self.call("unblock_user")?;
        for u in data.users.iter_mut().filter(|u| u.username == username) {
            u.status = UserStatus::Active;
        }
        Ok(())
    }

    async fn delete_user(&self, username: &str) -> Result<(), ThesisApiError> {
        self.call("delete_user")?.users.retain(|u| u.username != username);
        Ok(())
    }

    async fn restart_job(&self, uid: &str) -> Result<(), ThesisApiError> {
        let mut data = self.call("restart_job")?;
        for j in data.jobs.iter_mut().filter(|j| j.uid == uid) {
            j.status = JobStatus::Queued;
            j.progress = Some(0.0);
        }
        Ok(())
    }

    async fn delete_job(&self, uid: &str) -> Result<(), ThesisApiError> {
        self.call("delete_job")?.jobs.retain(|j| j.uid != uid);
        Ok(())
    }
}

/// Wait until the published view satisfies `predicate`, failing the test
/// after two seconds.
pub async fn wait_for_view<F>(handle: &ReconcilerHandle, mut predicate: F) -> Arc<ConsoleView>
where
    F: FnMut(&ConsoleView) -> bool,
{
    let mut rx = handle.subscribe();
    let wait = async {
        loop {
            {
                let view = rx.borrow_and_update().clone();
                if predicate(&view) {
                    return view;
                }
            }
            if rx.changed().await.is_err() {
                panic!("reconciler stopped before the expected view was published");
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(2), wait)
        .await
        .expect("timed out waiting for view")
}
