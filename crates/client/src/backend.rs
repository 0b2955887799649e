//! The seam between the console core and the backend.
//!
//! The reconciler, dispatcher and session helpers only talk to a
//! [`ConsoleBackend`], so they can run against [`ThesisApi`] in production
//! and against an in-memory fake in tests.

use async_trait::async_trait;
use thesis_core::job::Job;
use thesis_core::stats::Stats;
use thesis_core::user::{Credentials, Identity, NewUser, User};

use crate::api::{ThesisApi, ThesisApiError};

/// Which job list a console view mirrors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JobSource {
    /// Every job in the fleet (`GET /api/admin/renders`).
    #[default]
    Admin,
    /// The logged-in user's own history (`GET /api/render-history`).
    Own,
}

#[async_trait]
pub trait ConsoleBackend: Send + Sync + 'static {
    async fn login(&self, credentials: &Credentials) -> Result<(), ThesisApiError>;
    async fn logout(&self) -> Result<(), ThesisApiError>;
    async fn whoami(&self) -> Result<Identity, ThesisApiError>;

    async fn fetch_stats(&self) -> Result<Stats, ThesisApiError>;
    async fn fetch_jobs(&self, source: JobSource) -> Result<Vec<Job>, ThesisApiError>;
    async fn fetch_users(&self) -> Result<Vec<User>, ThesisApiError>;

    async fn create_user(&self, user: &NewUser) -> Result<(), ThesisApiError>;
    async fn block_user(&self, username: &str) -> Result<(), ThesisApiError>;
    async fn unblock_user(&self, username: &str) -> Result<(), ThesisApiError>;
    async fn delete_user(&self, username: &str) -> Result<(), ThesisApiError>;
    async fn restart_job(&self, uid: &str) -> Result<(), ThesisApiError>;
    async fn delete_job(&self, uid: &str) -> Result<(), ThesisApiError>;
}

#[async_trait]
impl ConsoleBackend for ThesisApi {
    async fn login(&self, credentials: &Credentials) -> Result<(), ThesisApiError> {
        ThesisApi::login(self, credentials).await
    }

    async fn logout(&self) -> Result<(), ThesisApiError> {
        ThesisApi::logout(self).await
    }

    async fn whoami(&self) -> Result<Identity, ThesisApiError> {
        ThesisApi::whoami(self).await
    }

    async fn fetch_stats(&self) -> Result<Stats, ThesisApiError> {
        ThesisApi::fetch_stats(self).await
    }

    async fn fetch_jobs(&self, source: JobSource) -> Result<Vec<Job>, ThesisApiError> {
        match source {
            JobSource::Admin => self.fetch_admin_renders().await,
            JobSource::Own => self.fetch_render_history().await,
        }
    }

    async fn fetch_users(&self) -> Result<Vec<User>, ThesisApiError> {
        ThesisApi::fetch_users(self).await
    }

    async fn create_user(&self, user: &NewUser) -> Result<(), ThesisApiError> {
        ThesisApi::create_user(self, user).await
    }

    async fn block_user(&self, username: &str) -> Result<(), ThesisApiError> {
        ThesisApi::block_user(self, username).await
    }

    async fn unblock_user(&self, username: &str) -> Result<(), ThesisApiError> {
        ThesisApi::unblock_user(self, username).await
    }

    async fn delete_user(&self, username: &str) -> Result<(), ThesisApiError> {
        ThesisApi::delete_user(self, username).await
    }

    async fn restart_job(&self, uid: &str) -> Result<(), ThesisApiError> {
        ThesisApi::restart_job(self, uid).await
    }

    async fn delete_job(&self, uid: &str) -> Result<(), ThesisApiError> {
        ThesisApi::delete_job(self, uid).await
    }
}
