//! Login state as seen by the console.
//!
//! The backend is the only authority: after login or logout the session
//! is re-read through `whoami`, and any failure to read it (401/403 or a
//! network error alike) counts as logged out.

use thesis_core::error::CoreError;
use thesis_core::user::{Credentials, Identity};

use crate::api::ThesisApiError;
use crate::backend::ConsoleBackend;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    LoggedOut,
    Authenticated(Identity),
}

impl Session {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Session::LoggedOut => None,
            Session::Authenticated(identity) => Some(identity),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.identity().is_some_and(Identity::is_admin)
    }

    /// The admin identity, or an error naming why admin pages are refused.
    pub fn require_admin(&self) -> Result<&Identity, CoreError> {
        match self.identity() {
            None => Err(CoreError::Unauthorized("Not logged in".to_string())),
            Some(identity) if identity.is_admin() => Ok(identity),
            Some(identity) => Err(CoreError::Forbidden(format!(
                "User '{}' is not an administrator",
                identity.username
            ))),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] CoreError),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Api(#[from] ThesisApiError),
}

/// Read the current session from the backend.
pub async fn check_session<B: ConsoleBackend + ?Sized>(backend: &B) -> Session {
    match backend.whoami().await {
        Ok(identity) => Session::Authenticated(identity),
        Err(e) if e.is_unauthorized() => {
            tracing::debug!("No active session");
            Session::LoggedOut
        }
        Err(e) => {
            tracing::warn!(error = %e, "Session check failed, treating as logged out");
            Session::LoggedOut
        }
    }
}

/// Log in and return the resulting session.
///
/// Blank fields are rejected locally; a non-2xx login response is reported
/// as [`SessionError::InvalidCredentials`].
pub async fn login<B: ConsoleBackend + ?Sized>(
    backend: &B,
    username: &str,
    password: &str,
) -> Result<Session, SessionError> {
    let credentials = Credentials::new(username, password)?;

    match backend.login(&credentials).await {
        Ok(()) => {}
        Err(ThesisApiError::ApiError { status, .. }) => {
            tracing::warn!(username = %credentials.username, status, "Login rejected");
            return Err(SessionError::InvalidCredentials);
        }
        Err(e) => return Err(SessionError::Api(e)),
    }

    let session = check_session(backend).await;
    if let Some(identity) = session.identity() {
        tracing::info!(username = %identity.username, role = %identity.role, "Logged in");
    }
    Ok(session)
}

/// Log out and return the session the backend reports afterwards.
pub async fn logout<B: ConsoleBackend + ?Sized>(backend: &B) -> Session {
    if let Err(e) = backend.logout().await {
        tracing::warn!(error = %e, "Logout request failed");
    }
    check_session(backend).await
}
