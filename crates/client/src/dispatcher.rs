//! Admin action dispatcher.
//!
//! Each moderation command is one request/response exchange.  The
//! dispatcher never edits cached state: on success it asks the reconciler
//! to re-synchronize the affected resource (users for account actions,
//! jobs for job actions), and on failure it returns a notice and triggers
//! nothing.

use std::sync::Arc;

use thesis_core::sync::Resource;
use thesis_core::user::NewUser;

use crate::api::ThesisApiError;
use crate::backend::ConsoleBackend;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    CreateUser(NewUser),
    BlockUser { username: String },
    UnblockUser { username: String },
    DeleteUser { username: String },
    RestartJob { uid: String },
    DeleteJob { uid: String },
}

impl AdminAction {
    /// Short operation name used in logs and notices.
    pub fn name(&self) -> &'static str {
        match self {
            AdminAction::CreateUser(_) => "create user",
            AdminAction::BlockUser { .. } => "block user",
            AdminAction::UnblockUser { .. } => "unblock user",
            AdminAction::DeleteUser { .. } => "delete user",
            AdminAction::RestartJob { .. } => "restart job",
            AdminAction::DeleteJob { .. } => "delete job",
        }
    }

    /// Username or job uid the action applies to.
    pub fn target(&self) -> &str {
        match self {
            AdminAction::CreateUser(user) => &user.username,
            AdminAction::BlockUser { username }
            | AdminAction::UnblockUser { username }
            | AdminAction::DeleteUser { username } => username,
            AdminAction::RestartJob { uid } | AdminAction::DeleteJob { uid } => uid,
        }
    }

    /// Resource class that must be re-synchronized after success.
    pub fn affected_resource(&self) -> Resource {
        match self {
            AdminAction::CreateUser(_)
            | AdminAction::BlockUser { .. }
            | AdminAction::UnblockUser { .. }
            | AdminAction::DeleteUser { .. } => Resource::Users,
            AdminAction::RestartJob { .. } | AdminAction::DeleteJob { .. } => Resource::Jobs,
        }
    }

    /// Every state-changing action except account creation is confirmed.
    pub fn requires_confirmation(&self) -> bool {
        !matches!(self, AdminAction::CreateUser(_))
    }

    pub fn confirmation_prompt(&self) -> String {
        format!("Really {} '{}'?", self.name(), self.target())
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Interactive confirmation for destructive actions.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Confirms everything (non-interactive use).
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Receives the post-success refresh request.
pub trait RefreshTrigger: Send + Sync {
    fn refresh(&self, resource: Resource);
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The operator declined the confirmation; nothing was sent.
    Cancelled,
    /// The backend accepted the command and `refreshed` was re-requested.
    Completed { refreshed: Resource },
}

/// A failed action, displayed to the operator as a notice.
#[derive(Debug, thiserror::Error)]
#[error("Failed to {action} '{target}': {message}")]
pub struct ActionError {
    pub action: &'static str,
    pub target: String,
    pub message: String,
    #[source]
    pub source: ThesisApiError,
}

impl ActionError {
    fn new(action: &AdminAction, source: ThesisApiError) -> Self {
        let message = match (action, source.server_message()) {
            (AdminAction::CreateUser(_), Some(msg)) => msg,
            _ => match &source {
                ThesisApiError::ApiError { status, .. } => format!("backend returned {status}"),
                other => other.to_string(),
            },
        };
        Self {
            action: action.name(),
            target: action.target().to_string(),
            message,
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct ActionDispatcher<B: ?Sized, T> {
    backend: Arc<B>,
    trigger: T,
}

impl<B, T> ActionDispatcher<B, T>
where
    B: ConsoleBackend + ?Sized,
    T: RefreshTrigger,
{
    pub fn new(backend: Arc<B>, trigger: T) -> Self {
        Self { backend, trigger }
    }

    /// Confirm (when required), send the command and, on success only,
    /// request a refresh of the affected resource.
    ///
    /// Post-condition: `Ok(Completed { refreshed })` means a refresh of
    /// `refreshed` has been requested; `Err` and `Cancelled` mean no
    /// request and no state change.
    pub async fn dispatch(
        &self,
        action: AdminAction,
        confirm: &dyn Confirm,
    ) -> Result<ActionOutcome, ActionError> {
        if action.requires_confirmation() && !confirm.confirm(&action.confirmation_prompt()) {
            tracing::info!(action = action.name(), target = %action.target(), "Action cancelled");
            return Ok(ActionOutcome::Cancelled);
        }

        if let Err(e) = self.send(&action).await {
            let err = ActionError::new(&action, e);
            tracing::error!(
                action = err.action,
                target = %err.target,
                error = %err.source,
                "Admin action failed",
            );
            return Err(err);
        }

        let refreshed = action.affected_resource();
        tracing::info!(
            action = action.name(),
            target = %action.target(),
            %refreshed,
            "Admin action succeeded",
        );
        self.trigger.refresh(refreshed);
        Ok(ActionOutcome::Completed { refreshed })
    }

    async fn send(&self, action: &AdminAction) -> Result<(), ThesisApiError> {
        match action {
            AdminAction::CreateUser(user) => self.backend.create_user(user).await,
            AdminAction::BlockUser { username } => self.backend.block_user(username).await,
            AdminAction::UnblockUser { username } => self.backend.unblock_user(username).await,
            AdminAction::DeleteUser { username } => self.backend.delete_user(username).await,
            AdminAction::RestartJob { uid } => self.backend.restart_job(uid).await,
            AdminAction::DeleteJob { uid } => self.backend.delete_job(uid).await,
        }
    }
}
