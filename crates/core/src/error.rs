/// Errors raised locally, before or instead of talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Input rejected by client-side validation (blank credentials,
    /// incomplete create-user form).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No session; the command needs a logged-in user.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Logged in, but without the admin role.
    #[error("Forbidden: {0}")]
    Forbidden(String),
}
