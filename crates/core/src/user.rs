//! Account models for the admin user list and the session identity.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::roles::is_admin_role;

pub const USER_STATUS_ACTIVE: &str = "active";
pub const USER_STATUS_BLOCKED: &str = "blocked";

/// Account status. Anything other than `blocked` counts as active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserStatus {
    #[default]
    Active,
    Blocked,
}

impl UserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UserStatus::Active => USER_STATUS_ACTIVE,
            UserStatus::Blocked => USER_STATUS_BLOCKED,
        }
    }
}

impl From<String> for UserStatus {
    fn from(value: String) -> Self {
        if value == USER_STATUS_BLOCKED {
            UserStatus::Blocked
        } else {
            UserStatus::Active
        }
    }
}

impl From<UserStatus> for String {
    fn from(value: UserStatus) -> Self {
        value.as_str().to_string()
    }
}

/// A managed account as returned by `GET /api/admin/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub status: UserStatus,
}

impl User {
    pub fn is_blocked(&self) -> bool {
        self.status == UserStatus::Blocked
    }
}

/// The logged-in account as reported by `GET /api/whoami`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    pub username: String,
    pub role: String,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        is_admin_role(&self.role)
    }
}

/// Username/password pair for `POST /api/login`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Build credentials from raw input, trimming both fields.
    ///
    /// Rejects empty fields before anything is sent to the backend.
    pub fn new(username: &str, password: &str) -> Result<Self, CoreError> {
        let username = username.trim();
        let password = password.trim();
        if username.is_empty() || password.is_empty() {
            return Err(CoreError::Validation(
                "Both username and password are required".to_string(),
            ));
        }
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// Payload for `POST /api/admin/users/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: String,
}

impl NewUser {
    /// Validate and build a create-user request.
    pub fn new(username: &str, password: &str, role: &str) -> Result<Self, CoreError> {
        let username = username.trim();
        let role = role.trim();
        if username.is_empty() {
            return Err(CoreError::Validation("Username must not be empty".to_string()));
        }
        if password.is_empty() {
            return Err(CoreError::Validation("Password must not be empty".to_string()));
        }
        if role.is_empty() {
            return Err(CoreError::Validation("Role must not be empty".to_string()));
        }
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
            role: role.to_string(),
        })
    }
}
