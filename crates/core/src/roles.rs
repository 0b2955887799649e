//! Well-known role name constants.
//!
//! The backend treats roles as an open set; only these two carry meaning
//! on the client side.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// Role assigned to new accounts when none is given.
pub const DEFAULT_ROLE: &str = ROLE_USER;

/// Whether `role` grants access to the admin endpoints.
pub fn is_admin_role(role: &str) -> bool {
    role == ROLE_ADMIN
}
