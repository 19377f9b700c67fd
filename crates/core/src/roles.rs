//! Well-known role name constants.
//!
//! These must match the `role` claim issued in access tokens.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_EDITOR: &str = "editor";
pub const ROLE_VIEWER: &str = "viewer";
