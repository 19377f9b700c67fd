//! Request extractors for authentication.
//!
//! - [`auth::MaybeAuthUser`] -- the caller's identity from a JWT Bearer
//!   token, if one was sent.

pub mod auth;
