//! Authorization for page operations.
//!
//! Authentication happens at the transport (bearer token → [`Actor`]); the
//! lifecycle controller receives the resulting actor, if any, and asks a
//! [`PageAccess`] policy for each capability before touching the store.

use crate::error::CoreError;
use crate::roles::{ROLE_ADMIN, ROLE_EDITOR, ROLE_VIEWER};
use crate::types::DbId;

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: DbId,
    pub role: String,
}

impl Actor {
    pub fn new(user_id: DbId, role: impl Into<String>) -> Self {
        Self {
            user_id,
            role: role.into(),
        }
    }
}

/// Outcome of a capability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    Denied(String),
}

impl AccessDecision {
    /// Convert into a `Forbidden` error when denied.
    pub fn require(self) -> Result<(), CoreError> {
        match self {
            AccessDecision::Allowed => Ok(()),
            AccessDecision::Denied(reason) => Err(CoreError::Forbidden(reason)),
        }
    }
}

/// Capability checks for page operations. `id` is `None` for
/// collection-level checks.
pub trait PageAccess: Send + Sync {
    fn can_list(&self, actor: &Actor) -> AccessDecision;

    fn can_view(&self, actor: &Actor, id: Option<DbId>) -> AccessDecision;

    fn can_create(&self, actor: &Actor) -> AccessDecision;

    fn can_edit(&self, actor: &Actor, id: Option<DbId>) -> AccessDecision;

    /// Defaults to the edit check when no dedicated publish rule exists.
    fn can_publish(&self, actor: &Actor, id: Option<DbId>) -> AccessDecision {
        self.can_edit(actor, id)
    }

    fn can_delete(&self, actor: &Actor, id: Option<DbId>) -> AccessDecision;
}

/// Role-based policy.
///
/// | Capability | Roles                                              |
/// |------------|----------------------------------------------------|
/// | list, view | admin, editor, viewer                              |
/// | create, edit | admin, editor                                    |
/// | publish    | configured publish roles, else same as edit        |
/// | delete     | admin                                              |
#[derive(Debug, Clone, Default)]
pub struct RolePolicy {
    publish_roles: Option<Vec<String>>,
}

impl RolePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict publishing to `roles`. An empty list keeps the edit fallback.
    pub fn with_publish_roles(roles: Vec<String>) -> Self {
        Self {
            publish_roles: (!roles.is_empty()).then_some(roles),
        }
    }

    fn one_of(actor: &Actor, roles: &[&str], what: &str) -> AccessDecision {
        if roles.contains(&actor.role.as_str()) {
            AccessDecision::Allowed
        } else {
            AccessDecision::Denied(format!("Role '{}' may not {what}", actor.role))
        }
    }
}

impl PageAccess for RolePolicy {
    fn can_list(&self, actor: &Actor) -> AccessDecision {
        Self::one_of(actor, &[ROLE_ADMIN, ROLE_EDITOR, ROLE_VIEWER], "list pages")
    }

    fn can_view(&self, actor: &Actor, _id: Option<DbId>) -> AccessDecision {
        Self::one_of(actor, &[ROLE_ADMIN, ROLE_EDITOR, ROLE_VIEWER], "view pages")
    }

    fn can_create(&self, actor: &Actor) -> AccessDecision {
        Self::one_of(actor, &[ROLE_ADMIN, ROLE_EDITOR], "create pages")
    }

    fn can_edit(&self, actor: &Actor, _id: Option<DbId>) -> AccessDecision {
        Self::one_of(actor, &[ROLE_ADMIN, ROLE_EDITOR], "edit pages")
    }

    fn can_publish(&self, actor: &Actor, id: Option<DbId>) -> AccessDecision {
        match &self.publish_roles {
            Some(roles) if roles.iter().any(|role| role == &actor.role) => AccessDecision::Allowed,
            Some(_) => {
                AccessDecision::Denied(format!("Role '{}' may not publish pages", actor.role))
            }
            None => self.can_edit(actor, id),
        }
    }

    fn can_delete(&self, actor: &Actor, _id: Option<DbId>) -> AccessDecision {
        Self::one_of(actor, &[ROLE_ADMIN], "delete pages")
    }
}
