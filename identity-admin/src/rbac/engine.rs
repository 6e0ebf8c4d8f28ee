//! RBAC evaluation.
//!
//! A caller holds a set of role names. A request is allowed when, for every
//! requested resource, the union of actions granted by the caller's roles
//! covers every requested action.

use std::collections::BTreeSet;

use super::permission::{PermissionRequest, Resource};
use super::role::Role;
use crate::models::UserIdentity;
use crate::services::ServiceError;

/// Decide whether `roles` satisfy `request`.
///
/// Unknown role names grant nothing. Unknown resources are never granted.
/// A resource with an empty action set is trivially satisfied.
pub fn has_permission<'a, I>(roles: I, request: &PermissionRequest) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    let roles: Vec<Role> = roles
        .into_iter()
        .filter_map(|name| name.parse::<Role>().ok())
        .collect();

    request.iter().all(|(resource, actions)| {
        if actions.is_empty() {
            return true;
        }
        let Ok(resource) = resource.parse::<Resource>() else {
            return false;
        };

        let granted: BTreeSet<&str> = roles
            .iter()
            .flat_map(|role| role.grants(resource).iter().copied())
            .collect();

        actions.iter().all(|action| granted.contains(action.as_str()))
    })
}

/// Require `actor` to hold every permission in `request`.
pub fn authorize(actor: &UserIdentity, request: &PermissionRequest) -> Result<(), ServiceError> {
    if has_permission(actor.roles.iter().map(String::as_str), request) {
        return Ok(());
    }

    tracing::warn!(
        actor_id = %actor.id,
        required = %request,
        "Permission denied"
    );
    metrics::counter!("rbac_denials_total").increment(1);
    Err(ServiceError::AuthorizationDenied)
}

/// Shorthand for a single resource check.
pub fn require(
    actor: &UserIdentity,
    resource: Resource,
    actions: &[&str],
) -> Result<(), ServiceError> {
    authorize(actor, &PermissionRequest::new().with(resource, actions))
}
