//! Policy hooks attached to resource types.
//!
//! A [`Policy`] is bound to a resource type through the [`PolicyRegistry`]
//! and instantiated per request for each resource instance on the path. It
//! takes part in resolution twice:
//!
//! 1. Before resolution, [`Policy::dynamic_principals`] may add principals
//!    derived from the instance and the requesting user (e.g. `owner` when
//!    the user created the record).
//! 2. After resolution, [`Policy::finalize`] may weaken the resolved set
//!    (e.g. read-only once a record is archived).
//!
//! Hooks run leaf to root, so the root-most policy has the final say.

use std::collections::BTreeMap;

use gatehouse_types::{Principal, ResourceName};
use thiserror::Error;

use crate::context::AuthorizationContext;
use crate::permissions::PermissionSet;

pub mod mediator;
mod mutable;
mod registry;

pub use mediator::PolicyMediator;
pub use mutable::MutablePermissionSet;
pub use registry::PolicyRegistry;

/// A policy hook could not produce a result.
///
/// The mediator fails the whole request when any hook returns this.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct PolicyError {
    reason: String,
}

impl PolicyError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Read-only view of a resolved request, passed to [`Policy::finalize`].
#[derive(Debug, Clone, Copy)]
pub struct PolicyScope<'a> {
    pub(crate) context: &'a AuthorizationContext,
    pub(crate) path: &'a [ResourceName],
    pub(crate) contributions: &'a BTreeMap<Principal, PermissionSet>,
    pub(crate) dynamic_principals: &'a [Principal],
}

impl<'a> PolicyScope<'a> {
    pub fn context(&self) -> &'a AuthorizationContext {
        self.context
    }

    /// The resolved resource path, root first.
    pub fn path(&self) -> &'a [ResourceName] {
        self.path
    }

    /// What each principal contributed to the raw result.
    pub fn contributions(&self) -> &'a BTreeMap<Principal, PermissionSet> {
        self.contributions
    }

    /// Returns the contribution of one principal, if it had any.
    pub fn contribution(&self, principal: &str) -> Option<PermissionSet> {
        self.contributions.get(principal).copied()
    }

    /// Dynamic principals gathered from every policy on the path.
    pub fn dynamic_principals(&self) -> &'a [Principal] {
        self.dynamic_principals
    }

    pub fn has_dynamic_principal(&self, principal: &str) -> bool {
        self.dynamic_principals.iter().any(|p| p.as_str() == principal)
    }
}

/// Per-resource hook into permission resolution.
pub trait Policy {
    /// Principals this resource grants the requesting user in addition to
    /// their roles.
    fn dynamic_principals(&self) -> Vec<Principal> {
        Vec::new()
    }

    /// Adjusts the resolved permissions.
    ///
    /// Returning `Err` fails the request; the unmodified set is never used
    /// in that case.
    fn finalize(
        &self,
        perms: MutablePermissionSet,
        _scope: &PolicyScope<'_>,
    ) -> Result<MutablePermissionSet, PolicyError> {
        Ok(perms)
    }
}

/// The policy of resource types with no registered factory.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl Policy for DefaultPolicy {}
