//! Per-request authorization context.

use std::sync::OnceLock;

use gatehouse_types::{Principal, ResourceName, TenantKey};
use tracing::warn;

use crate::error::{AuthzError, Result};

/// Identity and request state for one authorization request.
///
/// Built once per request. The dynamic principals and the resolved resource
/// path are filled in by the mediator exactly once; reusing a context for a
/// second request fails with [`AuthzError::IllegalAuthorization`].
#[derive(Debug)]
pub struct AuthorizationContext {
    tenant: TenantKey,
    account_id: String,
    user_id: String,
    subscriptions: Vec<TenantKey>,
    roles: Vec<Principal>,
    groups: Vec<Principal>,
    dynamic_principals: OnceLock<Vec<Principal>>,
    resource_path: OnceLock<Vec<ResourceName>>,
}

impl AuthorizationContext {
    /// Creates a validated context.
    ///
    /// Fails if the user has no roles or no subscriptions, or if `tenant`
    /// is not one of the user's subscriptions.
    pub fn new(
        tenant: impl Into<TenantKey>,
        account_id: impl Into<String>,
        user_id: impl Into<String>,
        subscriptions: Vec<TenantKey>,
        roles: Vec<Principal>,
    ) -> Result<Self> {
        let tenant = tenant.into();
        let user_id = user_id.into();

        if roles.is_empty() || subscriptions.is_empty() {
            warn!(%tenant, user_id = %user_id, "rejected context without role assignments");
            return Err(AuthzError::illegal("user has no role assignments"));
        }
        if !subscriptions.contains(&tenant) {
            warn!(%tenant, user_id = %user_id, "rejected context for unsubscribed tenant");
            return Err(AuthzError::illegal(format!(
                "user is not subscribed to tenant {tenant}"
            )));
        }

        Ok(Self {
            tenant,
            account_id: account_id.into(),
            user_id,
            subscriptions,
            roles,
            groups: Vec::new(),
            dynamic_principals: OnceLock::new(),
            resource_path: OnceLock::new(),
        })
    }

    #[must_use]
    pub fn with_groups(mut self, groups: Vec<Principal>) -> Self {
        self.groups = groups;
        self
    }

    pub fn tenant(&self) -> &TenantKey {
        &self.tenant
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn subscriptions(&self) -> &[TenantKey] {
        &self.subscriptions
    }

    pub fn roles(&self) -> &[Principal] {
        &self.roles
    }

    pub fn groups(&self) -> &[Principal] {
        &self.groups
    }

    /// Case-insensitive role membership test.
    pub fn is_assigned_to_role(&self, role: &str) -> bool {
        self.roles
            .iter()
            .any(|r| r.as_str().eq_ignore_ascii_case(role))
    }

    /// Dynamic principals gathered from the request's policies, or an empty
    /// slice before the mediator has run.
    pub fn dynamic_principals(&self) -> &[Principal] {
        self.dynamic_principals.get().map(Vec::as_slice).unwrap_or_default()
    }

    /// The resolved resource path, or an empty slice before the mediator
    /// has run.
    pub fn resource_path(&self) -> &[ResourceName] {
        self.resource_path.get().map(Vec::as_slice).unwrap_or_default()
    }

    /// All principals known to this context: roles, then dynamic principals,
    /// then groups.
    pub fn principals(&self) -> Vec<Principal> {
        self.roles
            .iter()
            .chain(self.dynamic_principals())
            .chain(&self.groups)
            .cloned()
            .collect()
    }

    pub(crate) fn set_dynamic_principals(&self, principals: Vec<Principal>) -> Result<()> {
        self.dynamic_principals
            .set(principals)
            .map_err(|_| AuthzError::illegal("dynamic principals already set on this context"))
    }

    pub(crate) fn set_resource_path(&self, path: Vec<ResourceName>) -> Result<()> {
        self.resource_path
            .set(path)
            .map_err(|_| AuthzError::illegal("resource path already set on this context"))
    }
}
