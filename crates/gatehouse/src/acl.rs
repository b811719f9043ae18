//! ACL entries and the per-resource ACL tree.
//!
//! A [`ResourceAclTree`] node names one resource type and holds the ACL
//! entries defined directly on it, keyed by principal, plus its child
//! resource types. Trees are assembled once by a loader and only read while
//! resolving requests.

use std::collections::HashMap;

use gatehouse_types::{ParseMode, Principal, ResourceName};
use serde::Serialize;
use tracing::trace;

use crate::error::{AuthzError, Result};
use crate::permissions::PermissionSet;

/// One principal's permissions on one resource node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acl {
    principal: Principal,
    permissions: PermissionSet,
}

impl Acl {
    /// Creates an entry from a principal and the integer permission form.
    ///
    /// Fails with [`AuthzError::InvalidAcl`] if the principal is blank.
    pub fn new(principal: impl Into<Principal>, bits: u8) -> Result<Self> {
        Self::with_permissions(principal, PermissionSet::from_bits(bits))
    }

    pub fn with_permissions(
        principal: impl Into<Principal>,
        permissions: PermissionSet,
    ) -> Result<Self> {
        let principal = principal.into();
        if principal.is_blank() {
            return Err(AuthzError::InvalidAcl(
                "principal must not be blank".to_string(),
            ));
        }
        Ok(Self {
            principal,
            permissions,
        })
    }

    /// Creates an entry from the 5-character permission string, e.g. as
    /// read from a tenant's ACL definition file.
    pub fn parse(principal: impl Into<Principal>, permissions: &str, mode: ParseMode) -> Result<Self> {
        Self::with_permissions(principal, PermissionSet::parse(permissions, mode)?)
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn permissions(&self) -> PermissionSet {
        self.permissions
    }

    pub fn bits(&self) -> u8 {
        self.permissions.as_int()
    }
}

/// A resource type node with its ACL entries and child resource types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAclTree {
    resource_name: ResourceName,
    entries: HashMap<Principal, Acl>,
    children: HashMap<ResourceName, ResourceAclTree>,
}

impl ResourceAclTree {
    pub fn new(resource_name: impl Into<ResourceName>) -> Self {
        Self {
            resource_name: resource_name.into(),
            entries: HashMap::new(),
            children: HashMap::new(),
        }
    }

    /// Adds an entry, replacing any existing entry for the same principal.
    #[must_use]
    pub fn with_entry(mut self, acl: Acl) -> Self {
        self.add_entry(acl);
        self
    }

    pub fn add_entry(&mut self, acl: Acl) {
        self.entries.insert(acl.principal.clone(), acl);
    }

    /// Adds a child, replacing any existing child with the same name.
    #[must_use]
    pub fn with_child(mut self, child: ResourceAclTree) -> Self {
        self.add_child(child);
        self
    }

    pub fn add_child(&mut self, child: ResourceAclTree) {
        self.children.insert(child.resource_name.clone(), child);
    }

    pub fn resource_name(&self) -> &ResourceName {
        &self.resource_name
    }

    /// Renames this node.
    ///
    /// The parent's child map is keyed by the old name and is not updated;
    /// callers that rename an attached node must re-insert it.
    pub fn rename(&mut self, resource_name: impl Into<ResourceName>) {
        self.resource_name = resource_name.into();
    }

    /// Returns the entry defined directly on this node for `principal`.
    pub fn lookup_entry(&self, principal: &str) -> Option<&Acl> {
        let entry = self.entries.get(principal);
        if entry.is_none() {
            trace!(
                resource = %self.resource_name,
                principal,
                "no ACL entry on node"
            );
        }
        entry
    }

    /// Returns the named child.
    ///
    /// A missing child fails with [`AuthzError::ResourceNotFound`].
    pub fn child(&self, name: &str) -> Result<&ResourceAclTree> {
        self.children.get(name).ok_or_else(|| {
            AuthzError::resource_not_found(
                name,
                format!("not a child of {}", self.resource_name),
            )
        })
    }

    pub fn contains_child(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Acl> {
        self.entries.values()
    }

    pub fn children(&self) -> impl Iterator<Item = &ResourceAclTree> {
        self.children.values()
    }

    pub fn clear_entries(&mut self) {
        self.entries.clear();
    }

    /// Visits this node and every descendant, parents before children.
    pub(crate) fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ResourceAclTree)) {
        visit(self);
        for child in self.children.values() {
            child.walk(visit);
        }
    }
}
