//! Tenant policy store and the permission resolution algorithm.
//!
//! # Resolution
//!
//! A request names a path of resource types from a root down to a leaf,
//! e.g. `Project -> ToDoItem`, and a set of principals. For each principal
//! the deepest node on the path that defines an entry for it supplies that
//! principal's contribution; ancestors only fill in principals the deeper
//! nodes left undefined. The contributions of all principals are then ORed.
//!
//! ```text
//! Project    manager: -r---   teamleader: -r---
//!   ToDoItem                  teamleader: -rwc-
//!
//! path [Project, ToDoItem], principals {manager, teamleader}
//!   teamleader -> -rwc-  (ToDoItem overrides Project)
//!   manager    -> -r---  (inherited from Project)
//!   result     -> -rwc-
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};

use gatehouse_types::{Principal, ResourceName};
use tracing::debug;

use crate::acl::ResourceAclTree;
use crate::error::{AuthzError, Result};
use crate::permissions::PermissionSet;

/// Raw outcome of resolving a path, before any policy hook runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Union of every principal's contribution.
    pub permissions: PermissionSet,
    /// The permission set each principal contributed. Principals with no
    /// entry anywhere on the path are absent.
    pub contributions: BTreeMap<Principal, PermissionSet>,
}

/// All ACL trees of one tenant, keyed by root resource name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyStore {
    roots: HashMap<ResourceName, ResourceAclTree>,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_root(mut self, root: ResourceAclTree) -> Self {
        self.add_root(root);
        self
    }

    /// Registers a root tree, replacing any root with the same name.
    pub fn add_root(&mut self, root: ResourceAclTree) {
        self.roots.insert(root.resource_name().clone(), root);
    }

    pub fn root(&self, name: &str) -> Option<&ResourceAclTree> {
        self.roots.get(name)
    }

    pub fn roots(&self) -> impl Iterator<Item = &ResourceAclTree> {
        self.roots.values()
    }

    /// Returns every principal with an entry anywhere in the store, sorted
    /// and without duplicates.
    pub fn defined_principals(&self) -> Vec<Principal> {
        let mut principals = BTreeSet::new();
        for root in self.roots.values() {
            root.walk(&mut |node| {
                principals.extend(node.entries().map(|acl| acl.principal().clone()));
            });
        }
        principals.into_iter().collect()
    }

    /// Resolves `principals` against the resource path `path` (root first).
    ///
    /// An empty path or principal set resolves to no permissions. A path
    /// whose first element is not a root, or that names a missing child at
    /// any later hop, fails with [`AuthzError::ResourceNotFound`].
    pub fn resolve<S: AsRef<str>>(
        &self,
        path: &[S],
        principals: &[Principal],
    ) -> Result<Resolution> {
        let Some((first, rest)) = path.split_first() else {
            return Ok(Resolution::default());
        };

        let first = first.as_ref();
        let mut node = self.roots.get(first).ok_or_else(|| {
            AuthzError::resource_not_found(first, "no root resource with this name")
        })?;

        let mut visited = Vec::with_capacity(path.len());
        visited.push(node);
        for name in rest {
            node = node.child(name.as_ref())?;
            visited.push(node);
        }

        debug!(
            path = %visited
                .iter()
                .map(|n| n.resource_name().as_str())
                .collect::<Vec<_>>()
                .join("/"),
            principals = principals.len(),
            "resolving permissions"
        );

        let mut contributions = BTreeMap::new();
        for node in visited.iter().rev() {
            for principal in principals {
                if contributions.contains_key(principal) {
                    continue;
                }
                if let Some(acl) = node.lookup_entry(principal.as_str()) {
                    contributions.insert(principal.clone(), acl.permissions());
                }
            }
        }

        let permissions = contributions
            .values()
            .fold(PermissionSet::empty(), |acc, perms| acc.combine(*perms));

        Ok(Resolution {
            permissions,
            contributions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::Acl;

    fn acl(principal: &str, perms: &str) -> Acl {
        Acl::with_permissions(principal, perms.parse().unwrap()).unwrap()
    }

    fn principals(names: &[&str]) -> Vec<Principal> {
        names.iter().map(|n| Principal::from(*n)).collect()
    }

    fn project_store() -> PolicyStore {
        PolicyStore::new().with_root(
            ResourceAclTree::new("Project")
                .with_entry(acl("manager", "-r---"))
                .with_entry(acl("teamleader", "-r---"))
                .with_child(
                    ResourceAclTree::new("ToDoItem").with_entry(acl("teamleader", "-rwc-")),
                ),
        )
    }

    #[test]
    fn test_deeper_entry_overrides_ancestor() {
        let store = project_store();
        let resolution = store
            .resolve(&["Project", "ToDoItem"], &principals(&["teamleader"]))
            .unwrap();

        assert_eq!(resolution.permissions.to_string(), "-rwc-");
    }

    #[test]
    fn test_union_across_principals() {
        let store = project_store();
        let resolution = store
            .resolve(
                &["Project", "ToDoItem"],
                &principals(&["manager", "teamleader"]),
            )
            .unwrap();

        assert_eq!(resolution.permissions.to_string(), "-rwc-");
        assert_eq!(
            resolution.contributions[&Principal::from("manager")].to_string(),
            "-r---"
        );
        assert_eq!(
            resolution.contributions[&Principal::from("teamleader")].to_string(),
            "-rwc-"
        );
    }

    #[test]
    fn test_ancestor_fills_gap() {
        let store = project_store();
        let resolution = store
            .resolve(&["Project", "ToDoItem"], &principals(&["manager"]))
            .unwrap();

        assert_eq!(resolution.permissions.to_string(), "-r---");
    }

    #[test]
    fn test_unknown_principal_contributes_nothing() {
        let store = project_store();
        let resolution = store
            .resolve(&["Project"], &principals(&["intern"]))
            .unwrap();

        assert!(resolution.permissions.is_empty());
        assert!(resolution.contributions.is_empty());
    }

    #[test]
    fn test_empty_path_and_principals() {
        let store = project_store();
        let empty: [&str; 0] = [];

        assert!(
            store
                .resolve(&empty, &principals(&["manager"]))
                .unwrap()
                .permissions
                .is_empty()
        );
        assert!(
            store
                .resolve(&["Project"], &[])
                .unwrap()
                .permissions
                .is_empty()
        );
    }

    #[test]
    fn test_missing_root() {
        let store = project_store();
        let err = store
            .resolve(&["Invoice"], &principals(&["manager"]))
            .unwrap_err();
        assert!(matches!(err, AuthzError::ResourceNotFound { .. }));
    }

    #[test]
    fn test_missing_hop_fails_whole_path() {
        let store = project_store();
        let err = store
            .resolve(
                &["Project", "Invoice", "ToDoItem"],
                &principals(&["teamleader"]),
            )
            .unwrap_err();
        assert!(matches!(err, AuthzError::ResourceNotFound { ref resource, .. } if resource == "Invoice"));
    }

    #[test]
    fn test_defined_principals_sorted_unique() {
        let store = project_store().with_root(
            ResourceAclTree::new("Account")
                .with_entry(acl("auditor", "-r---"))
                .with_entry(acl("manager", "irwcd")),
        );

        assert_eq!(
            store.defined_principals(),
            principals(&["auditor", "manager", "teamleader"])
        );
    }

    #[test]
    fn test_root_accessors() {
        let store = project_store();
        assert!(store.root("Project").is_some());
        assert!(store.root("ToDoItem").is_none());
        assert_eq!(store.roots().count(), 1);
    }
}
