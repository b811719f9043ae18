//! Drives one request through naming, resolution and the policy hooks.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use gatehouse_types::{Principal, ResourceName};
use tracing::{debug, error};

use super::{MutablePermissionSet, Policy, PolicyRegistry, PolicyScope};
use crate::context::AuthorizationContext;
use crate::error::{AuthzError, Result};
use crate::permissions::PermissionSet;
use crate::resource::ResourceRef;
use crate::store::PolicyStore;

/// Coordinates the policies of one request.
///
/// The mediator records the dynamic principals and resolved path on the
/// context, so each context can be mediated once.
pub struct PolicyMediator<'a> {
    registry: &'a PolicyRegistry,
    ctx: &'a AuthorizationContext,
}

impl<'a> PolicyMediator<'a> {
    pub fn new(registry: &'a PolicyRegistry, ctx: &'a AuthorizationContext) -> Self {
        Self { registry, ctx }
    }

    /// Resolves `resources` (root first) against `store` and runs every
    /// instance's `finalize` hook, leaf to root.
    ///
    /// Type references may only trail the path; an instance after a type
    /// fails with [`AuthzError::Naming`]. A hook that fails or panics fails
    /// the request with [`AuthzError::IllegalAuthorization`].
    pub fn mediate(&self, resources: &[ResourceRef<'_>], store: &PolicyStore) -> Result<PermissionSet> {
        let mut path = Vec::with_capacity(resources.len());
        let mut policies: Vec<(ResourceName, Box<dyn Policy>)> = Vec::with_capacity(resources.len());
        let mut dynamic: Vec<Principal> = Vec::new();
        let mut seen_type = false;

        for resource in resources {
            let name = resource.resource_name()?;
            match resource.as_instance() {
                Some(instance) => {
                    if seen_type {
                        return Err(AuthzError::Naming(format!(
                            "instance {name} follows a type reference"
                        )));
                    }
                    let policy = self.guarded(&name, "binding", || {
                        self.registry.policy_for(&name, instance, self.ctx)
                    })?;
                    let granted = self.guarded(&name, "dynamic_principals", || {
                        Ok(policy.dynamic_principals())
                    })?;
                    for principal in granted {
                        if !dynamic.contains(&principal) {
                            dynamic.push(principal);
                        }
                    }
                    policies.push((name.clone(), policy));
                }
                None => seen_type = true,
            }
            path.push(name);
        }

        let principals = self.principals(&dynamic);
        self.ctx.set_dynamic_principals(dynamic)?;
        self.ctx.set_resource_path(path)?;

        let resolution = store.resolve(self.ctx.resource_path(), &principals)?;
        debug!(
            tenant = %self.ctx.tenant(),
            user_id = %self.ctx.user_id(),
            raw = %resolution.permissions,
            policies = policies.len(),
            "resolved raw permissions"
        );

        let scope = PolicyScope {
            context: self.ctx,
            path: self.ctx.resource_path(),
            contributions: &resolution.contributions,
            dynamic_principals: self.ctx.dynamic_principals(),
        };

        let mut perms = MutablePermissionSet::new(resolution.permissions);
        for (name, policy) in policies.iter().rev() {
            perms = self.guarded(name, "finalize", || {
                policy.finalize(perms, &scope).map_err(|e| {
                    error!(
                        tenant = %self.ctx.tenant(),
                        user_id = %self.ctx.user_id(),
                        resource = %name,
                        reason = %e,
                        "policy finalize failed, denying request"
                    );
                    AuthzError::illegal(format!("policy for {name} produced no result: {e}"))
                })
            })?;
        }

        Ok(perms.freeze())
    }

    /// Runs one policy step, turning a panic into a denied request.
    fn guarded<T>(
        &self,
        name: &ResourceName,
        stage: &str,
        step: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        panic::catch_unwind(AssertUnwindSafe(step)).unwrap_or_else(|payload| {
            let reason = panic_reason(payload.as_ref());
            error!(
                tenant = %self.ctx.tenant(),
                user_id = %self.ctx.user_id(),
                resource = %name,
                stage,
                reason,
                "policy panicked, denying request"
            );
            Err(AuthzError::illegal(format!(
                "policy for {name} panicked in {stage}: {reason}"
            )))
        })
    }

    /// Dynamic principals, then roles, then groups when the path granted any
    /// dynamic principal. Duplicates keep their first position.
    fn principals(&self, dynamic: &[Principal]) -> Vec<Principal> {
        let groups: &[Principal] = if dynamic.is_empty() {
            &[]
        } else {
            self.ctx.groups()
        };

        let mut principals: Vec<Principal> = Vec::new();
        for principal in dynamic.iter().chain(self.ctx.roles()).chain(groups) {
            if !principals.contains(principal) {
                principals.push(principal.clone());
            }
        }
        principals
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::{Acl, ResourceAclTree};
    use crate::policy::PolicyError;
    use crate::resource::{ConfigurableResource, ProtectedResource, ResourceType};
    use gatehouse_types::TenantKey;
    use std::sync::{Arc, Mutex};

    struct Project;

    impl ProtectedResource for Project {
        fn resource_name(&self) -> Option<&str> {
            Some("Project")
        }
    }

    struct ToDoItem;

    impl ProtectedResource for ToDoItem {
        fn resource_name(&self) -> Option<&str> {
            Some("ToDoItem")
        }
    }

    /// Records the order hooks run in and returns a fixed result.
    struct Recording {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        outcome: fn(MutablePermissionSet) -> std::result::Result<MutablePermissionSet, PolicyError>,
        grants: Vec<Principal>,
    }

    impl Policy for Recording {
        fn dynamic_principals(&self) -> Vec<Principal> {
            self.grants.clone()
        }

        fn finalize(
            &self,
            perms: MutablePermissionSet,
            _scope: &PolicyScope<'_>,
        ) -> std::result::Result<MutablePermissionSet, PolicyError> {
            self.log.lock().unwrap().push(self.label);
            (self.outcome)(perms)
        }
    }

    fn acl(principal: &str, perms: &str) -> Acl {
        Acl::with_permissions(principal, perms.parse().unwrap()).unwrap()
    }

    fn store() -> PolicyStore {
        PolicyStore::new().with_root(
            ResourceAclTree::new("Project")
                .with_entry(acl("member", "-r---"))
                .with_entry(acl("owner", "irwcd"))
                .with_entry(acl("engineering", "-rw--"))
                .with_child(ResourceAclTree::new("ToDoItem").with_entry(acl("member", "-rw--"))),
        )
    }

    fn ctx() -> AuthorizationContext {
        AuthorizationContext::new(
            "acme",
            "acct-1",
            "alice",
            vec![TenantKey::from("acme")],
            vec![Principal::from("member")],
        )
        .unwrap()
        .with_groups(vec![Principal::from("engineering")])
    }

    #[test]
    fn test_default_policies_return_raw_permissions() {
        let registry = PolicyRegistry::new();
        let ctx = ctx();
        let perms = PolicyMediator::new(&registry, &ctx)
            .mediate(&[ResourceRef::from(&Project), ResourceRef::from(&ToDoItem)], &store())
            .unwrap();

        assert_eq!(perms.to_string(), "-rw--");
        assert_eq!(
            ctx.resource_path(),
            &[ResourceName::from("Project"), ResourceName::from("ToDoItem")]
        );
    }

    #[test]
    fn test_finalize_runs_leaf_to_root() {
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::default();
        let (project_log, item_log) = (Arc::clone(&log), Arc::clone(&log));

        let registry = PolicyRegistry::new()
            .bind::<Project, _>("Project", move |_, _| Recording {
                label: "Project",
                log: Arc::clone(&project_log),
                outcome: |mut p| {
                    p.set_read_only();
                    Ok(p)
                },
                grants: Vec::new(),
            })
            .bind::<ToDoItem, _>("ToDoItem", move |_, _| Recording {
                label: "ToDoItem",
                log: Arc::clone(&item_log),
                outcome: Ok,
                grants: Vec::new(),
            });

        let ctx = ctx();
        let perms = PolicyMediator::new(&registry, &ctx)
            .mediate(&[ResourceRef::from(&Project), ResourceRef::from(&ToDoItem)], &store())
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["ToDoItem", "Project"]);
        // Root runs last, so its read-only downgrade wins
        assert_eq!(perms.to_string(), "-r---");
    }

    #[test]
    fn test_failing_finalize_fails_closed() {
        let registry = PolicyRegistry::new().bind::<Project, _>("Project", |_, _| Recording {
            label: "Project",
            log: Arc::default(),
            outcome: |_| Err(PolicyError::new("state unknown")),
            grants: Vec::new(),
        });

        let ctx = ctx();
        let err = PolicyMediator::new(&registry, &ctx)
            .mediate(&[ResourceRef::from(&Project)], &store())
            .unwrap_err();

        assert!(err.is_security_event());
        assert!(err.to_string().contains("state unknown"));
    }

    struct Exploding {
        panic_in_grants: bool,
    }

    impl Policy for Exploding {
        fn dynamic_principals(&self) -> Vec<Principal> {
            assert!(!self.panic_in_grants, "grant lookup failed");
            Vec::new()
        }

        fn finalize(
            &self,
            _perms: MutablePermissionSet,
            _scope: &PolicyScope<'_>,
        ) -> std::result::Result<MutablePermissionSet, PolicyError> {
            panic!("order state corrupted");
        }
    }

    #[test]
    fn test_panicking_finalize_fails_closed() {
        let registry = PolicyRegistry::new()
            .bind::<Project, _>("Project", |_, _| Exploding { panic_in_grants: false });

        let ctx = ctx();
        let err = PolicyMediator::new(&registry, &ctx)
            .mediate(&[ResourceRef::from(&Project), ResourceRef::from(&ToDoItem)], &store())
            .unwrap_err();

        assert!(matches!(err, AuthzError::IllegalAuthorization(_)));
        assert!(err.to_string().contains("order state corrupted"));
    }

    #[test]
    fn test_panicking_dynamic_principals_fails_closed() {
        let registry = PolicyRegistry::new()
            .bind::<Project, _>("Project", |_, _| Exploding { panic_in_grants: true });

        let ctx = ctx();
        let err = PolicyMediator::new(&registry, &ctx)
            .mediate(&[ResourceRef::from(&Project)], &store())
            .unwrap_err();

        assert!(err.is_security_event());
        assert!(err.to_string().contains("grant lookup failed"));
    }

    #[test]
    fn test_panicking_factory_fails_closed() {
        let registry = PolicyRegistry::new().bind::<Project, _>("Project", |_, _| -> Recording {
            panic!("factory misconfigured")
        });

        let ctx = ctx();
        let err = PolicyMediator::new(&registry, &ctx)
            .mediate(&[ResourceRef::from(&Project)], &store())
            .unwrap_err();

        assert!(matches!(err, AuthzError::IllegalAuthorization(_)));
        assert!(err.to_string().contains("factory misconfigured"));
    }

    #[test]
    fn test_groups_only_with_dynamic_principal() {
        // Without dynamic principals, the engineering group's -rw-- on
        // Project is ignored.
        let registry = PolicyRegistry::new();
        let ctx_plain = ctx();
        let plain = PolicyMediator::new(&registry, &ctx_plain)
            .mediate(&[ResourceRef::from(&Project)], &store())
            .unwrap();
        assert_eq!(plain.to_string(), "-r---");

        let registry = PolicyRegistry::new().bind::<Project, _>("Project", |_, _| Recording {
            label: "Project",
            log: Arc::default(),
            outcome: Ok,
            grants: vec![Principal::from("owner"), Principal::from("owner")],
        });
        let ctx_owner = ctx();
        let owner = PolicyMediator::new(&registry, &ctx_owner)
            .mediate(&[ResourceRef::from(&Project)], &store())
            .unwrap();

        assert_eq!(owner, PermissionSet::all());
        assert_eq!(ctx_owner.dynamic_principals(), &[Principal::from("owner")]);
    }

    #[test]
    fn test_group_contributes_when_dynamic_present() {
        let registry = PolicyRegistry::new().bind::<Project, _>("Project", |_, _| Recording {
            label: "Project",
            log: Arc::default(),
            outcome: Ok,
            grants: vec![Principal::from("reviewer")],
        });
        let ctx = ctx();
        let perms = PolicyMediator::new(&registry, &ctx)
            .mediate(&[ResourceRef::from(&Project)], &store())
            .unwrap();

        // reviewer has no entry; member -r--- plus engineering -rw--
        assert_eq!(perms.to_string(), "-rw--");
    }

    #[test]
    fn test_trailing_type_reference() {
        let registry = PolicyRegistry::new();
        let ctx = ctx();
        let item = ResourceType::named("ToDoItem");

        let perms = PolicyMediator::new(&registry, &ctx)
            .mediate(&[ResourceRef::from(&Project), ResourceRef::from(&item)], &store())
            .unwrap();
        assert_eq!(perms.to_string(), "-rw--");
    }

    #[test]
    fn test_instance_after_type_is_naming_error() {
        let registry = PolicyRegistry::new();
        let ctx = ctx();
        let project = ResourceType::named("Project");

        let err = PolicyMediator::new(&registry, &ctx)
            .mediate(&[ResourceRef::from(&project), ResourceRef::from(&ToDoItem)], &store())
            .unwrap_err();
        assert!(matches!(err, AuthzError::Naming(_)));
    }

    #[test]
    fn test_context_cannot_be_reused() {
        let registry = PolicyRegistry::new();
        let ctx = ctx();
        let mediator = PolicyMediator::new(&registry, &ctx);

        mediator.mediate(&[ResourceRef::from(&Project)], &store()).unwrap();
        let err = mediator
            .mediate(&[ResourceRef::from(&Project)], &store())
            .unwrap_err();
        assert!(err.is_security_event());
    }

    #[test]
    fn test_missing_hop_propagates() {
        let registry = PolicyRegistry::new();
        let ctx = ctx();
        let contract = ConfigurableResource::new("Contract");

        let err = PolicyMediator::new(&registry, &ctx)
            .mediate(&[ResourceRef::from(&Project), ResourceRef::from(&contract)], &store())
            .unwrap_err();
        assert!(matches!(err, AuthzError::ResourceNotFound { .. }));
    }
}
