//! Process-wide authorization entry point.

use std::sync::Arc;
use std::time::Duration;

use gatehouse_config::GatehouseConfig;
use gatehouse_types::ParseMode;
use tracing::{info, warn};

use crate::cache::{CacheSweeper, PolicyStoreLoader, StoreCache};
use crate::context::AuthorizationContext;
use crate::error::{AuthzError, Result};
use crate::permissions::PermissionSet;
use crate::policy::{PolicyMediator, PolicyRegistry};
use crate::resource::{ProtectedResource, ResourceRef, ResourceType};

/// Resolves permissions for requests against cached tenant policy stores.
///
/// Create one per process and share it. It owns the store cache, the
/// background sweeper (when enabled) and the policy registry.
///
/// # Example
///
/// ```
/// use gatehouse::{
///     Acl, AuthorizationContext, Authorizer, ConfigurableResource, PolicyRegistry,
///     PolicyStore, ResourceAclTree,
/// };
/// use gatehouse_types::{Principal, TenantKey};
///
/// let authorizer = Authorizer::new(
///     |_: &TenantKey| -> gatehouse::Result<PolicyStore> {
///         Ok(PolicyStore::new().with_root(
///             ResourceAclTree::new("Contract").with_entry(Acl::new("clerk", 0b01000)?),
///         ))
///     },
///     PolicyRegistry::new(),
/// );
///
/// let ctx = AuthorizationContext::new(
///     "acme",
///     "acct-1",
///     "user-1",
///     vec![TenantKey::from("acme")],
///     vec![Principal::from("clerk")],
/// )?;
/// let contract = ConfigurableResource::new("Contract");
/// let perms = authorizer.permissions_for(&contract, &ctx)?;
/// assert_eq!(perms.to_string(), "-r---");
/// # Ok::<(), gatehouse::AuthzError>(())
/// ```
#[derive(Debug)]
pub struct Authorizer {
    cache: Arc<StoreCache>,
    sweeper: Option<CacheSweeper>,
    registry: PolicyRegistry,
    parse_mode: ParseMode,
}

impl Authorizer {
    /// Creates an authorizer without a background sweeper.
    pub fn new(loader: impl PolicyStoreLoader + 'static, registry: PolicyRegistry) -> Self {
        Self {
            cache: Arc::new(StoreCache::new(loader)),
            sweeper: None,
            registry,
            parse_mode: ParseMode::default(),
        }
    }

    /// Creates an authorizer from configuration.
    ///
    /// The sweep interval is read once here; later configuration changes
    /// need a new authorizer.
    pub fn from_config(
        config: &GatehouseConfig,
        loader: impl PolicyStoreLoader + 'static,
        registry: PolicyRegistry,
    ) -> Result<Self> {
        let mut authorizer = Self::new(loader, registry);
        authorizer.parse_mode = config.permissions.parse_mode;

        if config.cache.sweeper_enabled {
            let interval = config.cache.sweep_interval();
            if interval.is_zero() {
                return Err(AuthzError::illegal("cache sweep interval must be positive"));
            }
            authorizer.sweeper = Some(CacheSweeper::spawn(
                Arc::clone(&authorizer.cache),
                interval,
            )?);
        }

        info!(
            sweeper = authorizer.sweeper.is_some(),
            policies = authorizer.registry.len(),
            parse_mode = ?authorizer.parse_mode,
            "authorizer ready"
        );
        Ok(authorizer)
    }

    pub fn cache(&self) -> &Arc<StoreCache> {
        &self.cache
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    /// The configured strictness for permission strings, for loaders that
    /// read ACL definitions from text.
    pub fn parse_mode(&self) -> ParseMode {
        self.parse_mode
    }

    /// The sweep interval, if a sweeper is running.
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweeper.as_ref().map(CacheSweeper::interval)
    }

    /// Permissions on the leaf of a resource path (root first), with every
    /// instance's policy applied.
    pub fn permissions(
        &self,
        resources: &[ResourceRef<'_>],
        ctx: &AuthorizationContext,
    ) -> Result<PermissionSet> {
        if resources.is_empty() {
            return Err(self.denied(ctx, "no resources to authorize"));
        }

        let store = self.cache.get_store(ctx.tenant())?;
        PolicyMediator::new(&self.registry, ctx)
            .mediate(resources, &store)
            .inspect_err(|e| self.report(ctx, e))
    }

    /// Permissions on a single root resource instance.
    pub fn permissions_for(
        &self,
        resource: &dyn ProtectedResource,
        ctx: &AuthorizationContext,
    ) -> Result<PermissionSet> {
        self.permissions(&[ResourceRef::Instance(resource)], ctx)
    }

    /// Permissions on a root resource type, from the user's roles alone.
    ///
    /// No policy runs, so dynamic principals and groups never apply.
    /// Configurable types have no standalone ACL and are rejected. The
    /// resolved path is recorded on `ctx`, which cannot be reused.
    pub fn permissions_for_type(
        &self,
        ty: &ResourceType,
        ctx: &AuthorizationContext,
    ) -> Result<PermissionSet> {
        if ty.is_configurable() {
            return Err(self.denied(
                ctx,
                format!("configurable type {} needs an owning resource", ty.name()),
            ));
        }

        let name = ResourceRef::Type(ty).resource_name()?;
        ctx.set_resource_path(vec![name])?;
        let store = self.cache.get_store(ctx.tenant())?;
        Ok(store.resolve(ctx.resource_path(), ctx.roles())?.permissions)
    }

    /// Permissions on resources of type `ty` that would live under the
    /// instance path `resources`, e.g. whether tasks may be created in a
    /// given project.
    pub fn permissions_within(
        &self,
        resources: &[ResourceRef<'_>],
        ty: &ResourceType,
        ctx: &AuthorizationContext,
    ) -> Result<PermissionSet> {
        if resources.is_empty() && ty.is_configurable() {
            return Err(self.denied(
                ctx,
                format!("configurable type {} needs an owning resource", ty.name()),
            ));
        }

        let mut path = resources.to_vec();
        path.push(ResourceRef::Type(ty));
        self.permissions(&path, ctx)
    }

    /// Stops the sweeper, if any. Cached stores stay usable.
    pub fn shutdown(&mut self) {
        if let Some(mut sweeper) = self.sweeper.take() {
            sweeper.shutdown();
        }
    }

    fn denied(&self, ctx: &AuthorizationContext, reason: impl Into<String>) -> AuthzError {
        let err = AuthzError::illegal(reason);
        self.report(ctx, &err);
        err
    }

    fn report(&self, ctx: &AuthorizationContext, err: &AuthzError) {
        if err.is_security_event() {
            warn!(
                tenant = %ctx.tenant(),
                account_id = %ctx.account_id(),
                user_id = %ctx.user_id(),
                error = %err,
                "illegal authorization attempt"
            );
        }
    }
}
