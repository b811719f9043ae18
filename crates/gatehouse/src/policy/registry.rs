use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;

use gatehouse_types::ResourceName;

use super::{DefaultPolicy, Policy};
use crate::context::AuthorizationContext;
use crate::error::{AuthzError, Result};
use crate::resource::ProtectedResource;

type Factory =
    Box<dyn Fn(&dyn Any, &AuthorizationContext) -> Option<Box<dyn Policy>> + Send + Sync>;

struct Binding {
    factory: Factory,
    resource_type: &'static str,
}

/// Maps resource names to policy factories.
///
/// Filled once at startup and shared read-only afterwards. Resource names
/// without a binding get [`DefaultPolicy`].
#[derive(Default)]
pub struct PolicyRegistry {
    bindings: HashMap<ResourceName, Binding>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to a factory for resources of concrete type `R`.
    ///
    /// A later binding for the same name replaces the earlier one.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatehouse::{ConfigurableResource, DefaultPolicy, PolicyRegistry};
    ///
    /// let registry = PolicyRegistry::new()
    ///     .bind::<ConfigurableResource, _>("Contract", |_, _| DefaultPolicy);
    /// assert!(registry.is_bound("Contract"));
    /// ```
    #[must_use]
    pub fn bind<R, P>(
        mut self,
        name: impl Into<ResourceName>,
        factory: impl Fn(&R, &AuthorizationContext) -> P + Send + Sync + 'static,
    ) -> Self
    where
        R: ProtectedResource,
        P: Policy + 'static,
    {
        let factory: Factory = Box::new(move |resource, ctx| {
            resource
                .downcast_ref::<R>()
                .map(|r| Box::new(factory(r, ctx)) as Box<dyn Policy>)
        });
        self.bindings.insert(
            name.into(),
            Binding {
                factory,
                resource_type: type_name::<R>(),
            },
        );
        self
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Instantiates the policy for one resource occurrence.
    ///
    /// Fails with [`AuthzError::PolicyBinding`] when the factory bound to
    /// `name` expects a different concrete resource type.
    pub fn policy_for(
        &self,
        name: &ResourceName,
        resource: &dyn ProtectedResource,
        ctx: &AuthorizationContext,
    ) -> Result<Box<dyn Policy>> {
        let Some(binding) = self.bindings.get(name) else {
            return Ok(Box::new(DefaultPolicy));
        };

        let resource: &dyn Any = resource;
        (binding.factory)(resource, ctx).ok_or_else(|| AuthzError::PolicyBinding {
            resource: name.to_string(),
            reason: format!("factory expects {}", binding.resource_type),
        })
    }
}

impl fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.bindings
                    .iter()
                    .map(|(name, binding)| (name, binding.resource_type)),
            )
            .finish()
    }
}
