//! Protected resources and how they are named.
//!
//! Every element of a resource path must resolve to the name of a node in
//! the tenant's ACL tree. Instances name themselves through
//! [`ProtectedResource`]; a path may end with bare [`ResourceType`]
//! references when the caller asks about a type rather than an instance
//! (e.g. "may this user create tasks in this project?").

use std::any::Any;
use std::fmt;

use gatehouse_types::ResourceName;

use crate::error::{AuthzError, Result};

/// A domain object guarded by the ACL tree.
pub trait ProtectedResource: Any {
    /// The resource-type name used as the ACL tree node name.
    ///
    /// Returning `None` or a blank name fails naming with
    /// [`AuthzError::Naming`].
    fn resource_name(&self) -> Option<&str>;
}

/// A resource whose name is only known at runtime, e.g. a user-defined
/// business object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurableResource {
    name: String,
}

impl ConfigurableResource {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ProtectedResource for ConfigurableResource {
    fn resource_name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

/// A resource type without an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceType {
    name: ResourceName,
    configurable: bool,
}

impl ResourceType {
    /// A statically known resource type.
    pub fn named(name: impl Into<ResourceName>) -> Self {
        Self {
            name: name.into(),
            configurable: false,
        }
    }

    /// The type of a [`ConfigurableResource`]. Only usable as the trailing
    /// element of a path that also contains instances.
    pub fn configurable(name: impl Into<ResourceName>) -> Self {
        Self {
            name: name.into(),
            configurable: true,
        }
    }

    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    pub fn is_configurable(&self) -> bool {
        self.configurable
    }
}

/// One element of a resource path.
#[derive(Clone, Copy)]
pub enum ResourceRef<'a> {
    Instance(&'a dyn ProtectedResource),
    Type(&'a ResourceType),
}

impl<'a> ResourceRef<'a> {
    /// Returns the node name this element resolves to.
    pub fn resource_name(&self) -> Result<ResourceName> {
        let name = match self {
            ResourceRef::Instance(resource) => resource
                .resource_name()
                .ok_or_else(|| AuthzError::Naming("resource instance has no name".to_string()))?,
            ResourceRef::Type(ty) => ty.name().as_str(),
        };
        if name.trim().is_empty() {
            return Err(AuthzError::Naming("resource name is blank".to_string()));
        }
        Ok(ResourceName::from(name))
    }

    pub fn as_instance(&self) -> Option<&'a dyn ProtectedResource> {
        match self {
            ResourceRef::Instance(resource) => Some(*resource),
            ResourceRef::Type(_) => None,
        }
    }
}

impl fmt::Debug for ResourceRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceRef::Instance(resource) => f
                .debug_tuple("Instance")
                .field(&resource.resource_name())
                .finish(),
            ResourceRef::Type(ty) => f.debug_tuple("Type").field(ty).finish(),
        }
    }
}

impl<'a> From<&'a ResourceType> for ResourceRef<'a> {
    fn from(ty: &'a ResourceType) -> Self {
        ResourceRef::Type(ty)
    }
}

impl<'a, R: ProtectedResource> From<&'a R> for ResourceRef<'a> {
    fn from(resource: &'a R) -> Self {
        ResourceRef::Instance(resource)
    }
}
