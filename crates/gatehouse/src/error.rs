//! Error types for authorization.

use thiserror::Error;

/// Errors raised while resolving permissions.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// The resource path does not match any configured hierarchy node.
    ///
    /// Callers may treat this as "no policy configured"; it is not a
    /// security event.
    #[error("Resource not found: {resource} ({reason})")]
    ResourceNotFound { resource: String, reason: String },

    /// The request itself is not acceptable: missing context fields,
    /// facade misuse, or a policy hook that produced no result.
    #[error("Illegal authorization: {0}")]
    IllegalAuthorization(String),

    /// The ACL definition for a tenant could not be loaded.
    #[error("Policy store for tenant '{tenant}' failed to load: {reason}")]
    PolicyLoad { tenant: String, reason: String },

    /// A resource instance or type has no discoverable name.
    #[error("Resource naming failed: {0}")]
    Naming(String),

    /// A registered policy factory does not accept the resource it was
    /// handed.
    #[error("Policy binding for '{resource}' failed: {reason}")]
    PolicyBinding { resource: String, reason: String },

    /// An ACL entry was constructed with invalid data.
    #[error("Invalid ACL entry: {0}")]
    InvalidAcl(String),

    /// A permission string could not be parsed.
    #[error("Invalid permission string {input:?}: {reason}")]
    InvalidPermissionString { input: String, reason: String },

    /// The background cache sweeper thread could not be started.
    #[error("Failed to start cache sweeper: {0}")]
    Sweeper(#[source] std::io::Error),
}

impl AuthzError {
    pub(crate) fn resource_not_found(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        AuthzError::ResourceNotFound {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn illegal(reason: impl Into<String>) -> Self {
        AuthzError::IllegalAuthorization(reason.into())
    }

    /// Returns whether this error should be treated as a possible bypass
    /// attempt and surfaced to alerting.
    pub fn is_security_event(&self) -> bool {
        matches!(self, AuthzError::IllegalAuthorization(_))
    }

    /// Returns whether the failure stems from deployment configuration
    /// rather than from the request.
    pub fn is_configuration_defect(&self) -> bool {
        matches!(
            self,
            AuthzError::PolicyLoad { .. }
                | AuthzError::Naming(_)
                | AuthzError::PolicyBinding { .. }
                | AuthzError::InvalidAcl(_)
                | AuthzError::InvalidPermissionString { .. }
        )
    }
}

/// Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_not_found_display() {
        let e = AuthzError::resource_not_found("Invoice", "no child of Project");
        assert_eq!(
            e.to_string(),
            "Resource not found: Invoice (no child of Project)"
        );
    }

    #[test]
    fn test_security_event_classification() {
        assert!(AuthzError::illegal("no roles").is_security_event());
        assert!(!AuthzError::resource_not_found("X", "missing").is_security_event());
        assert!(!AuthzError::Naming("anonymous".into()).is_security_event());
    }

    #[test]
    fn test_configuration_defect_classification() {
        let load = AuthzError::PolicyLoad {
            tenant: "7".into(),
            reason: "missing file".into(),
        };
        assert!(load.is_configuration_defect());
        assert!(AuthzError::Naming("anonymous".into()).is_configuration_defect());
        assert!(!AuthzError::illegal("no roles").is_configuration_defect());
        assert!(!AuthzError::resource_not_found("X", "missing").is_configuration_defect());
    }
}
