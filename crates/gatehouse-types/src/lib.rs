//! # gatehouse-types: Core types for `Gatehouse`
//!
//! Shared identifiers used across the `Gatehouse` crates:
//! - Tenancy ([`TenantKey`])
//! - Access principals ([`Principal`])
//! - Protected resource names ([`ResourceName`])
//! - Permission-string parsing strictness ([`ParseMode`])
//!
//! All identifiers are thin wrappers over `String`. They implement
//! `Borrow<str>` so maps keyed by them can be queried with a plain `&str`.

use std::{
    borrow::Borrow,
    fmt::{Debug, Display},
};

use serde::{Deserialize, Serialize};

// ============================================================================
// Identifiers - string newtypes
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns true if the value is empty or whitespace only.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Key identifying one tenant (product or deployment) whose ACL
    /// definitions are loaded and cached together.
    TenantKey
);

string_id!(
    /// Name of whoever is accessing a resource: a role, a group, or a
    /// dynamically computed relationship such as `the-creator`.
    Principal
);

string_id!(
    /// Canonical name of a protected resource type, used both as the ACL
    /// tree key and as the policy binding key.
    ResourceName
);

// ============================================================================
// Parse mode
// ============================================================================

/// How strictly 5-character permission strings (`irwcd`) are parsed.
///
/// | Mode    | Length      | Unexpected character |
/// |---------|-------------|----------------------|
/// | Strict  | exactly 5   | rejected             |
/// | Lenient | at least 5  | treated as flag-off  |
///
/// Lenient parsing is kept for ACL definitions written against older
/// tooling that tolerated arbitrary filler characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParseMode {
    #[default]
    Strict,
    Lenient,
}
