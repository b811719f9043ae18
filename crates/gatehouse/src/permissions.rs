//! Permission flags and the immutable permission set.
//!
//! A [`PermissionSet`] packs five independent flags into one byte:
//!
//! | Flag    | Bit | Letter |
//! |---------|-----|--------|
//! | Create  | 4   | `i`    |
//! | Read    | 3   | `r`    |
//! | Write   | 2   | `w`    |
//! | Control | 1   | `c`    |
//! | Delete  | 0   | `d`    |
//!
//! The string form lists the letters in that order with `-` for an unset
//! flag, so `-rwc-` grants read, write and control.

use std::fmt::{self, Display};
use std::ops::BitOr;
use std::str::FromStr;

use gatehouse_types::ParseMode;
use serde::{Deserialize, Serialize};

use crate::error::{AuthzError, Result};

/// Number of characters in the string form.
pub const PERMISSION_STRING_LEN: usize = 5;

/// A single access right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Create new instances under the resource.
    Create,

    /// Read the resource.
    Read,

    /// Modify the resource.
    Write,

    /// Administer the resource (assign, transfer, change state).
    Control,

    /// Delete the resource.
    ///
    /// Callers conventionally treat delete as covering the resource's
    /// children too. Nothing in this crate cascades; the convention is
    /// enforced, if at all, by the application performing the deletion.
    Delete,
}

impl Permission {
    /// All permissions in string-position order.
    pub const ALL: [Permission; PERMISSION_STRING_LEN] = [
        Permission::Create,
        Permission::Read,
        Permission::Write,
        Permission::Control,
        Permission::Delete,
    ];

    /// Returns the bit mask for this permission.
    pub const fn bit(self) -> u8 {
        match self {
            Permission::Create => 1 << 4,
            Permission::Read => 1 << 3,
            Permission::Write => 1 << 2,
            Permission::Control => 1 << 1,
            Permission::Delete => 1,
        }
    }

    /// Returns the letter used in the string form.
    pub const fn letter(self) -> char {
        match self {
            Permission::Create => 'i',
            Permission::Read => 'r',
            Permission::Write => 'w',
            Permission::Control => 'c',
            Permission::Delete => 'd',
        }
    }
}

/// Immutable set of access rights.
///
/// Combining sets is a bitwise OR: a combination never loses a flag held by
/// either side. Weakening a resolved set is only possible inside a policy
/// `finalize` hook, through [`MutablePermissionSet`](crate::policy::MutablePermissionSet).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionSet(u8);

impl PermissionSet {
    const MASK: u8 = 0b1_1111;

    /// Creates a set with no flags.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Creates a set with every flag.
    pub const fn all() -> Self {
        Self(Self::MASK)
    }

    /// Creates a set from its integer form. Bits above bit 4 are ignored.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::MASK)
    }

    /// Creates a set holding exactly the given permissions.
    pub fn of(permissions: &[Permission]) -> Self {
        Self(permissions.iter().fold(0, |acc, p| acc | p.bit()))
    }

    /// Returns the integer form.
    pub const fn as_int(self) -> u8 {
        self.0
    }

    pub const fn contains(self, permission: Permission) -> bool {
        self.0 & permission.bit() == permission.bit()
    }

    pub const fn can_create(self) -> bool {
        self.contains(Permission::Create)
    }

    pub const fn can_read(self) -> bool {
        self.contains(Permission::Read)
    }

    pub const fn can_write(self) -> bool {
        self.contains(Permission::Write)
    }

    pub const fn can_control(self) -> bool {
        self.contains(Permission::Control)
    }

    pub const fn can_delete(self) -> bool {
        self.contains(Permission::Delete)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the union of both sets.
    #[must_use]
    pub const fn combine(self, other: PermissionSet) -> PermissionSet {
        Self(self.0 | other.0)
    }

    /// Returns whether every flag in `self` is also in `other`.
    pub const fn is_subset_of(self, other: PermissionSet) -> bool {
        self.0 & !other.0 == 0
    }

    /// Iterates over the granted permissions in string-position order.
    pub fn iter(self) -> impl Iterator<Item = Permission> {
        Permission::ALL.into_iter().filter(move |p| self.contains(*p))
    }

    /// Parses the 5-character string form.
    ///
    /// Strings shorter than five characters are always rejected. In
    /// [`ParseMode::Strict`] the string must be exactly five characters and
    /// each position must hold its letter or `-`. In [`ParseMode::Lenient`]
    /// extra trailing characters are ignored and any character other than
    /// the expected letter leaves that flag unset.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatehouse::PermissionSet;
    /// use gatehouse_types::ParseMode;
    ///
    /// let perms = PermissionSet::parse("-rwc-", ParseMode::Strict)?;
    /// assert!(perms.can_write());
    /// assert!(!perms.can_delete());
    ///
    /// let legacy = PermissionSet::parse("xr??d", ParseMode::Lenient)?;
    /// assert_eq!(legacy.to_string(), "-r--d");
    /// # Ok::<(), gatehouse::AuthzError>(())
    /// ```
    pub fn parse(input: &str, mode: ParseMode) -> Result<Self> {
        let chars: Vec<char> = input.chars().collect();

        if chars.len() < PERMISSION_STRING_LEN {
            return Err(invalid(input, "expected 5 characters"));
        }
        if mode == ParseMode::Strict && chars.len() != PERMISSION_STRING_LEN {
            return Err(invalid(input, "expected exactly 5 characters"));
        }

        let mut bits = 0;
        for (position, (c, permission)) in chars.iter().zip(Permission::ALL).enumerate() {
            if *c == permission.letter() {
                bits |= permission.bit();
            } else if mode == ParseMode::Strict && *c != '-' {
                return Err(invalid(
                    input,
                    format!(
                        "unexpected '{c}' at position {position}, expected '{}' or '-'",
                        permission.letter()
                    ),
                ));
            }
        }

        Ok(Self(bits))
    }
}

fn invalid(input: &str, reason: impl Into<String>) -> AuthzError {
    AuthzError::InvalidPermissionString {
        input: input.to_string(),
        reason: reason.into(),
    }
}

impl Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for permission in Permission::ALL {
            let c = if self.contains(permission) {
                permission.letter()
            } else {
                '-'
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl FromStr for PermissionSet {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s, ParseMode::Strict)
    }
}

impl TryFrom<String> for PermissionSet {
    type Error = AuthzError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PermissionSet> for String {
    fn from(perms: PermissionSet) -> Self {
        perms.to_string()
    }
}

impl BitOr for PermissionSet {
    type Output = PermissionSet;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.combine(rhs)
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self(iter.into_iter().fold(0, |acc, p| acc | p.bit()))
    }
}
