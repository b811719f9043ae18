use std::fmt;

use crate::permissions::{Permission, PermissionSet};

/// A permission set that can only lose flags.
///
/// Handed to [`Policy::finalize`](super::Policy::finalize). Only the policy
/// module can create one, so a hook cannot forge a stronger result than the
/// one it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutablePermissionSet(PermissionSet);

impl MutablePermissionSet {
    pub(super) fn new(perms: PermissionSet) -> Self {
        Self(perms)
    }

    fn unset(&mut self, permission: Permission) -> &mut Self {
        self.0 = PermissionSet::from_bits(self.0.as_int() & !permission.bit());
        self
    }

    pub fn unset_create(&mut self) -> &mut Self {
        self.unset(Permission::Create)
    }

    pub fn unset_read(&mut self) -> &mut Self {
        self.unset(Permission::Read)
    }

    pub fn unset_write(&mut self) -> &mut Self {
        self.unset(Permission::Write)
    }

    pub fn unset_control(&mut self) -> &mut Self {
        self.unset(Permission::Control)
    }

    pub fn unset_delete(&mut self) -> &mut Self {
        self.unset(Permission::Delete)
    }

    /// Clears every flag except read.
    pub fn set_read_only(&mut self) -> &mut Self {
        self.0 = PermissionSet::from_bits(self.0.as_int() & Permission::Read.bit());
        self
    }

    pub fn can_create(&self) -> bool {
        self.0.can_create()
    }

    pub fn can_read(&self) -> bool {
        self.0.can_read()
    }

    pub fn can_write(&self) -> bool {
        self.0.can_write()
    }

    pub fn can_control(&self) -> bool {
        self.0.can_control()
    }

    pub fn can_delete(&self) -> bool {
        self.0.can_delete()
    }

    pub fn as_int(&self) -> u8 {
        self.0.as_int()
    }

    pub(super) fn freeze(self) -> PermissionSet {
        self.0
    }
}

impl fmt::Display for MutablePermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unset_chain() {
        let mut perms = MutablePermissionSet::new(PermissionSet::all());
        perms.unset_create().unset_delete();

        assert_eq!(perms.to_string(), "-rwc-");
        assert!(!perms.can_create());
        assert!(perms.can_write());
    }

    #[test]
    fn test_set_read_only() {
        let mut perms = MutablePermissionSet::new("irwcd".parse().unwrap());
        perms.set_read_only();
        assert_eq!(perms.to_string(), "-r---");

        let mut none = MutablePermissionSet::new("i-w--".parse().unwrap());
        none.set_read_only();
        assert_eq!(none.as_int(), 0);
    }

    proptest! {
        /// Property: no sequence of operations adds a flag
        #[test]
        fn prop_never_strengthens(bits in 0u8..32, ops in prop::collection::vec(0u8..6, 0..10)) {
            let start = PermissionSet::from_bits(bits);
            let mut perms = MutablePermissionSet::new(start);
            for op in ops {
                match op {
                    0 => perms.unset_create(),
                    1 => perms.unset_read(),
                    2 => perms.unset_write(),
                    3 => perms.unset_control(),
                    4 => perms.unset_delete(),
                    _ => perms.set_read_only(),
                };
            }
            prop_assert!(perms.freeze().is_subset_of(start));
        }
    }
}
