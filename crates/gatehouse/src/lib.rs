//! # gatehouse: Hierarchical ACL permission resolution
//!
//! Answers "what may this user do to this resource?" for multi-tenant
//! applications whose resources nest (projects contain tasks, tasks contain
//! notes):
//! - **ACL trees** per tenant, one node per resource type
//! - **Override by specificity**: the deepest entry for a principal wins
//! - **Union across principals**: a user holds the OR of all their principals
//! - **Policy hooks** that add dynamic principals and can only weaken results
//! - **Tenant store cache** flushed by a background sweeper
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Authorizer::permissions(path, ctx)          │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  PolicyMediator                              │
//! │  ├─ Name each resource on the path           │
//! │  ├─ Bind policies, gather dynamic principals │
//! │  └─ Principals = dynamic ∪ roles ∪ groups    │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  StoreCache ──► PolicyStore::resolve         │
//! │  - Deepest entry per principal               │
//! │  - OR across principals                      │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Policy::finalize, leaf to root              │
//! │  - May only unset flags                      │
//! │  - Any failure denies the request            │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Permissions
//!
//! | Letter | Flag    | Bit |
//! |--------|---------|-----|
//! | `i`    | Create  | 4   |
//! | `r`    | Read    | 3   |
//! | `w`    | Write   | 2   |
//! | `c`    | Control | 1   |
//! | `d`    | Delete  | 0   |
//!
//! ## Example
//!
//! ```
//! use gatehouse::{Acl, PolicyStore, ResourceAclTree};
//! use gatehouse_types::Principal;
//!
//! let store = PolicyStore::new().with_root(
//!     ResourceAclTree::new("Project")
//!         .with_entry(Acl::new("manager", 0b01000)?)
//!         .with_entry(Acl::new("teamleader", 0b01000)?)
//!         .with_child(
//!             ResourceAclTree::new("ToDoItem").with_entry(Acl::new("teamleader", 0b01110)?),
//!         ),
//! );
//!
//! let principals = [Principal::from("manager"), Principal::from("teamleader")];
//! let resolution = store.resolve(&["Project", "ToDoItem"], &principals)?;
//! assert_eq!(resolution.permissions.to_string(), "-rwc-");
//! # Ok::<(), gatehouse::AuthzError>(())
//! ```

pub mod acl;
pub mod authorizer;
pub mod cache;
pub mod context;
pub mod error;
pub mod permissions;
pub mod policy;
pub mod resource;
pub mod store;


// Re-export commonly used types
pub use acl::{Acl, ResourceAclTree};
pub use authorizer::Authorizer;
pub use cache::{CacheSweeper, PolicyStoreLoader, StoreCache};
pub use context::AuthorizationContext;
pub use error::{AuthzError, Result};
pub use permissions::{Permission, PermissionSet};
pub use policy::{
    DefaultPolicy, MutablePermissionSet, Policy, PolicyError, PolicyMediator, PolicyRegistry,
    PolicyScope,
};
pub use resource::{ConfigurableResource, ProtectedResource, ResourceRef, ResourceType};
pub use store::{PolicyStore, Resolution};
