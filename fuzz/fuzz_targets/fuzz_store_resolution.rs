#![no_main]

use arbitrary::Arbitrary;
use gatehouse::{Acl, AuthzError, PolicyStore, ResourceAclTree};
use gatehouse_types::Principal;
use libfuzzer_sys::fuzz_target;

// ============================================================================
// Arbitrary input
// ============================================================================

const NAMES: [&str; 6] = ["Root", "A", "B", "C", "D", "E"];
const PRINCIPALS: [&str; 4] = ["p0", "p1", "p2", "p3"];

/// One node of the chain: optional entry bits per principal.
#[derive(Debug, Clone, Arbitrary)]
struct FuzzNode {
    entries: [Option<u8>; 4],
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzInput {
    nodes: Vec<FuzzNode>,
    principal_mask: u8,
    /// Length of the requested path; may exceed the chain to force a
    /// missing hop.
    path_len: u8,
}

fn build(nodes: &[FuzzNode]) -> PolicyStore {
    let mut below: Option<ResourceAclTree> = None;
    for (depth, node) in nodes.iter().enumerate().rev() {
        let mut tree = ResourceAclTree::new(NAMES[depth]);
        for (principal, bits) in PRINCIPALS.iter().zip(node.entries) {
            if let Some(bits) = bits {
                if let Ok(acl) = Acl::new(*principal, bits) {
                    tree.add_entry(acl);
                }
            }
        }
        if let Some(child) = below.take() {
            tree.add_child(child);
        }
        below = Some(tree);
    }
    below
        .map(|root| PolicyStore::new().with_root(root))
        .unwrap_or_default()
}

fuzz_target!(|input: FuzzInput| {
    let nodes = &input.nodes[..input.nodes.len().min(NAMES.len())];
    let store = build(nodes);

    let principals: Vec<Principal> = PRINCIPALS
        .iter()
        .enumerate()
        .filter(|(i, _)| input.principal_mask & (1 << i) != 0)
        .map(|(_, p)| Principal::from(*p))
        .collect();

    let path_len = usize::from(input.path_len) % (NAMES.len() + 1);
    let path = &NAMES[..path_len];

    match store.resolve(path, &principals) {
        Ok(resolution) => {
            assert!(path_len <= nodes.len());

            let mut expected = 0u8;
            for (i, name) in PRINCIPALS.iter().enumerate() {
                if input.principal_mask & (1 << i) == 0 {
                    assert!(!resolution.contributions.contains_key(*name));
                    continue;
                }
                let deepest = nodes[..path_len]
                    .iter()
                    .rev()
                    .find_map(|n| n.entries[i])
                    .map(|bits| bits & 0b1_1111);
                assert_eq!(
                    resolution.contributions.get(*name).map(|p| p.as_int()),
                    deepest
                );
                expected |= deepest.unwrap_or(0);
            }
            assert_eq!(resolution.permissions.as_int(), expected);
        }
        Err(AuthzError::ResourceNotFound { .. }) => {
            assert!(path_len > nodes.len());
        }
        Err(other) => panic!("unexpected resolution error: {other}"),
    }
});
