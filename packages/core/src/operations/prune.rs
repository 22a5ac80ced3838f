//! Pruner
//!
//! Compacts the store after structural edits. Rules run in this order, each
//! seeing the result of the previous ones:
//!
//! 1. Drop every detached container and content item
//! 2. Drop content items that are output-only and detached
//! 3. Drop content items with a non-empty `refs.linked`
//! 4. Drop leaf-containers that no remaining content item names as owner
//! 5. Drop sections that no remaining leaf-container names as parent
//! 6. Drop content items whose owner no longer exists
//!
//! Section-containers, pages and folders are never dropped for being empty.
//! Running the pruner a second time changes nothing.
//!
//! # Examples
//!
//! ```rust
//! use coursepack_core::models::{Container, ContentItem};
//! use coursepack_core::operations::prune;
//! use coursepack_core::store::NodeStore;
//! use serde_json::json;
//!
//! let containers: Vec<Container> = serde_json::from_value(json!([
//!     {"id": 1, "type": "SECTION"},
//!     {"id": 2, "parent_id": 1, "type": "INVISIBLE_CONTAINER"}
//! ]))
//! .unwrap();
//! let items: Vec<ContentItem> = serde_json::from_value(json!([
//!     {"id": 10, "activity_id": 2, "type": "HTML", "refs": {"linked": [99]}}
//! ]))
//! .unwrap();
//! let mut store = NodeStore::new(containers, items);
//!
//! let stats = prune(&mut store);
//! assert_eq!(stats.linked_items, 1);
//! assert!(store.containers().is_empty());
//! ```

use crate::models::ContainerKind;
use crate::store::NodeStore;
use std::collections::HashSet;

/// Nodes removed by each pruning rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneStats {
    pub detached_containers: usize,
    pub detached_items: usize,
    pub output_only_items: usize,
    pub linked_items: usize,
    pub empty_leaf_containers: usize,
    pub empty_sections: usize,
    pub orphaned_items: usize,
}

impl PruneStats {
    pub fn total(&self) -> usize {
        self.detached_containers
            + self.detached_items
            + self.output_only_items
            + self.linked_items
            + self.empty_leaf_containers
            + self.empty_sections
            + self.orphaned_items
    }
}

/// Run every pruning rule once, in order
pub fn prune(store: &mut NodeStore) -> PruneStats {
    let mut stats = PruneStats::default();

    stats.detached_containers = store.retain_containers(|c| !c.detached);
    stats.detached_items = store.retain_items(|i| !i.detached);

    stats.output_only_items = store.retain_items(|i| !(i.is_output_only() && i.detached));

    stats.linked_items = store.retain_items(|i| {
        let linked = i.has_linked_refs();
        if linked {
            tracing::debug!("Dropping content item {} with linked references", i.id);
        }
        !linked
    });

    let owners: HashSet<i64> = store.items().iter().map(|i| i.activity_id).collect();
    stats.empty_leaf_containers =
        store.retain_containers(|c| !c.kind().is_leaf() || owners.contains(&c.id));

    let leaf_parents: HashSet<i64> = store
        .containers()
        .iter()
        .filter(|c| c.kind().is_leaf())
        .filter_map(|c| c.parent_id)
        .collect();
    stats.empty_sections = store
        .retain_containers(|c| c.kind() != ContainerKind::Section || leaf_parents.contains(&c.id));

    let containers: HashSet<i64> = store.containers().iter().map(|c| c.id).collect();
    stats.orphaned_items = store.retain_items(|i| containers.contains(&i.activity_id));

    tracing::info!(
        "Pruned {} nodes: {} detached containers, {} detached items, {} output-only, {} linked, {} empty leaf-containers, {} empty sections, {} orphaned items",
        stats.total(),
        stats.detached_containers,
        stats.detached_items,
        stats.output_only_items,
        stats.linked_items,
        stats.empty_leaf_containers,
        stats.empty_sections,
        stats.orphaned_items
    );
    stats
}
