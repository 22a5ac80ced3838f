//! In-Memory Node Store
//!
//! Holds the two flat node collections of a course and the indexes that turn
//! them into an implicit tree:
//!
//! - container by id
//! - container children by parent id (plus the root list)
//! - content items by owning leaf-container id
//!
//! Indexes are built once when the store is created and kept current by the
//! structural mutators (`insert_container`, `reparent`, `retain_*`). Callers
//! that need to change `id`, `parent_id` or `activity_id` must go through those
//! mutators; the `*_mut` accessors are for payload and flag edits only.
//!
//! Detached (soft-deleted) nodes stay in storage until the pruner runs, but
//! every `live_*` query skips them.

use crate::models::{Container, ContentItem};
use serde_json::Value;
use std::collections::HashMap;

/// Flat container and content-item collections with parent/owner indexes
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    containers: Vec<Container>,
    items: Vec<ContentItem>,

    /// Map: container id → index into `containers`
    container_index: HashMap<i64, usize>,

    /// Map: parent id → indexes of child containers (insertion order)
    children_index: HashMap<i64, Vec<usize>>,

    /// Indexes of containers with no parent
    roots: Vec<usize>,

    /// Map: content item id → index into `items`
    item_index: HashMap<i64, usize>,

    /// Map: leaf-container id → indexes of owned content items
    owner_index: HashMap<i64, Vec<usize>>,
}

impl NodeStore {
    /// Create a store and build its indexes
    pub fn new(containers: Vec<Container>, items: Vec<ContentItem>) -> Self {
        let mut store = Self {
            containers,
            items,
            ..Default::default()
        };
        store.reindex();
        store
    }

    fn reindex(&mut self) {
        self.container_index.clear();
        self.children_index.clear();
        self.roots.clear();
        self.item_index.clear();
        self.owner_index.clear();

        for (idx, container) in self.containers.iter().enumerate() {
            self.container_index.insert(container.id, idx);
            match container.parent_id {
                Some(parent) => self.children_index.entry(parent).or_default().push(idx),
                None => self.roots.push(idx),
            }
        }

        for (idx, item) in self.items.iter().enumerate() {
            self.item_index.insert(item.id, idx);
            self.owner_index.entry(item.activity_id).or_default().push(idx);
        }
    }

    // ========================================================================
    // Read access
    // ========================================================================

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn container(&self, id: i64) -> Option<&Container> {
        self.container_index
            .get(&id)
            .map(|&idx| &self.containers[idx])
    }

    pub fn item(&self, id: i64) -> Option<&ContentItem> {
        self.item_index.get(&id).map(|&idx| &self.items[idx])
    }

    /// Whether a container exists and is not soft-deleted
    pub fn is_live(&self, id: i64) -> bool {
        self.container(id).is_some_and(|c| !c.detached)
    }

    /// Non-detached root containers in sibling order
    pub fn live_roots(&self) -> Vec<&Container> {
        self.sorted_live(&self.roots)
    }

    /// Non-detached children of `parent_id` in sibling order
    pub fn live_children(&self, parent_id: i64) -> Vec<&Container> {
        match self.children_index.get(&parent_id) {
            Some(indexes) => self.sorted_live(indexes),
            None => Vec::new(),
        }
    }

    /// Identifiers of `live_children`, for callers that go on to mutate
    pub fn live_child_ids(&self, parent_id: i64) -> Vec<i64> {
        self.live_children(parent_id).iter().map(|c| c.id).collect()
    }

    /// Non-detached content items owned by `owner_id` in sibling order
    pub fn live_items(&self, owner_id: i64) -> Vec<&ContentItem> {
        let mut items: Vec<&ContentItem> = self
            .owner_index
            .get(&owner_id)
            .map(|indexes| {
                indexes
                    .iter()
                    .map(|&idx| &self.items[idx])
                    .filter(|item| !item.detached)
                    .collect()
            })
            .unwrap_or_default();
        items.sort_by_key(|item| item.sibling_key());
        items
    }

    /// Number of non-detached content items owned by `owner_id`
    pub fn live_item_count(&self, owner_id: i64) -> usize {
        self.owner_index.get(&owner_id).map_or(0, |indexes| {
            indexes
                .iter()
                .filter(|&&idx| !self.items[idx].detached)
                .count()
        })
    }

    /// Repository identifier shared by the course (taken from the first container)
    pub fn repository_id(&self) -> Option<Value> {
        self.containers
            .first()
            .and_then(|c| c.repository_id.clone())
    }

    fn sorted_live(&self, indexes: &[usize]) -> Vec<&Container> {
        let mut containers: Vec<&Container> = indexes
            .iter()
            .map(|&idx| &self.containers[idx])
            .filter(|c| !c.detached)
            .collect();
        containers.sort_by_key(|c| c.sibling_key());
        containers
    }

    // ========================================================================
    // Payload and flag mutation
    // ========================================================================

    /// Mutable access for payload/flag edits; do not change `id` or `parent_id` here
    pub fn container_mut(&mut self, id: i64) -> Option<&mut Container> {
        match self.container_index.get(&id) {
            Some(&idx) => Some(&mut self.containers[idx]),
            None => None,
        }
    }

    /// Mutable access for payload/flag edits; do not change `id` or `activity_id` here
    pub fn item_mut(&mut self, id: i64) -> Option<&mut ContentItem> {
        match self.item_index.get(&id) {
            Some(&idx) => Some(&mut self.items[idx]),
            None => None,
        }
    }

    pub fn containers_mut(&mut self) -> std::slice::IterMut<'_, Container> {
        self.containers.iter_mut()
    }

    pub fn items_mut(&mut self) -> std::slice::IterMut<'_, ContentItem> {
        self.items.iter_mut()
    }

    // ========================================================================
    // Structural mutation
    // ========================================================================

    /// Add a container and index it
    pub fn insert_container(&mut self, container: Container) {
        let idx = self.containers.len();
        self.container_index.insert(container.id, idx);
        match container.parent_id {
            Some(parent) => self.children_index.entry(parent).or_default().push(idx),
            None => self.roots.push(idx),
        }
        self.containers.push(container);
    }

    /// Move a container under a new parent.
    ///
    /// Returns `false` if the container does not exist.
    pub fn reparent(&mut self, id: i64, new_parent: Option<i64>) -> bool {
        let Some(&idx) = self.container_index.get(&id) else {
            return false;
        };

        let old_parent = self.containers[idx].parent_id;
        if old_parent == new_parent {
            return true;
        }

        match old_parent {
            Some(parent) => {
                if let Some(siblings) = self.children_index.get_mut(&parent) {
                    siblings.retain(|&i| i != idx);
                }
            }
            None => self.roots.retain(|&i| i != idx),
        }
        match new_parent {
            Some(parent) => self.children_index.entry(parent).or_default().push(idx),
            None => self.roots.push(idx),
        }

        self.containers[idx].parent_id = new_parent;
        true
    }

    /// Physically remove containers not matching `keep`; returns the number removed
    pub fn retain_containers<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&Container) -> bool,
    {
        let before = self.containers.len();
        self.containers.retain(keep);
        let removed = before - self.containers.len();
        if removed > 0 {
            self.reindex();
        }
        removed
    }

    /// Physically remove content items not matching `keep`; returns the number removed
    pub fn retain_items<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&ContentItem) -> bool,
    {
        let before = self.items.len();
        self.items.retain(keep);
        let removed = before - self.items.len();
        if removed > 0 {
            self.reindex();
        }
        removed
    }

    /// Consume the store, returning the collections in their stored order
    pub fn into_parts(self) -> (Vec<Container>, Vec<ContentItem>) {
        (self.containers, self.items)
    }
}
