//! Ordered Traversal
//!
//! Flattens the implicit course tree into the order a learner reads it, top to
//! bottom:
//!
//! 1. Non-detached roots, sorted by `(position, id)`
//! 2. Each container is emitted before its subtree
//! 3. A leaf-container is followed by its non-detached content items, sorted by
//!    `(position, id)`; recursion stops there
//! 4. Any other container is followed by its non-detached children, sorted the
//!    same way and visited depth-first
//!
//! The iterator is lazy and single-pass: each call to `next` expands at most one
//! container. Rebuild it to walk the tree again. Empty leaf-containers still
//! appear, so later stages can spot them.
//!
//! # Examples
//!
//! ```rust
//! use coursepack_core::models::{Container, ContentItem};
//! use coursepack_core::store::NodeStore;
//! use coursepack_core::traversal::{CourseNode, OrderedTraversal};
//! use serde_json::json;
//!
//! let containers: Vec<Container> = serde_json::from_value(json!([
//!     {"id": 1, "parent_id": null, "type": "LONG_HLXP_SCHEMA/PAGE", "position": 1},
//!     {"id": 2, "parent_id": 1, "type": "INVISIBLE_CONTAINER", "position": 1}
//! ]))
//! .unwrap();
//! let items: Vec<ContentItem> = serde_json::from_value(json!([
//!     {"id": 10, "activity_id": 2, "type": "HTML", "position": 1}
//! ]))
//! .unwrap();
//! let store = NodeStore::new(containers, items);
//!
//! let ids: Vec<i64> = OrderedTraversal::new(&store).map(|node| node.id()).collect();
//! assert_eq!(ids, vec![1, 2, 10]);
//! ```

use crate::models::{Container, ContentItem};
use crate::store::NodeStore;

/// One node yielded by the traversal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CourseNode<'a> {
    Container(&'a Container),
    Item(&'a ContentItem),
}

impl<'a> CourseNode<'a> {
    pub fn id(&self) -> i64 {
        match self {
            Self::Container(container) => container.id,
            Self::Item(item) => item.id,
        }
    }

    pub fn as_container(&self) -> Option<&'a Container> {
        match self {
            Self::Container(container) => Some(container),
            Self::Item(_) => None,
        }
    }

    pub fn as_item(&self) -> Option<&'a ContentItem> {
        match self {
            Self::Item(item) => Some(item),
            Self::Container(_) => None,
        }
    }
}

/// Lazy depth-first walk over a [`NodeStore`]
pub struct OrderedTraversal<'a> {
    store: &'a NodeStore,
    /// Pending nodes, next one on top
    pending: Vec<CourseNode<'a>>,
}

impl<'a> OrderedTraversal<'a> {
    /// Walk the whole course, root by root
    pub fn new(store: &'a NodeStore) -> Self {
        let pending = store
            .live_roots()
            .into_iter()
            .rev()
            .map(CourseNode::Container)
            .collect();
        Self { store, pending }
    }

    /// Walk only the subtree rooted at `container_id` (the container included).
    ///
    /// Yields nothing if the container is missing or detached.
    pub fn from_container(store: &'a NodeStore, container_id: i64) -> Self {
        let pending = store
            .container(container_id)
            .filter(|c| !c.detached)
            .map(CourseNode::Container)
            .into_iter()
            .collect();
        Self { store, pending }
    }
}

impl<'a> Iterator for OrderedTraversal<'a> {
    type Item = CourseNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.pending.pop()?;

        if let CourseNode::Container(container) = node {
            if container.kind().is_leaf() {
                self.pending.extend(
                    self.store
                        .live_items(container.id)
                        .into_iter()
                        .rev()
                        .map(CourseNode::Item),
                );
            } else {
                self.pending.extend(
                    self.store
                        .live_children(container.id)
                        .into_iter()
                        .rev()
                        .map(CourseNode::Container),
                );
            }
        }

        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn container(id: i64, parent: Option<i64>, tag: &str, position: i64) -> Container {
        serde_json::from_value(json!({
            "id": id, "parent_id": parent, "type": tag, "position": position
        }))
        .unwrap()
    }

    fn item(id: i64, owner: i64, position: i64) -> ContentItem {
        serde_json::from_value(json!({
            "id": id, "activity_id": owner, "type": "HTML", "position": position
        }))
        .unwrap()
    }

    /// Folder → two pages; page 3 is listed first but positioned second
    fn two_page_course() -> NodeStore {
        NodeStore::new(
            vec![
                container(1, None, "LONG_HLXP_SCHEMA/FOLDER", 1),
                container(3, Some(1), "LONG_HLXP_SCHEMA/PAGE", 2),
                container(2, Some(1), "LONG_HLXP_SCHEMA/PAGE", 1),
                container(4, Some(2), "SECTION_CONTAINER", 1),
                container(5, Some(4), "SECTION", 1),
                container(6, Some(5), "INVISIBLE_CONTAINER", 2),
                container(7, Some(5), "EXPAND_CONTAINER", 1),
                container(8, Some(3), "SECTION_CONTAINER", 1),
                container(9, Some(8), "SECTION", 1),
                container(20, Some(9), "CEK_QUESTION_SET", 1),
            ],
            vec![item(100, 6, 2), item(101, 6, 1), item(102, 7, 1), item(103, 20, 1)],
        )
    }

    fn ids(traversal: OrderedTraversal<'_>) -> Vec<i64> {
        traversal.map(|node| node.id()).collect()
    }

    #[test]
    fn test_depth_first_in_position_order() {
        let store = two_page_course();
        assert_eq!(
            ids(OrderedTraversal::new(&store)),
            vec![1, 2, 4, 5, 7, 102, 6, 101, 100, 3, 8, 9, 20, 103]
        );
    }

    #[test]
    fn test_roots_in_position_order() {
        let store = NodeStore::new(
            vec![
                container(2, None, "LONG_HLXP_SCHEMA/FOLDER", 5),
                container(1, None, "LONG_HLXP_SCHEMA/FOLDER", 9),
                container(3, None, "LONG_HLXP_SCHEMA/FOLDER", 5),
            ],
            vec![],
        );
        assert_eq!(ids(OrderedTraversal::new(&store)), vec![2, 3, 1]);
    }

    #[test]
    fn test_empty_leaf_container_still_emitted() {
        let store = NodeStore::new(
            vec![
                container(1, None, "LONG_HLXP_SCHEMA/PAGE", 1),
                container(2, Some(1), "INVISIBLE_CONTAINER", 1),
            ],
            vec![],
        );
        assert_eq!(ids(OrderedTraversal::new(&store)), vec![1, 2]);
    }

    #[test]
    fn test_detached_subtrees_are_skipped() {
        let mut store = two_page_course();
        store.container_mut(3).unwrap().detached = true;
        store.item_mut(101).unwrap().detached = true;

        assert_eq!(
            ids(OrderedTraversal::new(&store)),
            vec![1, 2, 4, 5, 7, 102, 6, 100]
        );
    }

    #[test]
    fn test_every_live_node_visited_exactly_once() {
        let store = two_page_course();
        let visited: Vec<i64> = ids(OrderedTraversal::new(&store));
        let unique: HashSet<i64> = visited.iter().copied().collect();
        assert_eq!(unique.len(), visited.len());

        let expected: HashSet<i64> = store
            .containers()
            .iter()
            .map(|c| c.id)
            .chain(store.items().iter().map(|i| i.id))
            .collect();
        assert_eq!(unique, expected);
    }

    #[test]
    fn test_subtree_walk() {
        let store = two_page_course();
        assert_eq!(
            ids(OrderedTraversal::from_container(&store, 5)),
            vec![5, 7, 102, 6, 101, 100]
        );
        assert!(OrderedTraversal::from_container(&store, 999).next().is_none());
    }

    #[test]
    fn test_items_under_non_leaf_containers_are_not_emitted() {
        let store = NodeStore::new(
            vec![container(1, None, "SECTION", 1)],
            vec![item(10, 1, 1)],
        );
        assert_eq!(ids(OrderedTraversal::new(&store)), vec![1]);
    }
}
