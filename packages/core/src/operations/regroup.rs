//! Section Regrouping
//!
//! Replaces the section-container/section layer beneath every page with one
//! freshly minted section-container holding either one section per
//! leaf-container ([`SectionScope::SectionPerTe`]) or a single section for the
//! whole page ([`SectionScope::SectionPerPage`]).
//!
//! Per page:
//!
//! 1. Collect live section-containers, their live sections, and the sections'
//!    live leaf-containers.
//! 2. Order the leaf-containers by flattened position `(own, section,
//!    section-container, id)` and renumber them `1..N`.
//! 3. Mint one section-container at position 1.
//! 4. Mint the new section(s) and move the leaf-containers into them.
//! 5. Soft-delete every section-container and section collected in step 1.
//!
//! Leaf-containers are only ever moved, never copied or dropped. After all
//! pages, invisible leaf-containers without live content items are
//! soft-deleted; the pruner does the physical cleanup.

use super::context::EditContext;
use crate::config::SectionScope;
use crate::models::payload::OrderKey;
use crate::models::{Container, ContainerKind};
use crate::store::NodeStore;
use serde_json::{json, Map, Value};

/// Section flags carried from an old section onto its replacement
const INHERITED_SECTION_FLAGS: [&str; 2] = ["locked", "completionRequired"];

/// Counts of what one regrouping pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegroupStats {
    pub pages: usize,
    pub leaf_containers_moved: usize,
    pub sections_created: usize,
    pub containers_detached: usize,
    pub empty_invisibles_detached: usize,
}

/// A leaf-container and the old ancestors that decide its flattened position
#[derive(Debug, Clone, Copy)]
struct LeafSlot {
    id: i64,
    /// Renumbered position, assigned after sorting
    position: i64,
    order: OrderKey,
    section_id: i64,
    section_order: OrderKey,
    section_container_order: OrderKey,
}

impl LeafSlot {
    fn flattened_key(&self) -> (OrderKey, OrderKey, OrderKey, i64) {
        (
            self.order,
            self.section_order,
            self.section_container_order,
            self.id,
        )
    }
}

/// The old grouping layer of one page
#[derive(Debug, Default)]
struct PageLayout {
    section_containers: Vec<i64>,
    /// In section-container order, then section order
    sections: Vec<i64>,
    leaves: Vec<LeafSlot>,
}

/// Regroup every live page of the course.
///
/// `SectionScope::NoChange` leaves the store untouched.
pub fn regroup_sections(
    store: &mut NodeStore,
    ctx: &mut EditContext,
    scope: SectionScope,
) -> RegroupStats {
    let mut stats = RegroupStats::default();
    if scope == SectionScope::NoChange {
        return stats;
    }

    let pages: Vec<i64> = store
        .containers()
        .iter()
        .filter(|c| is_regroupable_page(c))
        .map(|c| c.id)
        .collect();

    for page_id in pages {
        regroup_page(store, ctx, scope, page_id, &mut stats);
        stats.pages += 1;
    }

    stats.empty_invisibles_detached = detach_empty_invisibles(store, ctx);

    tracing::info!(
        "Regrouped {} pages ({}): {} leaf-containers moved into {} new sections, {} old containers detached, {} empty invisibles detached",
        stats.pages,
        scope,
        stats.leaf_containers_moved,
        stats.sections_created,
        stats.containers_detached,
        stats.empty_invisibles_detached
    );
    stats
}

/// Only live pages carrying the canonical page tag are regrouped; other
/// page-like tags are left as they are
fn is_regroupable_page(container: &Container) -> bool {
    !container.detached
        && container.deleted_at.is_none()
        && container.container_type == ContainerKind::PAGE_TAG
}

fn regroup_page(
    store: &mut NodeStore,
    ctx: &mut EditContext,
    scope: SectionScope,
    page_id: i64,
    stats: &mut RegroupStats,
) {
    let mut layout = collect_layout(store, page_id);

    layout.leaves.sort_by_key(LeafSlot::flattened_key);
    for (index, leaf) in layout.leaves.iter_mut().enumerate() {
        leaf.position = index as i64 + 1;
        if let Some(container) = store.container_mut(leaf.id) {
            container.position = leaf.position;
        }
    }

    let section_container = ctx.mint(ContainerKind::SectionContainer, page_id, 1, json!({}));
    let section_container_id = section_container.id;
    store.insert_container(section_container);

    tracing::debug!(
        "Page {}: {} leaf-containers from {} sections, new section container {}",
        page_id,
        layout.leaves.len(),
        layout.sections.len(),
        section_container_id
    );

    match scope {
        SectionScope::SectionPerTe => {
            for leaf in &layout.leaves {
                let data = section_data(store, String::new(), Some(leaf.section_id));
                let section =
                    ctx.mint(ContainerKind::Section, section_container_id, leaf.position, data);
                let section_id = section.id;
                store.insert_container(section);
                stats.sections_created += 1;

                move_leaf(store, ctx, leaf.id, section_id);
                stats.leaf_containers_moved += 1;
            }
        }
        SectionScope::SectionPerPage => {
            let title = store
                .container(page_id)
                .and_then(|page| page.title())
                .unwrap_or_default()
                .to_string();
            let data = section_data(store, title, layout.sections.first().copied());
            let section = ctx.mint(ContainerKind::Section, section_container_id, 1, data);
            let section_id = section.id;
            store.insert_container(section);
            stats.sections_created += 1;

            for leaf in &layout.leaves {
                move_leaf(store, ctx, leaf.id, section_id);
                stats.leaf_containers_moved += 1;
            }
        }
        SectionScope::NoChange => {}
    }

    for id in layout
        .section_containers
        .iter()
        .chain(layout.sections.iter())
    {
        if let Some(container) = store.container_mut(*id) {
            container.detach(ctx.now);
            stats.containers_detached += 1;
        }
    }
}

fn collect_layout(store: &NodeStore, page_id: i64) -> PageLayout {
    let mut layout = PageLayout::default();

    for section_container in store
        .live_children(page_id)
        .into_iter()
        .filter(|c| c.kind() == ContainerKind::SectionContainer)
    {
        layout.section_containers.push(section_container.id);

        for section in store
            .live_children(section_container.id)
            .into_iter()
            .filter(|c| c.kind() == ContainerKind::Section)
        {
            layout.sections.push(section.id);

            for leaf in store
                .live_children(section.id)
                .into_iter()
                .filter(|c| c.kind().is_leaf())
            {
                layout.leaves.push(LeafSlot {
                    id: leaf.id,
                    position: leaf.position,
                    order: leaf.order_position(),
                    section_id: section.id,
                    section_order: section.order_position(),
                    section_container_order: section_container.order_position(),
                });
            }
        }
    }

    layout
}

/// `data` for a new section: the title plus the flags of the section it replaces
fn section_data(store: &NodeStore, title: String, inherit_from: Option<i64>) -> Value {
    let mut data = Map::new();
    data.insert("title".to_string(), Value::String(title));

    if let Some(old) = inherit_from
        .and_then(|id| store.container(id))
        .and_then(|section| section.data.as_object())
    {
        for flag in INHERITED_SECTION_FLAGS {
            if let Some(value) = old.get(flag) {
                data.insert(flag.to_string(), value.clone());
            }
        }
    }

    Value::Object(data)
}

fn move_leaf(store: &mut NodeStore, ctx: &EditContext, leaf_id: i64, section_id: i64) {
    store.reparent(leaf_id, Some(section_id));
    if let Some(leaf) = store.container_mut(leaf_id) {
        leaf.touch(ctx.now);
    }
}

/// Soft-delete live invisible leaf-containers that own no live content items
fn detach_empty_invisibles(store: &mut NodeStore, ctx: &EditContext) -> usize {
    let empty: Vec<i64> = store
        .containers()
        .iter()
        .filter(|c| !c.detached && c.kind() == ContainerKind::Invisible)
        .filter(|c| store.live_item_count(c.id) == 0)
        .map(|c| c.id)
        .collect();

    for id in &empty {
        if let Some(container) = store.container_mut(*id) {
            tracing::debug!("Detaching empty invisible container {}", id);
            container.detach(ctx.now);
        }
    }
    empty.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Container, ContentItem};
    use crate::operations::context::NEW_CONTAINER_ID_START;
    use chrono::Utc;
    use std::collections::HashSet;

    fn container(id: i64, parent: Option<i64>, tag: &str, position: i64) -> Container {
        serde_json::from_value(json!({
            "id": id, "parent_id": parent, "type": tag, "position": position,
            "repository_id": 7
        }))
        .unwrap()
    }

    fn html(id: i64, owner: i64) -> ContentItem {
        serde_json::from_value(json!({
            "id": id, "activity_id": owner, "type": "HTML", "position": 1
        }))
        .unwrap()
    }

    fn ctx() -> EditContext {
        EditContext::new(Utc::now(), Some(json!(7)))
    }

    /// Page 1 → sc 2 → section 3 → leaves 4, 5 (one HTML item each)
    fn single_section_page() -> NodeStore {
        NodeStore::new(
            vec![
                container(1, None, "LONG_HLXP_SCHEMA/PAGE", 1),
                container(2, Some(1), "SECTION_CONTAINER", 1),
                container(3, Some(2), "SECTION", 1),
                container(4, Some(3), "INVISIBLE_CONTAINER", 1),
                container(5, Some(3), "INVISIBLE_CONTAINER", 2),
            ],
            vec![html(10, 4), html(11, 5)],
        )
    }

    /// Two section containers, out of order, with tied leaf positions
    fn scattered_page() -> NodeStore {
        NodeStore::new(
            vec![
                container(1, None, "LONG_HLXP_SCHEMA/PAGE", 1),
                container(2, Some(1), "SECTION_CONTAINER", 2),
                container(3, Some(1), "SECTION_CONTAINER", 1),
                container(4, Some(2), "SECTION", 1),
                container(5, Some(3), "SECTION", 1),
                container(6, Some(3), "SECTION", 2),
                container(20, Some(4), "INVISIBLE_CONTAINER", 1),
                container(21, Some(5), "EXPAND_CONTAINER", 1),
                container(22, Some(6), "INVISIBLE_CONTAINER", 1),
                container(23, Some(5), "CEK_QUESTION_SET", 2),
            ],
            vec![html(100, 20), html(101, 21), html(102, 22)],
        )
    }

    // ========================================================================
    // Section per leaf-container
    // ========================================================================

    #[test]
    fn test_per_te_scenario() {
        let mut store = single_section_page();
        let stats = regroup_sections(&mut store, &mut ctx(), SectionScope::SectionPerTe);

        let new_scs = store.live_children(1);
        assert_eq!(new_scs.len(), 1);
        let sc = new_scs[0];
        assert_eq!(sc.id, NEW_CONTAINER_ID_START);
        assert_eq!(sc.kind(), ContainerKind::SectionContainer);
        assert_eq!(sc.position, 1);
        assert_eq!(sc.repository_id, Some(json!(7)));

        let sections = store.live_children(sc.id);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].position, 1);
        assert_eq!(sections[1].position, 2);
        assert_eq!(store.live_child_ids(sections[0].id), vec![4]);
        assert_eq!(store.live_child_ids(sections[1].id), vec![5]);

        assert!(store.container(2).unwrap().detached);
        assert!(store.container(3).unwrap().detached);
        assert!(store.container(2).unwrap().deleted_at.is_some());
        assert!(!store.container(4).unwrap().detached);
        assert!(store.container(4).unwrap().modified_at.is_some());

        assert_eq!(
            stats,
            RegroupStats {
                pages: 1,
                leaf_containers_moved: 2,
                sections_created: 2,
                containers_detached: 2,
                empty_invisibles_detached: 0,
            }
        );
    }

    #[test]
    fn test_flattened_order_and_renumbering() {
        let mut store = scattered_page();
        regroup_sections(&mut store, &mut ctx(), SectionScope::SectionPerTe);

        let sc = store.live_children(1)[0].id;
        let leaves: Vec<(i64, i64)> = store
            .live_children(sc)
            .iter()
            .flat_map(|section| store.live_children(section.id))
            .map(|leaf| (leaf.id, leaf.position))
            .collect();

        // Own position first, then section position, then section-container position
        assert_eq!(leaves, vec![(21, 1), (20, 2), (22, 3), (23, 4)]);
    }

    #[test]
    fn test_leaf_containers_preserved_and_wrapped_once() {
        let mut store = scattered_page();
        let before: HashSet<i64> = [20, 21, 22, 23].into_iter().collect();

        regroup_sections(&mut store, &mut ctx(), SectionScope::SectionPerTe);

        let sc = store.live_children(1)[0].id;
        let mut seen = Vec::new();
        for section in store.live_children(sc) {
            let children = store.live_child_ids(section.id);
            assert_eq!(children.len(), 1);
            seen.extend(children);
        }
        let after: HashSet<i64> = seen.iter().copied().collect();
        assert_eq!(seen.len(), after.len());
        assert_eq!(after, before);
    }

    #[test]
    fn test_flags_inherited_from_old_section() {
        let mut store = single_section_page();
        store
            .container_mut(3)
            .unwrap()
            .data_mut()
            .extend([("locked".to_string(), json!(true)), ("title".to_string(), json!("Old"))]);

        regroup_sections(&mut store, &mut ctx(), SectionScope::SectionPerTe);

        let sc = store.live_children(1)[0].id;
        for section in store.live_children(sc) {
            assert_eq!(section.data["locked"], true);
            assert_eq!(section.data["title"], "");
            assert!(section.data.get("completionRequired").is_none());
        }
    }

    // ========================================================================
    // Section per page
    // ========================================================================

    #[test]
    fn test_per_page_single_section() {
        let mut store = scattered_page();
        store.container_mut(1).unwrap().data = json!({"title": "Welcome"});

        let stats = regroup_sections(&mut store, &mut ctx(), SectionScope::SectionPerPage);

        let sc = store.live_children(1)[0].id;
        let sections = store.live_children(sc);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].position, 1);
        assert_eq!(sections[0].data["title"], "Welcome");
        assert_eq!(store.live_child_ids(sections[0].id), vec![21, 20, 22, 23]);
        assert_eq!(stats.sections_created, 1);
        assert_eq!(stats.containers_detached, 5);
    }

    #[test]
    fn test_per_page_untitled_page() {
        let mut store = single_section_page();
        regroup_sections(&mut store, &mut ctx(), SectionScope::SectionPerPage);

        let sc = store.live_children(1)[0].id;
        assert_eq!(store.live_children(sc)[0].data["title"], "");
    }

    // ========================================================================
    // Edge cases
    // ========================================================================

    #[test]
    fn test_no_change_is_noop() {
        let mut store = single_section_page();
        let before = store.containers().to_vec();
        let stats = regroup_sections(&mut store, &mut ctx(), SectionScope::NoChange);
        assert_eq!(stats, RegroupStats::default());
        assert_eq!(store.containers(), before.as_slice());
    }

    #[test]
    fn test_page_without_leaves_gets_childless_section_container() {
        let mut store = NodeStore::new(
            vec![
                container(1, None, "LONG_HLXP_SCHEMA/PAGE", 1),
                container(2, Some(1), "SECTION_CONTAINER", 1),
            ],
            vec![],
        );

        regroup_sections(&mut store, &mut ctx(), SectionScope::SectionPerTe);

        let scs = store.live_children(1);
        assert_eq!(scs.len(), 1);
        assert!(store.live_children(scs[0].id).is_empty());
        assert!(store.container(2).unwrap().detached);
    }

    #[test]
    fn test_empty_invisibles_detached_course_wide() {
        let mut store = single_section_page();
        store.item_mut(11).unwrap().detached = true;
        store.insert_container(container(9, None, "INVISIBLE_CONTAINER", 5));
        store.insert_container(container(8, Some(3), "EXPAND_CONTAINER", 3));

        let stats = regroup_sections(&mut store, &mut ctx(), SectionScope::SectionPerTe);

        assert_eq!(stats.empty_invisibles_detached, 2);
        assert!(store.container(5).unwrap().detached);
        assert!(store.container(9).unwrap().detached);
        // Empty expandables are left for the pruner
        assert!(!store.container(8).unwrap().detached);
        assert!(!store.container(4).unwrap().detached);
    }

    #[test]
    fn test_ids_allocated_across_pages() {
        let mut store = single_section_page();
        store.insert_container(container(50, None, "LONG_HLXP_SCHEMA/PAGE", 2));
        let mut ctx = ctx();

        regroup_sections(&mut store, &mut ctx, SectionScope::SectionPerTe);

        // Two section containers plus two sections
        assert_eq!(ctx.ids.peek(), NEW_CONTAINER_ID_START + 4);
        let ids: HashSet<i64> = store.containers().iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), store.containers().len());
    }

    #[test]
    fn test_only_canonical_live_pages_are_regrouped() {
        let mut store = NodeStore::new(
            vec![
                container(1, None, "CUSTOM_PAGE", 1),
                container(2, Some(1), "SECTION_CONTAINER", 1),
                container(3, Some(2), "SECTION", 1),
                container(4, Some(3), "INVISIBLE_CONTAINER", 1),
                serde_json::from_value(json!({
                    "id": 5, "type": "LONG_HLXP_SCHEMA/PAGE",
                    "deleted_at": "2020-01-01T00:00:00.000Z"
                }))
                .unwrap(),
            ],
            vec![html(10, 4)],
        );

        let stats = regroup_sections(&mut store, &mut ctx(), SectionScope::SectionPerTe);

        assert_eq!(stats.pages, 0);
        assert_eq!(store.live_child_ids(1), vec![2]);
        assert!(store.live_children(5).is_empty());
        assert_eq!(ContainerKind::from_tag("CUSTOM_PAGE"), ContainerKind::Page);
    }

    #[test]
    fn test_fractional_positions_keep_wire_order() {
        let leaf = |id: i64, position: f64| -> Container {
            serde_json::from_value(json!({
                "id": id, "parent_id": 3, "type": "INVISIBLE_CONTAINER", "position": position
            }))
            .unwrap()
        };
        let mut store = NodeStore::new(
            vec![
                container(1, None, "LONG_HLXP_SCHEMA/PAGE", 1),
                container(2, Some(1), "SECTION_CONTAINER", 1),
                container(3, Some(2), "SECTION", 1),
                leaf(4, 1.7),
                leaf(9, 1.2),
            ],
            vec![html(10, 4), html(11, 9)],
        );

        regroup_sections(&mut store, &mut ctx(), SectionScope::SectionPerPage);

        assert_eq!(store.container(9).unwrap().position, 1);
        assert_eq!(store.container(4).unwrap().position, 2);
        let back = serde_json::to_value(store.container(4).unwrap()).unwrap();
        assert_eq!(back["position"], 2);
    }
}
