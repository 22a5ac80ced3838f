//! Heuristic Neighbour-Merge
//!
//! After per-leaf regrouping, a section holding a lone video can absorb the
//! short HTML "intro" section before it and the expandable HTML "credits"
//! section after it. The video section then reads intro (slot 1), video
//! (slot 2), credits (slot 3).
//!
//! Matching is deliberately narrow: every section involved must hold exactly
//! one leaf-container with exactly one content item of the expected kind.
//! Anything else is left alone. Donor sections are emptied, not removed; the
//! pruner discards them.
//!
//! The shape checks run against a temporary nested view of one
//! section-container, built from [`OrderedTraversal`]. The view is updated as
//! leaf-containers move so a donor is never consumed twice, and it is dropped
//! once the section-container is done.

use super::context::EditContext;
use crate::models::{ContainerKind, ContentKind};
use crate::store::NodeStore;
use crate::traversal::{CourseNode, OrderedTraversal};

const INTRO_SLOT: i64 = 1;
const VIDEO_SLOT: i64 = 2;
const CREDITS_SLOT: i64 = 3;

/// Which neighbours to fold into a video section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeRules {
    pub intro: bool,
    pub credits: bool,
}

impl MergeRules {
    pub fn is_empty(&self) -> bool {
        !self.intro && !self.credits
    }
}

/// Counts of what one merge pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub video_sections: usize,
    pub intros_merged: usize,
    pub credits_merged: usize,
}

#[derive(Debug, Clone)]
struct LeafView {
    id: i64,
    kind: ContainerKind,
    items: Vec<ContentKind>,
}

impl LeafView {
    fn holds_single(&self, kind: ContentKind) -> bool {
        self.items.len() == 1 && self.items[0] == kind
    }
}

#[derive(Debug, Clone)]
struct SectionView {
    id: i64,
    leaves: Vec<LeafView>,
}

impl SectionView {
    /// The only leaf-container, if there is exactly one
    fn single_leaf(&self) -> Option<&LeafView> {
        match self.leaves.as_slice() {
            [leaf] => Some(leaf),
            _ => None,
        }
    }

    fn is_video_section(&self) -> bool {
        self.single_leaf()
            .is_some_and(|leaf| leaf.holds_single(ContentKind::Video))
    }

    /// The single leaf-container if it is a `kind` holding one HTML item
    fn html_donor(&self, kind: ContainerKind) -> Option<i64> {
        self.single_leaf()
            .filter(|leaf| leaf.kind == kind && leaf.holds_single(ContentKind::Html))
            .map(|leaf| leaf.id)
    }
}

/// Run the merge heuristics over every live section-container
pub fn merge_neighbours(store: &mut NodeStore, ctx: &EditContext, rules: MergeRules) -> MergeStats {
    let mut stats = MergeStats::default();
    if rules.is_empty() {
        return stats;
    }

    let section_containers: Vec<i64> = store
        .containers()
        .iter()
        .filter(|c| !c.detached && c.kind() == ContainerKind::SectionContainer)
        .map(|c| c.id)
        .collect();

    for section_container_id in section_containers {
        let mut sections = nested_view(store, section_container_id);
        merge_section_container(store, ctx, rules, &mut sections, &mut stats);
    }

    tracing::info!(
        "Neighbour merge: {} video sections, {} intros and {} credits merged",
        stats.video_sections,
        stats.intros_merged,
        stats.credits_merged
    );
    stats
}

fn merge_section_container(
    store: &mut NodeStore,
    ctx: &EditContext,
    rules: MergeRules,
    sections: &mut [SectionView],
    stats: &mut MergeStats,
) {
    for index in 0..sections.len() {
        if !sections[index].is_video_section() {
            continue;
        }
        stats.video_sections += 1;

        let target = sections[index].id;
        let video_leaf = sections[index].leaves[0].id;
        place_leaf(store, ctx, video_leaf, target, VIDEO_SLOT);

        if rules.intro && index > 0 {
            if let Some(intro) = sections[index - 1].html_donor(ContainerKind::Invisible) {
                tracing::debug!(
                    "Moving intro {} from section {} into video section {}",
                    intro,
                    sections[index - 1].id,
                    target
                );
                place_leaf(store, ctx, intro, target, INTRO_SLOT);
                let moved = std::mem::take(&mut sections[index - 1].leaves);
                sections[index].leaves.extend(moved);
                stats.intros_merged += 1;
            }
        }

        if rules.credits && index + 1 < sections.len() {
            if let Some(credits) = sections[index + 1].html_donor(ContainerKind::Expandable) {
                tracing::debug!(
                    "Moving credits {} from section {} into video section {}",
                    credits,
                    sections[index + 1].id,
                    target
                );
                place_leaf(store, ctx, credits, target, CREDITS_SLOT);
                let moved = std::mem::take(&mut sections[index + 1].leaves);
                sections[index].leaves.extend(moved);
                stats.credits_merged += 1;
            }
        }
    }
}

/// Sections of one section-container with their leaf-containers and item kinds
fn nested_view(store: &NodeStore, section_container_id: i64) -> Vec<SectionView> {
    let mut sections: Vec<SectionView> = Vec::new();

    for node in OrderedTraversal::from_container(store, section_container_id) {
        match node {
            CourseNode::Container(container) => {
                if container.parent_id == Some(section_container_id)
                    && container.kind() == ContainerKind::Section
                {
                    sections.push(SectionView {
                        id: container.id,
                        leaves: Vec::new(),
                    });
                } else if container.kind().is_leaf() {
                    if let Some(section) = sections
                        .last_mut()
                        .filter(|s| container.parent_id == Some(s.id))
                    {
                        section.leaves.push(LeafView {
                            id: container.id,
                            kind: container.kind(),
                            items: Vec::new(),
                        });
                    }
                }
            }
            CourseNode::Item(item) => {
                if let Some(leaf) = sections
                    .last_mut()
                    .and_then(|s| s.leaves.last_mut())
                    .filter(|leaf| leaf.id == item.activity_id)
                {
                    leaf.items.push(item.kind());
                }
            }
        }
    }

    sections
}

fn place_leaf(store: &mut NodeStore, ctx: &EditContext, leaf_id: i64, section_id: i64, slot: i64) {
    store.reparent(leaf_id, Some(section_id));
    if let Some(leaf) = store.container_mut(leaf_id) {
        leaf.position = slot;
        leaf.touch(ctx.now);
    }
}
