//! Per-Run Edit Context
//!
//! State shared by the structural stages of one pipeline run: the identifier
//! counter for new containers, the timestamp stamped on every change, and the
//! course's repository id copied onto new containers.

use crate::models::{Container, ContainerKind};
use crate::store::NodeStore;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// First identifier handed out to newly minted containers.
///
/// Arbitrarily high so it stays clear of identifiers already present in an
/// export without having to scan for their maximum. This is a convention, not a
/// guarantee against every external identifier space.
pub const NEW_CONTAINER_ID_START: i64 = 1_000_000_000_000_000;

/// Existing identifiers this close to `i64::MAX` are ignored when choosing the
/// first new identifier, leaving room to allocate without overflow
const ID_HEADROOM: i64 = 1 << 32;

/// Monotonic identifier source for new containers
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: i64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::starting_at(NEW_CONTAINER_ID_START)
    }

    pub fn starting_at(first: i64) -> Self {
        Self { next: first }
    }

    /// Hand out the next identifier
    pub fn allocate(&mut self) -> i64 {
        let id = self.next;
        self.next = self.next.saturating_add(1);
        id
    }

    /// Identifier the next call to `allocate` will return
    pub fn peek(&self) -> i64 {
        self.next
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable state threaded through the structural stages of one run
#[derive(Debug, Clone)]
pub struct EditContext {
    pub ids: IdAllocator,
    pub now: DateTime<Utc>,
    pub repository_id: Option<Value>,
}

impl EditContext {
    pub fn new(now: DateTime<Utc>, repository_id: Option<Value>) -> Self {
        Self {
            ids: IdAllocator::new(),
            now,
            repository_id,
        }
    }

    /// Context for editing `store`.
    ///
    /// Identifiers start at [`NEW_CONTAINER_ID_START`], or just above the
    /// largest existing id when a previous run already used that range.
    /// Identifiers within `2^32` of `i64::MAX` are not counted.
    pub fn for_store(store: &NodeStore, now: DateTime<Utc>) -> Self {
        let ceiling = i64::MAX - ID_HEADROOM;
        let (below, above): (Vec<i64>, Vec<i64>) = store
            .containers()
            .iter()
            .map(|c| c.id)
            .partition(|&id| id < ceiling);

        if !above.is_empty() {
            tracing::warn!(
                "Ignoring {} container ids near i64::MAX when allocating new ids",
                above.len()
            );
        }

        let first = below
            .into_iter()
            .max()
            .map_or(NEW_CONTAINER_ID_START, |max| {
                (max + 1).max(NEW_CONTAINER_ID_START)
            });

        Self {
            ids: IdAllocator::starting_at(first),
            now,
            repository_id: store.repository_id(),
        }
    }

    /// Mint a container with the next identifier and this run's stamps
    pub fn mint(
        &mut self,
        kind: ContainerKind,
        parent_id: i64,
        position: i64,
        data: Value,
    ) -> Container {
        Container::new(
            self.ids.allocate(),
            kind,
            Some(parent_id),
            position,
            data,
            self.repository_id.clone(),
            self.now,
        )
    }
}
