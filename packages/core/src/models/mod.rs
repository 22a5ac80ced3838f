//! Data Models
//!
//! This module contains the node structures of an exported course:
//!
//! - `Container` - Structural nodes (folder, page, section container, section, leaf-containers)
//! - `ContentItem` - Learner-facing leaves owned by leaf-containers
//! - `payload` - Fallback-first accessors for loosely-typed `data`/`meta` payloads
//!
//! Both node kinds keep unknown fields verbatim so an edited export can be
//! re-imported without losing data the engine never looked at.

mod container;
mod content_item;
pub mod payload;


pub use container::{Container, ContainerKind};
pub use content_item::{ContentItem, ContentKind, OUTPUT_ONLY};
