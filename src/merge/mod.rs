//! Deduplication of source descriptors and runtime tasks.
//!
//! Descriptors are merged on subscription-URL identity, falling back to the
//! provider domain for entries without a subscription. Merging is
//! order-preserving and first-seen-wins: the earliest entry keeps its
//! position and absorbs counters and filter fragments from later duplicates.
//!
//! Hand-maintained entries (multi-URL `sub` or a non-empty `renew`) are
//! never rewritten.
//!
//! # Example
//!
//! ```ignore
//! let merged = merge_descriptors(vec![
//!     SourceDescriptor::with_domain("a.com"),
//!     SourceDescriptor::with_domain("a.com"),
//! ]);
//! assert_eq!(merged.len(), 1);
//! ```

mod descriptors;
mod tasks;

pub use descriptors::{merge_descriptors, merge_values, parse_descriptors};
pub use tasks::{dedup_tasks, task_exists, TaskConfig};
