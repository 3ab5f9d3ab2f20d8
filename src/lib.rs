//! # Airport Reconcile
//!
//! Reconciliation and publishing of proxy-subscription source configuration.
//!
//! ## Core Concepts
//!
//! - **Descriptors**: `domains` entries describing one subscription source
//! - **Merge**: order-preserving deduplication on subscription/domain identity
//! - **Reconcile**: liveness-driven pruning with per-origin expiry
//! - **Remark**: defeat counters for dead crawled subscriptions
//! - **Publish**: serialize the snapshot and push it through a [`PushTo`]
//!
//! ## Example
//!
//! ```ignore
//! use airport_reconcile::{AliveMap, MemoryPush, Publisher, Snapshot};
//!
//! let mut snapshot = Snapshot::load("./config.json")?;
//! let alive: AliveMap = probe_subscriptions(&snapshot);
//!
//! let push = MemoryPush::new();
//! let report = Publisher::new(&push).publish(&mut snapshot, &alive);
//! assert!(report.is_published());
//! ```

pub mod error;
pub mod merge;
pub mod nodes;
pub mod publish;
pub mod push;
pub mod reconcile;
pub mod remark;
pub mod snapshot;
pub mod types;

// Re-exports
pub use error::{ReconcileError, Result};
pub use merge::{
    dedup_tasks, merge_descriptors, merge_values, parse_descriptors, task_exists, TaskConfig,
};
pub use nodes::{
    execute, extract_nodes, push_node_list, split_by_liveness, FetchResult, Fetcher, ProxyNode,
};
pub use publish::{cleanup, refresh, PublishOutcome, PublishReport, Publisher, RemarkOutcome};
pub use push::{
    LocalPush, MemoryPush, PushRecord, PushTo, NODES_GROUP, REMARK_GROUP, UPDATE_GROUP,
};
pub use reconcile::reconcile;
pub use remark::{invalid_subs, remark, standard_sub};
pub use snapshot::{digest, PublishOptions, Snapshot};
pub use types::*;
