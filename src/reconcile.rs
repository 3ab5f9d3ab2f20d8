//! Liveness reconciliation.
//!
//! Decides which descriptors survive into the next snapshot from this
//! cycle's liveness results. Failure counters are only read here; the fetch
//! layer increments them before reconciliation runs.

use crate::types::{AliveMap, SourceDescriptor, Sub};
use tracing::{debug, info};

/// Filter and age `domains` against this cycle's liveness results.
///
/// Returns `domains` unchanged when `alive` is empty.
pub fn reconcile(domains: Vec<SourceDescriptor>, alive: &AliveMap) -> Vec<SourceDescriptor> {
    if alive.is_empty() {
        return domains;
    }

    let before = domains.len();
    let kept: Vec<SourceDescriptor> = domains
        .into_iter()
        .filter_map(|descriptor| reconcile_one(descriptor, alive))
        .collect();

    info!(before, after = kept.len(), "reconciled source descriptors");
    kept
}

fn reconcile_one(
    mut descriptor: SourceDescriptor,
    alive: &AliveMap,
) -> Option<SourceDescriptor> {
    let confirmed = match descriptor.sub.normalized() {
        Sub::Single(sub) => alive.get(&sub).copied().unwrap_or(false),
        Sub::Many(_) => true,
    };

    if descriptor.origin.is_pinned() || confirmed {
        descriptor.errors = None;
        descriptor.debut = None;
        return Some(descriptor);
    }

    let errors = descriptor.errors.unwrap_or(1);
    let expire = descriptor.origin.expire();
    if errors < expire && !descriptor.debut.unwrap_or(false) {
        descriptor.debut = None;
        return Some(descriptor);
    }

    debug!(
        domain = %descriptor.domain,
        origin = %descriptor.origin,
        errors,
        expire,
        "expiring source descriptor"
    );
    None
}
