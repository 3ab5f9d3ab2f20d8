//! Snapshot publishing.
//!
//! One publish run has two independent steps:
//! - remark: bump defeat counters of dead crawled subscriptions and push the
//!   history to the `crawled-remark` group
//! - update: merge and reconcile `domains`, then push the whole snapshot to
//!   the `update` group
//!
//! Neither step propagates errors. Failures are logged and reported in the
//! returned [`PublishReport`] so a scheduled run always completes.

use crate::error::{ReconcileError, Result};
use crate::merge::merge_descriptors;
use crate::push::{write_locked, PushTo, REMARK_GROUP, UPDATE_GROUP};
use crate::reconcile::reconcile;
use crate::remark::{invalid_subs, remark};
use crate::snapshot::{digest, PublishOptions, Snapshot};
use crate::types::{AliveMap, CrawledHistory};
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

/// Result of the remark step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemarkOutcome {
    /// Disabled, or no dead subscriptions this cycle.
    Skipped,
    /// No remark destination is configured or it failed validation.
    InvalidDestination,
    /// None of the dead subscriptions were in the history.
    Unchanged,
    /// History updated and pushed.
    Pushed { count: usize },
    Failed(String),
}

/// Result of the update step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Snapshot or transport was absent.
    MissingInput,
    /// `update.enable` is false.
    Disabled,
    InvalidDestination,
    /// Every source was pruned; nothing was pushed.
    EmptyDomains,
    Published { digest: String, domains: usize },
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishReport {
    pub remark: RemarkOutcome,
    pub update: PublishOutcome,
}

impl PublishReport {
    pub fn is_published(&self) -> bool {
        matches!(self.update, PublishOutcome::Published { .. })
    }
}

/// Publishes snapshots through a push transport.
#[derive(Debug)]
pub struct Publisher<P: PushTo> {
    push: P,
    options: PublishOptions,
}

impl<P: PushTo> Publisher<P> {
    pub fn new(push: P) -> Self {
        Self::with_options(push, PublishOptions::default())
    }

    pub fn with_options(push: P, options: PublishOptions) -> Self {
        Self { push, options }
    }

    pub fn options(&self) -> &PublishOptions {
        &self.options
    }

    /// Run the remark step, then reconcile and publish `snapshot`.
    ///
    /// `snapshot.domains` is replaced by the merged (and, with a non-empty
    /// `alive`, reconciled) list whenever the update step gets that far.
    pub fn publish(&self, snapshot: &mut Snapshot, alive: &AliveMap) -> PublishReport {
        let remark = self.remark_step(snapshot, alive);
        let update = match self.update(snapshot, alive) {
            Ok(outcome) => outcome,
            Err(ReconcileError::InvalidDestination(reason)) => {
                error!("[UpdateError] update config is invalid: {}", reason);
                PublishOutcome::InvalidDestination
            }
            Err(ReconcileError::EmptyDomains) => {
                error!("[UpdateError] skip update remote config because domains is empty");
                PublishOutcome::EmptyDomains
            }
            Err(e) => {
                error!("[UpdateError] update remote config failed: {}", e);
                PublishOutcome::Failed(e.to_string())
            }
        };

        PublishReport { remark, update }
    }

    fn remark_step(&self, snapshot: &Snapshot, alive: &AliveMap) -> RemarkOutcome {
        if self.options.skip_remark || alive.is_empty() {
            return RemarkOutcome::Skipped;
        }

        let invalid = invalid_subs(alive);
        if invalid.is_empty() {
            return RemarkOutcome::Skipped;
        }

        match self.remark_crawled(snapshot, &invalid) {
            Ok(0) => RemarkOutcome::Unchanged,
            Ok(count) => {
                info!(count, "[UpdateInfo] found {} invalid crawled subscriptions", count);
                RemarkOutcome::Pushed { count }
            }
            Err(ReconcileError::InvalidDestination(reason)) => {
                debug!("skip remark of crawled subscriptions: {}", reason);
                RemarkOutcome::InvalidDestination
            }
            Err(e) => {
                error!("[UpdateError] remark invalid crawled subscriptions failed: {}", e);
                RemarkOutcome::Failed(e.to_string())
            }
        }
    }

    fn remark_crawled(&self, snapshot: &Snapshot, invalid: &[String]) -> Result<usize> {
        let conf = snapshot
            .remark_destination()
            .filter(|conf| self.push.validate(conf))
            .ok_or_else(|| {
                ReconcileError::InvalidDestination(format!(
                    "group {:?} is missing or invalid",
                    snapshot.remark_group_name().unwrap_or_default()
                ))
            })?;

        let url = self.push.raw_url(conf).ok_or_else(|| {
            ReconcileError::InvalidDestination("remark destination has no raw url".to_string())
        })?;

        let content = self.push.fetch(&url)?;
        let history: CrawledHistory = serde_json::from_str(&content)
            .map_err(|e| ReconcileError::Deserialization(e.to_string()))?;

        let (history, count) = remark(history, invalid, snapshot.threshold());
        if count > 0 {
            let content = serde_json::to_string(&history)?;
            self.push.push_to(&content, conf, REMARK_GROUP)?;
        }
        Ok(count)
    }

    fn update(&self, snapshot: &mut Snapshot, alive: &AliveMap) -> Result<PublishOutcome> {
        if !snapshot.update_enabled() {
            debug!("[UpdateError] skip update remote config because enable=[false]");
            return Ok(PublishOutcome::Disabled);
        }

        if !self.push.validate(&snapshot.update) {
            return Err(ReconcileError::InvalidDestination(
                "update destination failed validation".to_string(),
            ));
        }

        let merged = merge_descriptors(std::mem::take(&mut snapshot.domains));
        snapshot.domains = reconcile(merged, alive);
        if snapshot.domains.is_empty() {
            return Err(ReconcileError::EmptyDomains);
        }

        let content = snapshot.to_json()?;
        if let Some(path) = &self.options.filepath {
            write_locked(path, &content)?;
        }

        self.push.push_to(&content, &snapshot.update, UPDATE_GROUP)?;

        let digest = digest(&content);
        info!(
            domains = snapshot.domains.len(),
            digest = %digest,
            "[UpdateInfo] published configuration snapshot"
        );
        Ok(PublishOutcome::Published {
            digest,
            domains: snapshot.domains.len(),
        })
    }
}

/// Publish with possibly absent inputs.
///
/// Does nothing but log an error when either `snapshot` or `push` is missing.
pub fn refresh<P: PushTo>(
    snapshot: Option<&mut Snapshot>,
    push: Option<P>,
    alive: &AliveMap,
    options: PublishOptions,
) -> PublishReport {
    match (snapshot, push) {
        (Some(snapshot), Some(push)) => {
            Publisher::with_options(push, options).publish(snapshot, alive)
        }
        (snapshot, _) => {
            let missing = if snapshot.is_none() { "snapshot" } else { "push transport" };
            error!(
                "[UpdateError] cannot update remote config: {}",
                ReconcileError::MissingCollaborator(missing)
            );
            PublishReport {
                remark: RemarkOutcome::Skipped,
                update: PublishOutcome::MissingInput,
            }
        }
    }
}

/// Remove `names` under `dir` when present. Returns how many were removed.
pub fn cleanup(dir: impl AsRef<Path>, names: &[&str]) -> Result<usize> {
    let mut removed = 0;
    for name in names {
        let path = dir.as_ref().join(name);
        if path.exists() {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}
