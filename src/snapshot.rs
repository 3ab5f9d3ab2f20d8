//! The configuration snapshot document.
//!
//! A snapshot is loaded, reconciled in place and then either discarded or
//! serialized and republished. Top-level keys this crate does not model are
//! carried through unchanged.

use crate::error::{ReconcileError, Result};
use crate::merge::parse_descriptors;
use crate::types::{PushConfig, SourceDescriptor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Options for one publish run.
#[derive(Clone, Debug, Default)]
pub struct PublishOptions {
    /// Also write the published snapshot here (overwritten).
    pub filepath: Option<PathBuf>,

    /// Skip defeat bookkeeping for crawled subscriptions.
    pub skip_remark: bool,
}

/// Top-level configuration document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, deserialize_with = "lenient_descriptors")]
    pub domains: Vec<SourceDescriptor>,

    /// Named push destinations.
    #[serde(default)]
    pub groups: Map<String, Value>,

    /// Destination of the snapshot itself, plus the `enable` switch.
    #[serde(default)]
    pub update: PushConfig,

    #[serde(default)]
    pub crawl: Map<String, Value>,

    #[serde(default = "default_threshold")]
    pub threshold: i64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_threshold() -> i64 {
    1
}

fn lenient_descriptors<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<SourceDescriptor>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(parse_descriptors(values))
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            domains: Vec::new(),
            groups: Map::new(),
            update: PushConfig::new(),
            crawl: Map::new(),
            threshold: default_threshold(),
            extra: Map::new(),
        }
    }
}

impl Snapshot {
    pub fn new(domains: Vec<SourceDescriptor>) -> Self {
        Self {
            domains,
            ..Default::default()
        }
    }

    /// Parse a snapshot. Malformed `domains` elements are logged and dropped.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| ReconcileError::Deserialization(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Compact JSON encoding of the whole document.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Whether the main update is switched on.
    pub fn update_enabled(&self) -> bool {
        self.update
            .get("enable")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Defeat threshold, never below 1.
    pub fn threshold(&self) -> u32 {
        self.threshold.clamp(1, i64::from(u32::MAX)) as u32
    }

    /// Destination config of a named group.
    pub fn group(&self, name: &str) -> Option<&PushConfig> {
        self.groups.get(name).and_then(Value::as_object)
    }

    /// Group named by `crawl.persist.subs`.
    pub fn remark_group_name(&self) -> Option<&str> {
        self.crawl
            .get("persist")
            .and_then(|p| p.get("subs"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Destination of the crawled-subscription history.
    pub fn remark_destination(&self) -> Option<&PushConfig> {
        self.remark_group_name().and_then(|name| self.group(name))
    }
}

/// SHA-256 hex digest of a serialized document.
pub fn digest(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
