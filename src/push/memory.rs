//! In-process push transport.

use super::{conf_str, PushTo};
use crate::error::{ReconcileError, Result};
use crate::types::PushConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

const SCHEME: &str = "memory://";

/// One recorded push.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushRecord {
    pub name: String,
    pub group: String,
    pub content: String,
}

/// Push transport keeping documents in memory.
///
/// Destinations are configs with a non-empty `name` field.
#[derive(Debug, Default)]
pub struct MemoryPush {
    /// Current document per destination name.
    documents: Mutex<HashMap<String, String>>,
    /// Every successful push, in order.
    pushes: Mutex<Vec<PushRecord>>,
    /// Reject all pushes when set.
    fail_pushes: AtomicBool,
}

impl MemoryPush {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the document stored under `name`.
    pub fn with_document(self, name: &str, content: &str) -> Self {
        self.documents
            .lock()
            .insert(name.to_string(), content.to_string());
        self
    }

    /// Make subsequent pushes fail.
    pub fn set_fail_pushes(&self, fail: bool) {
        self.fail_pushes.store(fail, Ordering::SeqCst);
    }

    pub fn document(&self, name: &str) -> Option<String> {
        self.documents.lock().get(name).cloned()
    }

    pub fn pushes(&self) -> Vec<PushRecord> {
        self.pushes.lock().clone()
    }

    pub fn push_count(&self) -> usize {
        self.pushes.lock().len()
    }
}

impl PushTo for MemoryPush {
    fn validate(&self, conf: &PushConfig) -> bool {
        conf_str(conf, "name").is_some()
    }

    fn raw_url(&self, conf: &PushConfig) -> Option<String> {
        conf_str(conf, "name").map(|name| format!("{SCHEME}{name}"))
    }

    fn fetch(&self, url: &str) -> Result<String> {
        let name = url.strip_prefix(SCHEME).unwrap_or(url);
        self.document(name).ok_or_else(|| ReconcileError::Fetch {
            url: url.to_string(),
            reason: "no such document".to_string(),
        })
    }

    fn push_to(&self, content: &str, conf: &PushConfig, group: &str) -> Result<()> {
        let name = conf_str(conf, "name").ok_or_else(|| {
            ReconcileError::InvalidDestination(format!("group {group} has no name"))
        })?;

        if self.fail_pushes.load(Ordering::SeqCst) {
            return Err(ReconcileError::Push {
                group: group.to_string(),
                reason: "push rejected".to_string(),
            });
        }

        self.documents
            .lock()
            .insert(name.to_string(), content.to_string());
        self.pushes.lock().push(PushRecord {
            name: name.to_string(),
            group: group.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }
}
