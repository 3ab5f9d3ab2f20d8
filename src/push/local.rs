//! Filesystem push transport.

use super::{conf_str, PushTo};
use crate::error::{ReconcileError, Result};
use crate::types::PushConfig;
use fs2::FileExt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

const SCHEME: &str = "file://";

/// Push transport writing each destination to a file.
///
/// Destinations are configs with a non-empty `path` field, resolved against
/// the root directory when relative.
#[derive(Clone, Debug)]
pub struct LocalPush {
    root: PathBuf,
}

impl LocalPush {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn target(&self, conf: &PushConfig) -> Option<PathBuf> {
        conf_str(conf, "path").map(|path| self.root.join(path))
    }
}

impl PushTo for LocalPush {
    fn validate(&self, conf: &PushConfig) -> bool {
        self.target(conf).is_some()
    }

    fn raw_url(&self, conf: &PushConfig) -> Option<String> {
        self.target(conf)
            .map(|path| format!("{SCHEME}{}", path.display()))
    }

    fn fetch(&self, url: &str) -> Result<String> {
        let path = url.strip_prefix(SCHEME).unwrap_or(url);
        fs::read_to_string(path).map_err(|e| ReconcileError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    fn push_to(&self, content: &str, conf: &PushConfig, group: &str) -> Result<()> {
        let target = self.target(conf).ok_or_else(|| {
            ReconcileError::InvalidDestination(format!("group {group} has no path"))
        })?;

        write_locked(&target, content).map_err(|e| ReconcileError::Push {
            group: group.to_string(),
            reason: e.to_string(),
        })?;

        debug!(group, path = %target.display(), bytes = content.len(), "pushed document");
        Ok(())
    }
}

/// Overwrite `path` with `content` under an exclusive lock, creating parent
/// directories as needed.
pub(crate) fn write_locked(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)?;

    file.lock_exclusive()?;
    let written = (|| -> std::io::Result<()> {
        file.set_len(0)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()
    })();
    FileExt::unlock(&file)?;

    written?;
    Ok(())
}
