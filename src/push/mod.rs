//! Push transports for published documents.
//!
//! The publisher talks to the remote store only through [`PushTo`]. Two
//! transports ship with the crate:
//! - [`MemoryPush`]: keeps documents in process and records every push
//! - [`LocalPush`]: writes each destination to a file under a root directory

mod local;
mod memory;

pub use local::LocalPush;
pub(crate) use local::write_locked;
pub use memory::{MemoryPush, PushRecord};

use crate::error::Result;
use crate::types::PushConfig;

/// Logical group for the configuration snapshot.
pub const UPDATE_GROUP: &str = "update";

/// Logical group for the crawled-subscription history.
pub const REMARK_GROUP: &str = "crawled-remark";

/// Logical group for per-task node lists.
pub const NODES_GROUP: &str = "nodes-list";

/// Remote store collaborator.
pub trait PushTo {
    /// Whether `conf` describes a usable destination.
    fn validate(&self, conf: &PushConfig) -> bool;

    /// Location the destination's current content can be fetched from.
    fn raw_url(&self, conf: &PushConfig) -> Option<String>;

    /// Fetch the content stored at `url`.
    fn fetch(&self, url: &str) -> Result<String>;

    /// Replace the destination's content.
    fn push_to(&self, content: &str, conf: &PushConfig, group: &str) -> Result<()>;
}

impl<T: PushTo + ?Sized> PushTo for &T {
    fn validate(&self, conf: &PushConfig) -> bool {
        (**self).validate(conf)
    }

    fn raw_url(&self, conf: &PushConfig) -> Option<String> {
        (**self).raw_url(conf)
    }

    fn fetch(&self, url: &str) -> Result<String> {
        (**self).fetch(url)
    }

    fn push_to(&self, content: &str, conf: &PushConfig, group: &str) -> Result<()> {
        (**self).push_to(content, conf, group)
    }
}

/// Non-empty string field of a destination config.
pub(crate) fn conf_str<'a>(conf: &'a PushConfig, key: &str) -> Option<&'a str> {
    conf.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
