//! Fetch collaborator interface and proxy node helpers.

use crate::error::Result;
use crate::merge::TaskConfig;
use crate::push::{PushTo, NODES_GROUP};
use crate::types::PushConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info};

/// Proxies and credentials returned for one task.
#[derive(Clone, Debug, Default)]
pub struct FetchResult {
    /// Normalized proxy mappings (at least `name`, `server`, `port`, `type`).
    pub proxies: Vec<Value>,
    pub cookie: Option<String>,
    pub authorization: Option<String>,
}

/// Turns a task into proxy node records.
pub trait Fetcher {
    fn fetch(&self, task: &TaskConfig) -> Result<FetchResult>;
}

/// Identity fields of a proxy node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyNode {
    pub name: String,
    pub server: String,
    pub port: u16,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ProxyNode {
    /// Extract the identity fields, or `None` if any is missing or mistyped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let proxy = value.as_object()?;
        Some(Self {
            name: proxy.get("name")?.as_str()?.to_string(),
            server: proxy.get("server")?.as_str()?.to_string(),
            port: u16::try_from(proxy.get("port")?.as_u64()?).ok()?,
            kind: proxy.get("type")?.as_str()?.to_string(),
        })
    }
}

/// Identity fields of every well-formed proxy.
pub fn extract_nodes(proxies: &[Value]) -> Vec<ProxyNode> {
    proxies.iter().filter_map(ProxyNode::from_value).collect()
}

/// Run one task, returning its id and proxies. Fetch failures yield no proxies.
///
/// With a `nodes` destination, the identity fields of the fetched proxies are
/// also pushed to the `nodes-list` group. That push never affects the result.
pub fn execute<F, P>(
    fetcher: &F,
    push: &P,
    nodes: Option<&PushConfig>,
    task: &TaskConfig,
) -> (i64, Vec<Value>)
where
    F: Fetcher + ?Sized,
    P: PushTo + ?Sized,
{
    info!(name = %task.name, index = task.index, domain = %task.domain, "start fetch proxy");

    let proxies = match fetcher.fetch(task) {
        Ok(result) => result.proxies,
        Err(e) => {
            error!(name = %task.name, "fetch proxy failed: {}", e);
            Vec::new()
        }
    };

    info!(
        name = %task.name,
        index = task.index,
        count = proxies.len(),
        "finished fetch proxy"
    );

    if let Some(conf) = nodes {
        let list = extract_nodes(&proxies);
        if !list.is_empty() {
            push_node_list(push, conf, task, &list);
        }
    }

    (task.taskid, proxies)
}

/// Push a task's node list as pretty JSON to the `nodes-list` group.
///
/// The destination is `conf` with `filename` (`<task>_nodes.json`) and
/// `description` filled in for the task. Failures are logged; returns whether
/// the list was pushed.
pub fn push_node_list<P: PushTo + ?Sized>(
    push: &P,
    conf: &PushConfig,
    task: &TaskConfig,
    nodes: &[ProxyNode],
) -> bool {
    if nodes.is_empty() {
        error!(name = %task.name, "[PushError] nodes list is empty");
        return false;
    }

    let filename = format!("{}_nodes.json", task.name);
    let mut conf = conf.clone();
    conf.insert("filename".to_string(), Value::from(filename.as_str()));
    conf.insert(
        "description".to_string(),
        Value::from(format!("{} Pure Node List", task.name)),
    );

    if !push.validate(&conf) {
        error!(name = %task.name, "[PushError] nodes list destination is invalid");
        return false;
    }

    let result = serde_json::to_string_pretty(nodes)
        .map_err(Into::into)
        .and_then(|content| push.push_to(&content, &conf, NODES_GROUP));
    match result {
        Ok(()) => {
            info!(file = %filename, count = nodes.len(), "[PushInfo] pushed node list");
            true
        }
        Err(e) => {
            error!(name = %task.name, "[PushError] push node list failed: {}", e);
            false
        }
    }
}

/// Split proxies into those to probe and those to publish unchecked.
///
/// The `liveness` flag (default true) is removed from both sides; unchecked
/// proxies also lose `sub` and `chatgpt`. Non-object entries are dropped.
pub fn split_by_liveness(
    proxies: Vec<Value>,
) -> (Vec<Map<String, Value>>, Vec<Map<String, Value>>) {
    let mut checks = Vec::new();
    let mut nochecks = Vec::new();

    for proxy in proxies {
        let Value::Object(mut proxy) = proxy else {
            continue;
        };

        let liveness = proxy
            .remove("liveness")
            .map(|v| !matches!(v, Value::Bool(false) | Value::Null))
            .unwrap_or(true);
        if liveness {
            checks.push(proxy);
        } else {
            proxy.remove("sub");
            proxy.remove("chatgpt");
            nochecks.push(proxy);
        }
    }

    (checks, nochecks)
}
