//! Defeat bookkeeping for crawled subscriptions.

use crate::types::{AliveMap, CrawledHistory, CrawledRecord};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::warn;

static STANDARD_SUB_REGEX: OnceLock<Regex> = OnceLock::new();

fn standard_sub_regex() -> &'static Regex {
    STANDARD_SUB_REGEX.get_or_init(|| {
        Regex::new(
            r"(?xi)
            ^https?://
            (?:[a-z0-9\x{4e00}-\x{9fa5}\-]+\.)+[a-z0-9\x{4e00}-\x{9fa5}\-]+
            (?:
                # v2board style
                (?:/index\.php)?/api/v1/client/subscribe\?token=[a-z0-9]{16,32}
                |
                # sspanel style
                /link/[a-z0-9]+\?(?:sub|mu|clash)=\d
            )
            ",
        )
        .expect("Failed to compile subscription regex")
    })
}

/// Whether `url` has the shape of a panel-issued subscription link.
///
/// Only the prefix is checked; trailing query parameters are accepted.
pub fn standard_sub(url: &str) -> bool {
    standard_sub_regex().is_match(url)
}

/// Subscription URLs reported dead this cycle, sorted.
pub fn invalid_subs(alive: &AliveMap) -> Vec<String> {
    let mut subs: Vec<String> = alive
        .iter()
        .filter(|(_, ok)| !**ok)
        .map(|(sub, _)| sub.clone())
        .collect();
    subs.sort();
    subs
}

/// Bump the defeat counter of every known invalid subscription.
///
/// URLs missing from `history` are skipped, and blank entries (`null`, `{}`
/// and other empty values) are removed without being counted. A counted
/// entry is kept only while its counter stays within `threshold` and the URL
/// is still a standard subscription link. Entries that cannot be read as a
/// record are logged and left as they are. Returns the updated history and
/// how many entries were counted.
pub fn remark(
    mut history: CrawledHistory,
    invalid: &[String],
    threshold: u32,
) -> (CrawledHistory, usize) {
    let mut count = 0;

    for sub in invalid {
        let Some(entry) = history.remove(sub) else {
            continue;
        };
        if is_blank(&entry) {
            continue;
        }

        let mut record = match CrawledRecord::from_value(entry.clone()) {
            Ok(record) => record,
            Err(e) => {
                warn!(sub = %sub, "[UpdateError] unreadable crawled record left as is: {}", e);
                history.insert(sub.clone(), entry);
                continue;
            }
        };
        count += 1;

        let defeat = record.defeat.saturating_add(1);
        if defeat <= threshold && standard_sub(sub) {
            record.defeat = defeat;
            history.insert(sub.clone(), record.into_value());
        }
    }

    (history, count)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
