//! Core types for subscription-source configuration.

use crate::error::{ReconcileError, Result};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Subscription URL → confirmed alive this cycle.
///
/// A missing key means the URL was not checked.
pub type AliveMap = HashMap<String, bool>;

/// Opaque push destination config, interpreted by a [`crate::push::PushTo`].
pub type PushConfig = Map<String, Value>;

/// Persisted crawled-subscription history, keyed by subscription URL.
///
/// Kept as raw JSON: only entries being remarked are read as
/// [`CrawledRecord`], everything else is written back untouched.
pub type CrawledHistory = Map<String, Value>;

/// Subscription field of a descriptor.
///
/// The list form marks a manually curated entry that is never merged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sub {
    Single(String),
    Many(Vec<String>),
}

impl Default for Sub {
    fn default() -> Self {
        Sub::Single(String::new())
    }
}

impl Sub {
    /// True for an empty string or an empty list (untrimmed).
    pub fn is_empty(&self) -> bool {
        match self {
            Sub::Single(s) => s.is_empty(),
            Sub::Many(v) => v.is_empty(),
        }
    }

    /// Collapse a list of at most one URL into the single form.
    pub fn normalized(&self) -> Sub {
        match self {
            Sub::Many(v) if v.len() <= 1 => {
                Sub::Single(v.first().cloned().unwrap_or_default())
            }
            other => other.clone(),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Sub::Many(_))
    }

    pub fn as_single(&self) -> Option<&str> {
        match self {
            Sub::Single(s) => Some(s),
            Sub::Many(_) => None,
        }
    }
}

impl From<&str> for Sub {
    fn from(s: &str) -> Self {
        Sub::Single(s.to_string())
    }
}

/// Ordered regex alternation fragments, joined with `|` on read.
///
/// Serialized as the joined string so the document format stays a plain
/// `|`-separated pattern. Two sets are equal when their joined patterns are.
#[derive(Clone, Debug, Default)]
pub struct PatternSet(Vec<String>);

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding one fragment, or an empty set for an empty string.
    pub fn from_fragment(fragment: impl Into<String>) -> Self {
        let mut set = Self::new();
        set.push(fragment);
        set
    }

    /// Append a fragment. Empty fragments are ignored.
    pub fn push(&mut self, fragment: impl Into<String>) {
        let fragment = fragment.into();
        if !fragment.is_empty() {
            self.0.push(fragment);
        }
    }

    /// Append every fragment of `other`, preserving order.
    pub fn extend(&mut self, other: &PatternSet) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fragments(&self) -> &[String] {
        &self.0
    }

    pub fn joined(&self) -> String {
        self.0.join("|")
    }
}

impl PartialEq for PatternSet {
    fn eq(&self, other: &Self) -> bool {
        self.joined() == other.joined()
    }
}

impl Eq for PatternSet {}

impl fmt::Display for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.joined())
    }
}

impl Serialize for PatternSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.joined())
    }
}

impl<'de> Deserialize<'de> for PatternSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(PatternSet::from_fragment(raw))
    }
}

/// Provenance of a descriptor. Drives the expiry tolerance.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Origin {
    Temporary,
    Owned,
    Page,
    Repo,
    Github,
    Google,
    Yandex,
    Telegram,
    Twitter,
    V2raySe,
    Scripts,
    Remain,
    #[default]
    Unset,
    Other(String),
}

/// Error tolerance for tags missing from the table.
const DEFAULT_EXPIRE: u32 = 5;

impl Origin {
    pub fn as_str(&self) -> &str {
        match self {
            Origin::Temporary => "TEMPORARY",
            Origin::Owned => "OWNED",
            Origin::Page => "PAGE",
            Origin::Repo => "REPO",
            Origin::Github => "GITHUB",
            Origin::Google => "GOOGLE",
            Origin::Yandex => "YANDEX",
            Origin::Telegram => "TELEGRAM",
            Origin::Twitter => "TWITTER",
            Origin::V2raySe => "V2RAYSE",
            Origin::Scripts => "SCRIPTS",
            Origin::Remain => "REMAIN",
            Origin::Unset => "",
            Origin::Other(tag) => tag,
        }
    }

    /// Consecutive-failure count at which a source expires. Larger is more tolerant.
    pub fn expire(&self) -> u32 {
        match self {
            Origin::Temporary | Origin::Owned => 10,
            Origin::Telegram | Origin::Twitter | Origin::V2raySe | Origin::Scripts => 3,
            Origin::Page
            | Origin::Repo
            | Origin::Github
            | Origin::Google
            | Origin::Yandex
            | Origin::Remain => 5,
            Origin::Unset | Origin::Other(_) => DEFAULT_EXPIRE,
        }
    }

    /// Sources that survive reconciliation regardless of liveness.
    pub fn is_pinned(&self) -> bool {
        matches!(self, Origin::Temporary | Origin::Owned)
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Origin::Unset)
    }
}

impl From<String> for Origin {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "TEMPORARY" => Origin::Temporary,
            "OWNED" => Origin::Owned,
            "PAGE" => Origin::Page,
            "REPO" => Origin::Repo,
            "GITHUB" => Origin::Github,
            "GOOGLE" => Origin::Google,
            "YANDEX" => Origin::Yandex,
            "TELEGRAM" => Origin::Telegram,
            "TWITTER" => Origin::Twitter,
            "V2RAYSE" => Origin::V2raySe,
            "SCRIPTS" => Origin::Scripts,
            "REMAIN" => Origin::Remain,
            "" => Origin::Unset,
            _ => Origin::Other(tag),
        }
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        match origin {
            Origin::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured subscription source ("domains" entry).
///
/// Keys this type does not model are kept in `extra` and written back
/// unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Provider site. Required when `sub` is empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain: String,

    #[serde(default)]
    pub sub: Sub,

    #[serde(default, skip_serializing_if = "Origin::is_unset")]
    pub origin: Origin,

    /// Consecutive-failure counter. Integral floats such as `2.0` are accepted.
    #[serde(
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub errors: Option<u32>,

    /// Never yet confirmed alive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debut: Option<bool>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rename: String,

    #[serde(default, skip_serializing_if = "PatternSet::is_empty")]
    pub exclude: PatternSet,

    #[serde(default, skip_serializing_if = "PatternSet::is_empty")]
    pub include: PatternSet,

    /// Traffic renewal parameters. Present and non-empty marks a hand-maintained entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renew: Option<Map<String, Value>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SourceDescriptor {
    /// Descriptor identified by provider site only.
    pub fn with_domain(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Default::default()
        }
    }

    /// Descriptor identified by a single subscription URL.
    pub fn with_sub(sub: impl Into<String>) -> Self {
        Self {
            sub: Sub::Single(sub.into()),
            ..Default::default()
        }
    }

    /// Parse and validate one raw "domains" element.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(ReconcileError::MalformedDescriptor(format!(
                "need type 'object' but got '{}'",
                json_kind(&value)
            )));
        }

        let descriptor: SourceDescriptor = serde_json::from_value(value)
            .map_err(|e| ReconcileError::MalformedDescriptor(e.to_string()))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// A descriptor must name either a site or a subscription.
    pub fn validate(&self) -> Result<()> {
        let sub = self.sub.normalized();
        if self.domain.trim().is_empty() && sub.as_single().map(str::trim) == Some("") {
            return Err(ReconcileError::MalformedDescriptor(
                "descriptor has neither domain nor sub".to_string(),
            ));
        }
        Ok(())
    }

    pub fn has_renew(&self) -> bool {
        self.renew.as_ref().is_some_and(|r| !r.is_empty())
    }

    /// Hand-maintained entries are never merged.
    pub fn is_merge_exempt(&self) -> bool {
        self.sub.normalized().is_list() || self.has_renew()
    }
}

/// Read a non-negative counter written either as an integer or a float.
///
/// Fractions are truncated, which keeps `count < limit` unchanged for any
/// integer limit.
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };

    let count = match &value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        _ => None,
    };
    count
        .map(|c| Some(u32::try_from(c).unwrap_or(u32::MAX)))
        .ok_or_else(|| {
            de::Error::custom(format!(
                "invalid errors counter: need a non-negative number but got {}",
                value
            ))
        })
}

/// One entry of the crawled-subscription history.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawledRecord {
    /// Consecutive liveness failures.
    #[serde(default)]
    pub defeat: u32,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CrawledRecord {
    pub fn new(defeat: u32) -> Self {
        Self {
            defeat,
            extra: Map::new(),
        }
    }

    /// Read one history entry.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| ReconcileError::Deserialization(e.to_string()))
    }

    pub fn into_value(self) -> Value {
        let mut entry = self.extra;
        entry.insert("defeat".to_string(), Value::from(self.defeat));
        Value::Object(entry)
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
