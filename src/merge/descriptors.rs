//! Descriptor merge engine.

use crate::types::{SourceDescriptor, Sub};
use serde_json::Value;
use tracing::{debug, error};

/// Parse raw "domains" elements, logging and skipping malformed ones.
pub fn parse_descriptors(values: Vec<Value>) -> Vec<SourceDescriptor> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(position, value)| match SourceDescriptor::from_value(value) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                error!(position, "[MergeError] skipping descriptor: {}", e);
                None
            }
        })
        .collect()
}

/// Parse then merge raw "domains" elements.
pub fn merge_values(values: Vec<Value>) -> Vec<SourceDescriptor> {
    merge_descriptors(parse_descriptors(values))
}

/// Merge duplicate descriptors, preserving first-seen order.
///
/// Each candidate is compared against the accepted entries in order and
/// folded into the first match. A candidate matching a hand-maintained entry
/// is dropped as a duplicate without touching that entry.
pub fn merge_descriptors(descriptors: Vec<SourceDescriptor>) -> Vec<SourceDescriptor> {
    let mut accepted: Vec<SourceDescriptor> = Vec::with_capacity(descriptors.len());

    for mut raw in descriptors {
        let sub = raw.sub.normalized();
        if sub.is_list() || raw.has_renew() {
            accepted.push(raw);
            continue;
        }
        raw.sub = sub;

        match accepted.iter_mut().find(|target| same_source(&raw, target)) {
            Some(target) if target.is_merge_exempt() => {
                debug!(domain = %raw.domain, "dropping duplicate of hand-maintained descriptor");
            }
            Some(target) => absorb(target, raw),
            None => accepted.push(raw),
        }
    }

    accepted
}

/// Identity test between a normalized candidate and an accepted entry.
fn same_source(raw: &SourceDescriptor, target: &SourceDescriptor) -> bool {
    let rsub = raw.sub.as_single().unwrap_or_default().trim();

    if target.sub.is_empty() {
        return rsub.is_empty() && raw.domain.trim() == target.domain.trim();
    }

    match &target.sub {
        Sub::Single(tsub) => rsub == tsub.trim(),
        Sub::Many(subs) => subs.iter().any(|s| s.trim() == rsub),
    }
}

/// Fold a duplicate into the accepted entry in place.
fn absorb(target: &mut SourceDescriptor, raw: SourceDescriptor) {
    if raw.errors.unwrap_or(0) > target.errors.unwrap_or(0) {
        target.errors = raw.errors;
    }

    // Only a still-debuting entry takes the incoming flag, so it can drop to false
    // but never return to true.
    if target.debut.unwrap_or(false) {
        target.debut = Some(raw.debut.unwrap_or(false));
    }

    if target.rename.is_empty() {
        target.rename = raw.rename;
    }

    target.exclude.extend(&raw.exclude);
    target.include.extend(&raw.include);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PatternSet;
    use serde_json::json;

    fn domain_entry(domain: &str, errors: u32) -> SourceDescriptor {
        SourceDescriptor {
            errors: Some(errors),
            ..SourceDescriptor::with_domain(domain)
        }
    }

    #[test]
    fn test_merge_same_domain() {
        let mut second = domain_entry("a.com", 2);
        second.rename = "x".to_string();

        let merged = merge_descriptors(vec![domain_entry("a.com", 0), second]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].domain, "a.com");
        assert_eq!(merged[0].sub, Sub::Single(String::new()));
        assert_eq!(merged[0].errors, Some(2));
        assert_eq!(merged[0].rename, "x");
    }

    #[test]
    fn test_merge_by_trimmed_sub() {
        let first = SourceDescriptor::with_sub("https://a.com/link/abc?sub=1");
        let mut second = SourceDescriptor::with_sub("  https://a.com/link/abc?sub=1 ");
        second.domain = "other.com".to_string();

        let merged = merge_descriptors(vec![first, second]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].domain, "");
    }

    #[test]
    fn test_sub_entries_do_not_match_domain_entries() {
        let mut with_sub = SourceDescriptor::with_sub("https://a.com/link/abc?sub=1");
        with_sub.domain = "a.com".to_string();

        let merged = merge_descriptors(vec![SourceDescriptor::with_domain("a.com"), with_sub]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_exclude_include_accumulate() {
        let mut first = SourceDescriptor::with_domain("a.com");
        first.include = PatternSet::from_fragment("hk");

        let mut second = SourceDescriptor::with_domain("a.com");
        second.exclude = PatternSet::from_fragment("expire");
        second.include = PatternSet::from_fragment("jp");

        let merged = merge_descriptors(vec![first, second]);
        assert_eq!(merged[0].exclude.joined(), "expire");
        assert_eq!(merged[0].include.joined(), "hk|jp");
    }

    #[test]
    fn test_rename_keeps_first_non_empty() {
        let mut first = SourceDescriptor::with_domain("a.com");
        first.rename = "first".to_string();
        let mut second = SourceDescriptor::with_domain("a.com");
        second.rename = "second".to_string();

        let merged = merge_descriptors(vec![first, second]);
        assert_eq!(merged[0].rename, "first");
    }

    #[test]
    fn test_debut_only_overwritten_while_true() {
        let mut debuting = SourceDescriptor::with_domain("a.com");
        debuting.debut = Some(true);
        let mut settled = SourceDescriptor::with_domain("a.com");
        settled.debut = Some(false);

        let merged = merge_descriptors(vec![debuting.clone(), settled.clone()]);
        assert_eq!(merged[0].debut, Some(false));

        let merged = merge_descriptors(vec![settled, debuting]);
        assert_eq!(merged[0].debut, Some(false));
    }

    #[test]
    fn test_single_element_list_is_collapsed() {
        let listed = SourceDescriptor {
            sub: Sub::Many(vec!["https://a.com/link/abc?sub=1".to_string()]),
            ..Default::default()
        };
        let plain = SourceDescriptor::with_sub("https://a.com/link/abc?sub=1");

        let merged = merge_descriptors(vec![listed, plain]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].sub, Sub::from("https://a.com/link/abc?sub=1"));
    }

    #[test]
    fn test_hand_maintained_entries_untouched() {
        let curated = SourceDescriptor {
            sub: Sub::Many(vec!["u1".to_string(), "u2".to_string()]),
            errors: Some(1),
            ..Default::default()
        };
        let mut duplicate = SourceDescriptor::with_sub("u2");
        duplicate.errors = Some(9);
        duplicate.include = PatternSet::from_fragment("hk");

        let merged = merge_descriptors(vec![curated.clone(), duplicate]);
        assert_eq!(merged, vec![curated]);
    }

    #[test]
    fn test_renew_entries_pass_through() {
        let mut renewed = SourceDescriptor::with_domain("a.com");
        renewed.renew = Some(json!({"account": [{"email": "x"}]}).as_object().unwrap().clone());

        let merged = merge_descriptors(vec![renewed.clone(), renewed.clone()]);
        assert_eq!(merged, vec![renewed.clone(), renewed]);
    }

    #[test]
    fn test_merge_values_skips_malformed() {
        let merged = merge_values(vec![
            json!({"domain": "a.com"}),
            json!("not-a-descriptor"),
            json!({"domain": "a.com", "errors": 3}),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].errors, Some(3));
    }
}
