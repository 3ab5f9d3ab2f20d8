//! Property tests for merge and reconcile.

use airport_reconcile::{
    merge_descriptors, reconcile, remark, AliveMap, CrawledHistory, CrawledRecord, Origin,
    PatternSet, SourceDescriptor, Sub,
};
use proptest::prelude::*;
use serde_json::json;

fn origin() -> impl Strategy<Value = Origin> {
    prop_oneof![
        Just(Origin::Temporary),
        Just(Origin::Owned),
        Just(Origin::Telegram),
        Just(Origin::Page),
        Just(Origin::Unset),
    ]
}

fn sub() -> impl Strategy<Value = Sub> {
    prop_oneof![
        4 => prop::sample::select(vec!["", "u1", " u1", "u2", "u3"]).prop_map(Sub::from),
        1 => prop::collection::vec(prop::sample::select(vec!["u1", "u2", "u4"]), 0..3)
            .prop_map(|v| Sub::Many(v.into_iter().map(String::from).collect())),
    ]
}

fn descriptor() -> impl Strategy<Value = SourceDescriptor> {
    (
        prop::sample::select(vec!["a.com", "b.com", " a.com"]),
        sub(),
        origin(),
        prop::option::of(0u32..8),
        prop::option::of(any::<bool>()),
        prop::sample::select(vec!["", "r1", "r2"]),
        prop::sample::select(vec!["", "hk", "jp"]),
        any::<bool>(),
    )
        .prop_map(|(domain, sub, origin, errors, debut, rename, include, renewed)| {
            SourceDescriptor {
                domain: domain.to_string(),
                sub,
                origin,
                errors,
                debut,
                rename: rename.to_string(),
                include: PatternSet::from_fragment(include),
                renew: renewed.then(|| json!({"account": [1]}).as_object().unwrap().clone()),
                ..Default::default()
            }
        })
}

fn alive_map() -> impl Strategy<Value = AliveMap> {
    prop::collection::hash_map(
        prop::sample::select(vec!["u1", "u2", "u3", "u4"]).prop_map(String::from),
        any::<bool>(),
        0..4,
    )
}

proptest! {
    #[test]
    fn merge_is_idempotent(list in prop::collection::vec(descriptor(), 0..12)) {
        let once = merge_descriptors(list);
        let twice = merge_descriptors(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn merge_never_grows(list in prop::collection::vec(descriptor(), 0..12)) {
        let len = list.len();
        prop_assert!(merge_descriptors(list).len() <= len);
    }

    #[test]
    fn merge_keeps_distinct_domains(
        domains in prop::collection::hash_set("[a-z]{1,8}\\.com", 0..10),
    ) {
        let list: Vec<SourceDescriptor> =
            domains.iter().map(|d| SourceDescriptor::with_domain(d.as_str())).collect();
        prop_assert_eq!(merge_descriptors(list.clone()), list);
    }

    #[test]
    fn hand_maintained_entries_survive_unchanged(
        list in prop::collection::vec(descriptor(), 0..12),
    ) {
        let exempt: Vec<SourceDescriptor> =
            list.iter().filter(|d| d.is_merge_exempt()).cloned().collect();
        let merged = merge_descriptors(list);
        for entry in &exempt {
            prop_assert!(merged.contains(entry));
        }
    }

    #[test]
    fn reconcile_never_keeps_expired(
        list in prop::collection::vec(descriptor(), 0..12),
        alive in alive_map(),
    ) {
        prop_assume!(!alive.is_empty());
        for d in list {
            let confirmed = d
                .sub
                .normalized()
                .as_single()
                .map(|s| alive.get(s).copied().unwrap_or(false))
                .unwrap_or(true);
            let expired = !d.origin.is_pinned()
                && !confirmed
                && (d.errors.unwrap_or(1) >= d.origin.expire() || d.debut.unwrap_or(false));

            let kept = reconcile(vec![d], &alive);
            if expired {
                prop_assert!(kept.is_empty());
            } else {
                prop_assert_eq!(kept.len(), 1);
                prop_assert_eq!(kept[0].debut, None);
            }
        }
    }

    #[test]
    fn pinned_origins_always_survive(
        list in prop::collection::vec(descriptor(), 0..12),
        alive in alive_map(),
    ) {
        let pinned = list.iter().filter(|d| d.origin.is_pinned()).count();
        let kept = reconcile(list, &alive);
        prop_assert!(kept.iter().filter(|d| d.origin.is_pinned()).count() == pinned);
    }

    #[test]
    fn remark_respects_threshold(
        defeats in prop::collection::vec(0u32..6, 1..6),
        threshold in 1u32..5,
    ) {
        let history: CrawledHistory = defeats
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let url = format!("https://s{i}.com/link/abc?sub=1");
                (url, CrawledRecord::new(*d).into_value())
            })
            .collect();
        let invalid: Vec<String> = history.keys().cloned().collect();

        let (updated, count) = remark(history, &invalid, threshold);
        prop_assert_eq!(count, defeats.len());
        let limit = u64::from(threshold);
        prop_assert!(updated
            .values()
            .all(|r| r["defeat"].as_u64().is_some_and(|d| d <= limit)));
    }
}
