//! Property-based tests for the store against a local model
//!
//! - After any sequence of saves and deletes, `all()` equals the same
//!   sequence applied to an empty map
//! - `undo(n)` leaves the store as if only the earlier mutations had run
//! - `filter()` returns the values of matching keys whatever the save order

use super::{KeyValueStore, StoreOptions};
use crate::credentials::{SessionCredentials, SharedCredentials};
use crate::dialogue::RetryPolicy;
use crate::transport::testing::SimulatedOracle;
use proptest::prelude::*;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Mutation {
    Save(String, i64),
    Delete(String),
}

fn arb_mutation() -> impl Strategy<Value = Mutation> {
    let key = prop_oneof![Just("a"), Just("b"), Just("xx"), Just("xy")].prop_map(str::to_string);
    prop_oneof![
        3 => (key.clone(), -1000i64..1000).prop_map(|(k, v)| Mutation::Save(k, v)),
        1 => key.prop_map(Mutation::Delete),
    ]
}

/// Distinct keys, some matching `x[x-y]`, in random order
fn arb_entries() -> impl Strategy<Value = Vec<(String, i64)>> {
    proptest::collection::btree_map("x?[a-z]{1,2}", -1000i64..1000, 0..8)
        .prop_map(|m| m.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

async fn filtered_after_saving(entries: &[(String, i64)], pattern: &str) -> Vec<i64> {
    let mut store = started_store().await;
    for (k, v) in entries {
        store.save(k, *v).await.unwrap();
    }
    let mut values: Vec<i64> = store
        .filter(pattern)
        .await
        .unwrap()
        .iter()
        .filter_map(Value::as_i64)
        .collect();
    values.sort_unstable();
    values
}

fn replay(mutations: &[Mutation]) -> Map<String, Value> {
    let mut model = BTreeMap::new();
    for mutation in mutations {
        match mutation {
            Mutation::Save(k, v) => {
                model.insert(k.clone(), Value::from(*v));
            }
            Mutation::Delete(k) => {
                model.remove(k);
            }
        }
    }
    model.into_iter().collect()
}

async fn apply(store: &mut KeyValueStore, mutations: &[Mutation]) {
    for mutation in mutations {
        match mutation {
            Mutation::Save(k, v) => store.save(k, *v).await.unwrap(),
            Mutation::Delete(k) => store.delete(k).await.unwrap(),
        };
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn started_store() -> KeyValueStore {
    let options = StoreOptions {
        retry: RetryPolicy::immediate(),
        ..StoreOptions::default()
    };
    let credentials = SharedCredentials::new(SessionCredentials::new("session"));
    let mut store = KeyValueStore::new(Arc::new(SimulatedOracle::new()), credentials, options);
    store.start().await.unwrap();
    store
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_all_matches_replay(mutations in proptest::collection::vec(arb_mutation(), 0..12)) {
        let all = runtime().block_on(async {
            let mut store = started_store().await;
            apply(&mut store, &mutations).await;
            store.all().await.unwrap()
        });
        prop_assert_eq!(all, replay(&mutations));
    }

    #[test]
    fn prop_undo_drops_latest_mutations(
        mutations in proptest::collection::vec(arb_mutation(), 1..10),
        seed in any::<prop::sample::Index>(),
    ) {
        let n = seed.index(mutations.len()) + 1;
        let (all, log) = runtime().block_on(async {
            let mut store = started_store().await;
            apply(&mut store, &mutations).await;
            store.undo(n).await.unwrap();
            (store.all().await.unwrap(), store.get_log().await.unwrap())
        });
        let kept = &mutations[..mutations.len() - n];
        prop_assert_eq!(all, replay(kept));
        prop_assert_eq!(log.len(), kept.len());
    }

    #[test]
    fn prop_filter_ignores_insertion_order(entries in arb_entries()) {
        let pattern = "x[x-y]";
        let re = Regex::new(pattern).unwrap();
        let mut expected: Vec<i64> = entries
            .iter()
            .filter(|(k, _)| re.is_match(k))
            .map(|(_, v)| *v)
            .collect();
        expected.sort_unstable();

        let mut sorted = entries.clone();
        sorted.sort();
        let (shuffled, in_key_order) = runtime().block_on(async {
            (
                filtered_after_saving(&entries, pattern).await,
                filtered_after_saving(&sorted, pattern).await,
            )
        });
        prop_assert_eq!(&shuffled, &expected);
        prop_assert_eq!(&in_key_order, &expected);
    }
}
