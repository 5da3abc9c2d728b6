//! Property-based tests for the answer normalizer
//!
//! - JSON text normalizes back to the value it was rendered from
//! - Python-style literal text does too
//! - Arbitrary text never panics and unparseable text falls back to itself
//! - Lists of mappings merge into one mapping

use super::{clean_reply, normalize, normalize_list, normalize_mapping};
use proptest::prelude::*;
use serde_json::{Map, Value};

/// Values without floats, so rendering is exact
fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-100_000i64..100_000).prop_map(|n| Value::Number(n.into())),
        "[a-zA-Z0-9 _'\"\\\\]{0,20}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            proptest::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Render a value the way a Python-minded backend would
fn python_repr(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(python_repr).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("'{k}': {}", python_repr(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

proptest! {
    #[test]
    fn prop_json_text_round_trips(value in arb_value()) {
        let text = serde_json::to_string(&value).unwrap();
        prop_assert_eq!(normalize(&text), value);
    }

    #[test]
    fn prop_python_literal_round_trips(value in arb_value()) {
        let text = python_repr(&value);
        prop_assert_eq!(normalize(&text), value);
    }

    #[test]
    fn prop_normalize_never_panics(text in "\\PC{0,64}") {
        let value = normalize(&text);
        if let Value::String(s) = &value {
            // Either a real string literal or the cleaned text itself
            prop_assert!(s.len() <= clean_reply(&text).len());
        }
    }

    #[test]
    fn prop_prose_falls_back_to_trimmed_text(words in "[A-Z][a-z]{2,8}( [a-z]{1,8}){1,6}") {
        let padded = format!("  {words}\n");
        prop_assert_eq!(normalize(&padded), Value::String(words));
    }

    #[test]
    fn prop_lists_pass_through(items in proptest::collection::vec(arb_value(), 0..6)) {
        let text = serde_json::to_string(&items).unwrap();
        prop_assert_eq!(normalize_list(&text).unwrap(), items);
    }

    #[test]
    fn prop_list_of_single_entry_maps_merges(
        entries in proptest::collection::btree_map("[a-z]{1,6}", -1000i64..1000, 0..8)
    ) {
        let list: Vec<Value> = entries
            .iter()
            .map(|(k, v)| {
                let mut m = Map::new();
                m.insert(k.clone(), Value::from(*v));
                Value::Object(m)
            })
            .collect();
        let text = serde_json::to_string(&list).unwrap();
        let merged = normalize_mapping(&text).unwrap();
        let expected: Map<String, Value> =
            entries.into_iter().map(|(k, v)| (k, Value::from(v))).collect();
        prop_assert_eq!(merged, expected);
    }
}
