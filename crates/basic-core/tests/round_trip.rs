//! # Conversion Laws
//!
//! Property tests for the guarantees every descriptor makes:
//!
//! 1. **Round-trip**: decoding an encoded value gives the value back, for
//!    both targets and through the `serde_json` bridge.
//! 2. **Order-free equality**: records built from the same fields in any
//!    order are equal and hash alike.
//! 3. **Arity**: a specialized tuple rejects any other element count.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use basic_core::types::{list_of, map_of, tuple_of, BYTES, DATETIME, FLOAT, INT, STR, TUPLE};
use basic_core::{b85, Descriptor, SchemaError, StructType, Target, Value, ValueMap};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

fn sample_schema() -> Descriptor {
    StructType::named("Sample")
        .field("id", INT)
        .field("name", STR)
        .field("blob", BYTES)
        .field("at", DATETIME)
        .field("scores", map_of(list_of(FLOAT)))
        .field("pair", tuple_of([STR, INT]))
        .field("note", STR.missing())
        .build()
}

fn timestamp() -> impl Strategy<Value = Value> {
    (0i64..4_000_000_000).prop_map(|secs| {
        Value::DateTime(Utc.timestamp_opt(secs, 0).single().unwrap_or_default())
    })
}

fn scores() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-z]{1,6}", prop::collection::vec(-1.0e9f64..1.0e9, 0..4), 0..4).prop_map(|m| {
        Value::Map(
            m.into_iter()
                .map(|(k, v)| (Value::Str(k), Value::List(v.into_iter().map(Value::Float).collect())))
                .collect::<ValueMap>(),
        )
    })
}

fn sample_fields() -> impl Strategy<Value = Vec<(String, Value)>> {
    (
        any::<i64>(),
        "[ -~]{0,20}",
        prop::collection::vec(any::<u8>(), 0..32),
        timestamp(),
        scores(),
        ("[a-z]{0,5}", any::<i64>()),
        prop::option::of("[a-z]{1,8}"),
    )
        .prop_map(|(id, name, blob, at, scores, (first, second), note)| {
            let mut fields = vec![
                ("id".to_string(), Value::Int(id)),
                ("name".to_string(), Value::Str(name)),
                ("blob".to_string(), Value::Bytes(blob)),
                ("at".to_string(), at),
                ("scores".to_string(), scores),
                ("pair".to_string(), Value::Tuple(vec![Value::Str(first), Value::Int(second)])),
            ];
            if let Some(note) = note {
                fields.push(("note".to_string(), Value::Str(note)));
            }
            fields
        })
}

fn hash_of(value: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

proptest! {
    /// Both targets decode back to the original record.
    #[test]
    fn record_round_trips(fields in sample_fields()) {
        let schema = sample_schema();
        let value = Value::Record(schema.new_record(fields).unwrap());
        for target in [Target::Json, Target::Bson] {
            let encoded = schema.to_encoded(&value, target).unwrap();
            prop_assert_eq!(&schema.from_encoded(&encoded, target).unwrap(), &value);
        }
    }

    /// The JSON target survives the trip through `serde_json`.
    #[test]
    fn record_round_trips_through_serde_json(fields in sample_fields()) {
        let schema = sample_schema();
        let value = Value::Record(schema.new_record(fields).unwrap());
        let json = schema.to_json(&value).unwrap();
        let text = serde_json::to_string(&json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        prop_assert_eq!(schema.from_json(parsed).unwrap(), value);
    }

    /// Insertion order never affects record equality or hashing.
    #[test]
    fn record_equality_ignores_order(
        (fields, shuffled) in sample_fields().prop_flat_map(|f| (Just(f.clone()), Just(f).prop_shuffle()))
    ) {
        let schema = sample_schema();
        let a = Value::Record(schema.new_record(fields).unwrap());
        let b = Value::Record(schema.new_record(shuffled).unwrap());
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(hash_of(&a), hash_of(&b));
    }

    /// A pair descriptor accepts exactly two elements; an open tuple any number.
    #[test]
    fn tuple_arity_is_enforced(items in prop::collection::vec(any::<i64>(), 0..6)) {
        let value = Value::Tuple(items.iter().copied().map(Value::Int).collect());
        let pair = tuple_of([INT, INT]);
        let result = pair.to_encoded(&value, Target::Json);
        if items.len() == 2 {
            prop_assert!(result.is_ok());
        } else {
            let is_arity_error = matches!(result, Err(SchemaError::Arity { .. }));
            prop_assert!(is_arity_error);
        }
        prop_assert!(TUPLE.to_encoded(&value, Target::Json).is_ok());
    }

    /// Base85 text decodes to the bytes it was made from.
    #[test]
    fn base85_round_trips(data in prop::collection::vec(any::<u8>(), 0..64)) {
        prop_assert_eq!(b85::decode(&b85::encode(&data)).unwrap(), data);
    }
}
