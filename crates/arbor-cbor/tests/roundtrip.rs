// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Property test: every supported value survives a write/read cycle
//! structurally intact.

use arbor_cbor::{ArrayWriter, MapWriter, Reader, Writer};
use proptest::collection::vec;
use proptest::prelude::*;

/// A supported CBOR document, used as the property-test model.
#[derive(Debug, Clone)]
enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Map(Vec<(String, Value)>),
}

fn leaf_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        prop_oneof![
            -1.0e12_f64..1.0e12_f64,
            Just(0.0_f64),
            Just(f64::MIN),
            Just(f64::MAX),
        ]
        .prop_map(Value::Float),
        ".{0,24}".prop_map(Value::Text),
        vec(any::<u8>(), 0..24).prop_map(Value::Bytes),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    leaf_value().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            vec(inner.clone(), 0..6).prop_map(Value::Array),
            vec(("[a-z]{1,6}", inner), 0..6).prop_map(Value::Map),
        ]
    })
}

fn write_array_element(out: &mut ArrayWriter<'_>, value: &Value) {
    match value {
        Value::Null => out.append_null().unwrap(),
        Value::Bool(v) => out.append_bool(*v).unwrap(),
        Value::Int(v) => out.append_int(*v).unwrap(),
        Value::Float(v) => out.append_float(*v).unwrap(),
        Value::Text(v) => out.append_string(v).unwrap(),
        Value::Bytes(v) => out.append_binary(v).unwrap(),
        Value::Array(items) => {
            let mut nested = out.append_array().unwrap();
            for item in items {
                write_array_element(&mut nested, item);
            }
            nested.close().unwrap();
        }
        Value::Map(entries) => {
            let mut nested = out.append_map().unwrap();
            for (key, item) in entries {
                write_map_entry(&mut nested, key, item);
            }
            nested.close().unwrap();
        }
    }
}

fn write_map_entry(out: &mut MapWriter<'_>, key: &str, value: &Value) {
    match value {
        Value::Null => out.append_null(key).unwrap(),
        Value::Bool(v) => out.append_bool(key, *v).unwrap(),
        Value::Int(v) => out.append_int(key, *v).unwrap(),
        Value::Float(v) => out.append_float(key, *v).unwrap(),
        Value::Text(v) => out.append_string(key, v).unwrap(),
        Value::Bytes(v) => out.append_binary(key, v).unwrap(),
        Value::Array(items) => {
            let mut nested = out.append_array(key).unwrap();
            for item in items {
                write_array_element(&mut nested, item);
            }
            nested.close().unwrap();
        }
        Value::Map(entries) => {
            let mut nested = out.append_map(key).unwrap();
            for (entry_key, item) in entries {
                write_map_entry(&mut nested, entry_key, item);
            }
            nested.close().unwrap();
        }
    }
}

fn check_value(reader: &Reader<'_>, value: &Value) {
    match value {
        Value::Null => reader.as_null().unwrap(),
        Value::Bool(v) => assert_eq!(reader.as_bool().unwrap(), *v),
        Value::Int(v) => assert_eq!(reader.as_int().unwrap(), *v),
        Value::Float(v) => assert_eq!(reader.as_float().unwrap().to_bits(), v.to_bits()),
        Value::Text(v) => assert_eq!(&reader.as_string().unwrap(), v),
        Value::Bytes(v) => assert_eq!(&reader.as_binary().unwrap(), v),
        Value::Array(items) => {
            let array = reader.as_array().unwrap();
            assert_eq!(array.len(), items.len());
            for (i, item) in items.iter().enumerate() {
                check_value(array.at(i).unwrap(), item);
            }
        }
        Value::Map(entries) => {
            let map = reader.as_map().unwrap();
            // Duplicate keys collapse to the last occurrence.
            for (key, _) in entries {
                let expected = entries
                    .iter()
                    .rev()
                    .find_map(|(k, v)| (k == key).then_some(v))
                    .unwrap();
                check_value(map.at(key).unwrap(), expected);
            }
        }
    }
}

proptest! {
    #[test]
    fn write_then_read_preserves_structure(doc in vec(("[a-z]{1,6}", value()), 0..6)) {
        let mut buf = Vec::new();
        {
            let mut root = Writer::new(&mut buf).root().unwrap();
            for (key, item) in &doc {
                write_map_entry(&mut root, key, item);
            }
            root.close().unwrap();
        }

        let reader = Reader::new(&buf).unwrap();
        check_value(&reader, &Value::Map(doc.clone()));
    }
}
