// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Known-good CBOR vector tests.
//!
//! The vector covers every supported kind, both integer sign ranges at
//! every head width, and both definite- and indefinite-length arrays.

use arbor_cbor::{CodecError, Reader};

/// Known-good CBOR document:
/// `[null, false, true, [0..9223372036854775807], [_ -1..-9223372036854775808],
///   3.14159265359, "hello", h'776F726C64', {"a": "b", "c": "d"}]`
const TEST_VECTOR: &[u8] = &[
    0x89, // array(9)
    0xF6, // null
    0xF4, // false
    0xF5, // true
    0x8B, // array(11)
    0x00, // 0
    0x01, // 1
    0x17, // 23
    0x18, 0x18, // 24
    0x18, 0xFF, // 255
    0x19, 0x01, 0x00, // 256
    0x19, 0xFF, 0xFF, // 65535
    0x1A, 0x00, 0x01, 0x00, 0x00, // 65536
    0x1A, 0xFF, 0xFF, 0xFF, 0xFF, // 4294967295
    0x1B, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, // 4294967296
    0x1B, 0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // i64::MAX
    0x9F, // array(*)
    0x20, // -1
    0x37, // -24
    0x38, 0x18, // -25
    0x38, 0xFF, // -256
    0x39, 0x01, 0x00, // -257
    0x39, 0xFF, 0xFF, // -65536
    0x3A, 0x00, 0x01, 0x00, 0x00, // -65537
    0x3A, 0xFF, 0xFF, 0xFF, 0xFF, // -4294967296
    0x3B, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, // -4294967297
    0x3B, 0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // i64::MIN
    0xFF, // break
    0xFB, 0x40, 0x09, 0x21, 0xFB, 0x54, 0x44, 0x2E, 0xEA, // 3.14159265359
    0x65, 0x68, 0x65, 0x6C, 0x6C, 0x6F, // "hello"
    0x45, 0x77, 0x6F, 0x72, 0x6C, 0x64, // h'776F726C64' ("world")
    0xA2, // map(2)
    0x61, 0x61, // "a"
    0x61, 0x62, // "b"
    0x61, 0x63, // "c"
    0x61, 0x64, // "d"
];

#[test]
fn known_vector_decodes() {
    let reader = Reader::new(TEST_VECTOR).unwrap();
    assert!(reader.is_array());
    let root = reader.as_array().unwrap();
    assert_eq!(root.len(), 9);

    assert!(root.at(0).unwrap().is_null());
    root.at(0).unwrap().as_null().unwrap();
    assert!(root.at(1).unwrap().is_bool());
    assert!(!root.at(1).unwrap().as_bool().unwrap());
    assert!(root.at(2).unwrap().as_bool().unwrap());

    let unsigned = root.at(3).unwrap().as_array().unwrap();
    let expected: [i64; 11] = [
        0,
        1,
        23,
        24,
        255,
        256,
        65535,
        65536,
        4_294_967_295,
        4_294_967_296,
        i64::MAX,
    ];
    assert_eq!(unsigned.len(), expected.len());
    for (i, want) in expected.iter().enumerate() {
        assert_eq!(unsigned.at(i).unwrap().as_int().unwrap(), *want);
    }

    let negative = root.at(4).unwrap().as_array().unwrap();
    let expected: [i64; 10] = [
        -1,
        -24,
        -25,
        -256,
        -257,
        -65536,
        -65537,
        -4_294_967_296,
        -4_294_967_297,
        i64::MIN,
    ];
    assert_eq!(negative.len(), expected.len());
    for (i, want) in expected.iter().enumerate() {
        assert_eq!(negative.at(i).unwrap().as_int().unwrap(), *want);
    }

    assert!(root.at(5).unwrap().is_float());
    assert_eq!(root.at(5).unwrap().as_float().unwrap(), 3.14159265359);
    assert_eq!(root.at(6).unwrap().as_string().unwrap(), "hello");
    assert_eq!(root.at(7).unwrap().as_binary().unwrap(), b"world");

    let map = root.at(8).unwrap().as_map().unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.at("a").unwrap().as_string().unwrap(), "b");
    assert_eq!(map.at("c").unwrap().as_string().unwrap(), "d");
}

#[test]
fn every_truncated_prefix_is_rejected() {
    for len in 0..TEST_VECTOR.len() - 1 {
        let result = Reader::new(&TEST_VECTOR[..len]);
        assert!(
            result.is_err(),
            "decoding should fail for truncated input of length {len}"
        );
    }
}

#[test]
fn garbage_after_document_is_rejected() {
    let mut bytes = TEST_VECTOR.to_vec();
    bytes.push(0x00);
    let err = Reader::new(&bytes).unwrap_err();
    assert!(matches!(err, CodecError::TrailingBytes { .. }));
}
