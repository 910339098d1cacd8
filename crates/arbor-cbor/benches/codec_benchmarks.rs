// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Encode/decode throughput for a representative tree-shaped document.

use arbor_cbor::{MapWriter, Reader, Writer};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn write_node(map: &mut MapWriter<'_>, depth: usize) {
    map.append_string("@t", "Directory").unwrap();
    map.append_int("@i", depth as i64).unwrap();
    map.append_string("name", "bench").unwrap();
    let mut entries = map.append_array("entries").unwrap();
    if depth > 0 {
        for _ in 0..3 {
            let mut child = entries.append_map().unwrap();
            write_node(&mut child, depth - 1);
            child.close().unwrap();
        }
    }
    entries.close().unwrap();
}

fn encode_document() -> Vec<u8> {
    let mut buf = Vec::new();
    let mut root = Writer::new(&mut buf).root().unwrap();
    write_node(&mut root, 6);
    root.close().unwrap();
    buf
}

fn walk(reader: &Reader<'_>) -> usize {
    let map = reader.as_map().unwrap();
    let mut count = 1;
    for child in map.at("entries").unwrap().as_array().unwrap().iter() {
        count += walk(child);
    }
    count
}

fn bench_codec(c: &mut Criterion) {
    let bytes = encode_document();

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("encode", |b| b.iter(|| black_box(encode_document())));
    group.bench_function("decode_walk", |b| {
        b.iter(|| {
            let reader = Reader::new(black_box(&bytes)).unwrap();
            black_box(walk(&reader))
        });
    });
    group.finish();
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
