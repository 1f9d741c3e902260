#![allow(missing_docs)]
//! Throughput of the three codecs against `serde_json` where a direct
//! comparison exists.
//!
//! Groups:
//!
//! * `json_decode` / `json_encode`: one mid-sized document, this crate
//!   against `serde_json` on the same text.
//! * `object_lookup`: cost of touching one key of a freshly decoded
//!   object (members stay raw) against walking every member.
//! * `json_chunked`: the same document fed to the chunked decoder in
//!   64-byte pieces.
//! * `utf8_decode` / `base64`: the byte codecs one-shot.

use std::fmt::Write as _;
use std::hint::black_box;

use codecore::json::{self, JsonDecoder};
use codecore::{Value, base64, utf8};
use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::Value as SerdeValue;

#[allow(clippy::cast_precision_loss)]
fn build_document(readings: usize) -> String {
    let mut doc = String::from(r#"{"station":"fundy-7","readings":["#);
    for i in 0..readings {
        if i > 0 {
            doc.push(',');
        }
        let height = (i % 117) as f64 / 10.0;
        let rising = i % 2 == 0;
        write!(doc, r#"{{"at":{i},"height":{height},"rising":{rising}}}"#).unwrap();
    }
    doc.push_str(r#"],"alerts":null}"#);
    doc
}

fn pseudo_bytes(len: usize) -> Vec<u8> {
    let mut state = 0x2545_F491_4F6C_DD1D_u64;
    let mut out = Vec::with_capacity(len + 8);
    while out.len() < len {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        out.extend_from_slice(&state.to_le_bytes());
    }
    out.truncate(len);
    out
}

fn json_decode(c: &mut Criterion) {
    let doc = build_document(200);
    let mut group = c.benchmark_group("json_decode");
    group.bench_function("codecore", |b| {
        b.iter(|| json::decode(black_box(&doc)).unwrap());
    });
    group.bench_function("serde_json", |b| {
        b.iter(|| serde_json::from_str::<SerdeValue>(black_box(&doc)).unwrap());
    });
    group.finish();
}

fn json_encode(c: &mut Criterion) {
    let doc = build_document(200);
    let value = json::decode(&doc).unwrap();
    let serde_value: SerdeValue = serde_json::from_str(&doc).unwrap();
    let mut group = c.benchmark_group("json_encode");
    group.bench_function("codecore", |b| {
        b.iter(|| json::encode(black_box(&value)).unwrap());
    });
    group.bench_function("codecore_bytes", |b| {
        b.iter(|| json::encode_to_bytes(black_box(&value)).unwrap());
    });
    group.bench_function("serde_json", |b| {
        b.iter(|| serde_json::to_string(black_box(&serde_value)).unwrap());
    });
    group.finish();
}

fn object_lookup(c: &mut Criterion) {
    let doc = build_document(50);
    let mut group = c.benchmark_group("object_lookup");
    group.bench_function("first_key_lazy", |b| {
        b.iter(|| {
            let value = json::decode(black_box(&doc)).unwrap();
            let root = value.as_object().unwrap();
            black_box(root.get("station"))
        });
    });
    group.bench_function("every_member", |b| {
        b.iter(|| {
            let value = json::decode(black_box(&doc)).unwrap();
            let root = value.as_object().unwrap();
            let mut members = root.entries();
            let mut seen = 0_u32;
            while let Ok(Some(_)) = members.next(root) {
                seen += 1;
            }
            black_box(seen)
        });
    });
    group.finish();
}

fn json_chunked(c: &mut Criterion) {
    // The generated document is pure ASCII, so any byte split is a
    // character split.
    let doc = build_document(200);
    let packets: Vec<&str> = doc
        .as_bytes()
        .chunks(64)
        .map(|p| std::str::from_utf8(p).unwrap())
        .collect();
    let mut group = c.benchmark_group("json_chunked");
    group.bench_function("64_byte_chunks", |b| {
        b.iter(|| {
            let mut out: Vec<Value> = Vec::new();
            let mut sink = JsonDecoder::new().start_chunked(&mut out);
            for packet in &packets {
                sink.add(packet);
            }
            sink.close().unwrap();
            out
        });
    });
    group.finish();
}

fn utf8_decode(c: &mut Criterion) {
    let text = "la marée haute à fundy 🌊 ".repeat(400);
    let bytes = text.into_bytes();
    let mut group = c.benchmark_group("utf8_decode");
    group.bench_function("strict", |b| {
        b.iter(|| utf8::decode(black_box(&bytes)).unwrap());
    });
    group.bench_function("lossy", |b| {
        b.iter(|| utf8::decode_lossy(black_box(&bytes)));
    });
    group.bench_function("std_from_utf8", |b| {
        b.iter(|| std::str::from_utf8(black_box(&bytes)).unwrap().to_owned());
    });
    group.finish();
}

fn base64_transcode(c: &mut Criterion) {
    let bytes = pseudo_bytes(16 * 1024);
    let text = base64::encode(&bytes);
    let mut group = c.benchmark_group("base64");
    group.bench_function("encode_16k", |b| {
        b.iter(|| base64::encode(black_box(&bytes)));
    });
    group.bench_function("decode_16k", |b| {
        b.iter(|| base64::decode(black_box(&text)).unwrap());
    });
    group.finish();
}

criterion_group!(
    benches,
    json_decode,
    json_encode,
    object_lookup,
    json_chunked,
    utf8_decode,
    base64_transcode
);
criterion_main!(benches);
