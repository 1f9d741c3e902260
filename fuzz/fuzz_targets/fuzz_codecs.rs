#![no_main]
use std::cell::RefCell;

use arbitrary::{Arbitrary, Unstructured};
use codecore::Value;
use codecore::base64::{self, Base64Encoder};
use codecore::json::{self, JsonDecoder};
use codecore::utf8::{self, Utf8Decoder};
use libfuzzer_sys::{fuzz_mutator, fuzz_target, fuzzer_mutate};
use rand::rngs::SmallRng; // faster than StdRng
use rand::{Rng, RngCore, SeedableRng};
use serde_json::Map;

const HEADER: usize = 5; // 1 mode byte + 4-byte split seed

thread_local! {
    // One SmallRng per thread, seeded once from the host OS
    static RNG: RefCell<SmallRng> =
        RefCell::new(SmallRng::from_os_rng());
}

// JSON's four whitespace bytes plus lookalikes the grammar rejects, so
// the corpus probes both sides of the acceptance check.
static WS_TABLE: &[&[u8]] = &[
    b" ",
    b"\t",
    b"\n",
    b"\r",
    "\u{00A0}".as_bytes(),
    "\u{2028}".as_bytes(),
    "\u{2029}".as_bytes(),
    "\u{FEFF}".as_bytes(),
];

/// Helper: borrow the thread-local RNG and run a closure with it.
fn with_rng<F, R>(f: F) -> R
where
    F: FnOnce(&mut SmallRng) -> R,
{
    RNG.with(|cell| f(&mut cell.borrow_mut()))
}

fn mutator(data: &mut [u8], size: usize, max_size: usize, seed: u32) -> usize {
    if size >= HEADER && !seed.is_multiple_of(10) {
        return fuzzer_mutate(data, size, max_size);
    }
    if max_size <= HEADER {
        return fuzzer_mutate(data, size, max_size);
    }

    data[0] = with_rng(|rng| rng.next_u32() as u8);
    data[1..HEADER].copy_from_slice(&with_rng(|rng| rng.next_u32().to_le_bytes()));

    let mut len = HEADER;
    len += append_whitespace(&mut data[len..], max_size - len);
    len += append_document(&mut data[len..], size.max(16), max_size - len);
    len += append_whitespace(&mut data[len..], max_size - len);
    len
}

/// Append 1 to 8 whitespace code points to `buf`, never exceeding
/// `limit`. Returns the number of bytes written.
fn append_whitespace(buf: &mut [u8], limit: usize) -> usize {
    with_rng(|rng| {
        if limit == 0 {
            return 0;
        }

        let n_codepoints = rng.random_range(1..=limit.min(8));
        let mut written = 0;

        for _ in 0..n_codepoints {
            let w = WS_TABLE[rng.random_range(0..WS_TABLE.len())];
            if written + w.len() > limit {
                break;
            }
            buf[written..written + w.len()].copy_from_slice(w);
            written += w.len();
        }
        written
    })
}

/// Append a serialized random JSON document, truncated to `limit` so the
/// corpus also carries cut-off documents. Returns the bytes written.
fn append_document(buf: &mut [u8], size_hint: usize, limit: usize) -> usize {
    if limit == 0 {
        return 0;
    }
    let raw: Vec<u8> = with_rng(|rng| {
        let n = rng.random_range(size_hint / 2..=size_hint * 2);
        (0..n).map(|_| rng.random::<u8>()).collect()
    });
    let Ok(document) = ArbitraryDocument::arbitrary(&mut Unstructured::new(&raw)) else {
        return 0;
    };

    let serialized = serde_json::to_vec(&document.0).expect("failed to serialize document");
    let len = serialized.len().min(limit);
    buf[..len].copy_from_slice(&serialized[..len]);
    len
}

fuzz_mutator!(|data: &mut [u8], size: usize, max_size: usize, seed: u32| {
    mutator(data, size, max_size, seed)
});

#[derive(Debug)]
struct ArbitraryDocument(serde_json::Value);

impl<'a> Arbitrary<'a> for ArbitraryDocument {
    fn arbitrary(u: &mut Unstructured<'_>) -> arbitrary::Result<Self> {
        let node_type = u.choose_index(21)?;
        let value = match node_type {
            0 => serde_json::Value::Null,
            1 => serde_json::Value::Bool(u.arbitrary()?),
            2 => {
                let n: f64 = u.arbitrary()?;
                serde_json::Value::Number(
                    serde_json::Number::from_f64(n).ok_or(arbitrary::Error::IncorrectFormat)?,
                )
            }
            3..=10 => serde_json::Value::String(u.arbitrary()?),
            11..=15 => {
                let elems: Vec<ArbitraryDocument> = u.arbitrary()?;
                serde_json::Value::Array(elems.into_iter().map(|v| v.0).collect())
            }
            16..=20 => {
                let m: Vec<(String, ArbitraryDocument)> = u.arbitrary()?;
                serde_json::Value::Object(Map::from_iter(m.into_iter().map(|(k, v)| (k, v.0))))
            }
            _ => Err(arbitrary::Error::IncorrectFormat)?,
        };
        Ok(ArbitraryDocument(value))
    }
}

fn codecs(data: &[u8]) {
    if data.len() < HEADER {
        return;
    }

    let mode = data[0] & 3;
    let split_seed = u64::from(u32::from_le_bytes(data[1..HEADER].try_into().unwrap()));
    let payload = &data[HEADER..];
    if payload.is_empty() {
        return;
    }

    match mode {
        0 => utf8_mode(payload, split_seed),
        1 => base64_mode(payload, split_seed),
        _ => json_mode(payload, split_seed),
    }
}

fuzz_target!(|data: &[u8]| codecs(data));

/// Strict decoding must accept exactly what `str::from_utf8` accepts
/// (minus a leading byte-order mark), and chunking must not matter.
fn utf8_mode(payload: &[u8], split_seed: u64) {
    let one_shot = utf8::decode(payload).ok();

    let expected = match std::str::from_utf8(payload) {
        Ok(text) => Some(text.strip_prefix('\u{FEFF}').unwrap_or(text)),
        Err(_) => None,
    };
    assert_eq!(one_shot.as_deref(), expected);

    let mut out = String::new();
    let mut sink = Utf8Decoder::new().start_chunked(&mut out);
    let mut failed = false;
    for chunk in split_bytes(payload, split_seed) {
        if sink.add(chunk).is_err() {
            failed = true;
            break;
        }
    }
    let chunked = if !failed && sink.close().is_ok() {
        Some(out)
    } else {
        None
    };
    assert_eq!(one_shot, chunked);

    let lossy = utf8::decode_lossy(payload);
    let mut lossy_chunked = String::new();
    let mut sink = Utf8Decoder::lossy().start_chunked(&mut lossy_chunked);
    for chunk in split_bytes(payload, split_seed) {
        sink.add(chunk).unwrap();
    }
    sink.close().unwrap();
    assert_eq!(lossy, lossy_chunked);
}

/// Base64 must round-trip any bytes in both alphabets, emit normalized
/// text, match its chunked self, and reject garbage without panicking.
fn base64_mode(payload: &[u8], split_seed: u64) {
    let text = base64::encode(payload);
    assert_eq!(base64::decode(&text), Ok(payload.to_vec()));
    assert_eq!(base64::normalize(&text).as_deref(), Ok(text.as_str()));

    let url = base64::encode_url_safe(payload);
    assert_eq!(base64::URL_SAFE.decode(&url), Ok(payload.to_vec()));

    let mut chunked = String::new();
    let mut sink = Base64Encoder::new().start_chunked(&mut chunked);
    for chunk in split_bytes(payload, split_seed) {
        sink.add(chunk);
    }
    sink.close();
    assert_eq!(chunked, text);

    let noise = String::from_utf8_lossy(payload);
    let _ = base64::decode(&noise);
    if let Ok(normal) = base64::normalize(&noise) {
        assert_eq!(base64::normalize(&normal), Ok(normal.clone()));
    }
}

/// JSON acceptance must match `serde_json` on the same text, decoded
/// values must survive an encode plus decode, and the chunked sink must
/// agree with one-shot decoding.
fn json_mode(payload: &[u8], split_seed: u64) {
    let text = String::from_utf8_lossy(payload);

    let mine = json::decode(&text);
    let reference = serde_json::from_str::<serde_json::Value>(&text);
    assert_eq!(mine.is_ok(), reference.is_ok());

    let Ok(value) = mine else { return };

    let encoded = json::encode(&value).unwrap();
    assert_eq!(json::decode(&encoded).unwrap(), value);

    let mut out: Vec<Value> = Vec::new();
    let mut sink = JsonDecoder::new().start_chunked(&mut out);
    for chunk in split_text(&text, split_seed) {
        sink.add(chunk);
    }
    sink.close().unwrap();
    assert_eq!(out, [value]);
}

/// Split bytes into chunks sized by a deterministic seed. Each chunk is
/// at least one byte.
fn split_bytes(bytes: &[u8], split_seed: u64) -> Vec<&[u8]> {
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < bytes.len() {
        let remaining = bytes.len() - start;
        let size = (split_seed as usize % remaining) + 1;
        chunks.push(&bytes[start..start + size]);
        start += size;
    }
    chunks
}

/// Split text the same way, bumping each cut forward onto a character
/// boundary so the slices never panic.
fn split_text(text: &str, split_seed: u64) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let len = text.len();
    while start < len {
        let remaining = len - start;
        let mut size = (split_seed as usize % remaining) + 1;
        while start + size < len && !text.is_char_boundary(start + size) {
            size += 1;
        }
        chunks.push(&text[start..start + size]);
        start += size;
    }
    chunks
}
