#![allow(missing_docs)]

use codecore::base64::{Base64Decoder, Base64Encoder};
use codecore::json::{self, JsonDecoder, JsonUtf8Encoder};
use codecore::utf8::Utf8Decoder;
use codecore::{Converter, FuseError, Value};

const DOCUMENT: &str = r#"
{
    "station": "Baie de Fundy \ud83c\udf0a",
    "unit": "m",
    "readings": [
        {"at": "06:12", "height": 11.3, "rising": true},
        {"at": "12:25", "height": 0.9, "rising": false},
        {"at": "18:40", "height": 11.7, "rising": true}
    ],
    "alerts": null,
    "meta": {
        "source": "gauge-7",
        "revision": 4
    }
}"#;

// The same document cut into transmission-sized pieces, deliberately on
// awkward seams: inside an escape, between a key and its colon, and
// between closing brackets.
const STREAM: [&str; 7] = [
    "\n{\n    \"station\": \"Baie de Fundy \\ud83c",
    "\\udf0a\",\n    \"unit\": \"m\",\n    \"readings\": [\n        {\"at\": \"06:12\", \"height\": 11.3",
    ", \"rising\": true},\n        {\"at\": \"12:25\", \"height\": 0.9, \"rising\": false},\n",
    "        {\"at\": \"18:40\", \"height\": 11.7, \"rising\": true}\n    ]",
    ",\n    \"alerts\": null,\n    \"meta\": {\n        \"source\": \"gauge-7\"",
    ",\n        \"revision\": 4\n    }",
    "\n}",
];

#[test]
fn stream_pieces_reassemble_the_document() {
    assert_eq!(STREAM.concat(), DOCUMENT);
}

#[test]
fn decoded_document_reads_through_handles() {
    let value = json::decode(DOCUMENT).unwrap();
    let root = value.as_object().unwrap();

    assert_eq!(root.get("station"), Some(Value::from("Baie de Fundy 🌊")));
    assert_eq!(root.get("alerts"), Some(Value::Null));

    let readings = root.get("readings").unwrap();
    let readings = readings.as_array().unwrap();
    assert_eq!(readings.len(), 3);
    let low_tide = readings.get(1).unwrap();
    let low_tide = low_tide.as_object().unwrap();
    assert_eq!(low_tide.get("height").and_then(|v| v.as_f64()), Some(0.9));
    assert_eq!(low_tide.get("rising"), Some(Value::Bool(false)));

    let meta = root.get("meta").unwrap();
    let meta = meta.as_object().unwrap();
    assert_eq!(meta.get("revision").and_then(|v| v.as_f64()), Some(4.0));
}

#[test]
fn encode_then_decode_preserves_the_document() {
    let value = json::decode(DOCUMENT).unwrap();
    let compact = json::encode(&value).unwrap();
    assert_eq!(json::decode(&compact).unwrap(), value);

    let pretty = json::encode_pretty(&value, "  ").unwrap();
    assert_eq!(json::decode(&pretty).unwrap(), value);
}

#[test]
fn chunked_decode_accepts_the_stream_pieces() {
    let mut out: Vec<Value> = Vec::new();
    let mut sink = JsonDecoder::new().start_chunked(&mut out);
    for piece in STREAM {
        sink.add(piece);
    }
    sink.close().unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0], json::decode(DOCUMENT).unwrap());
}

#[test]
fn utf8_packets_reassemble_across_character_splits() {
    let expected = json::decode(DOCUMENT).unwrap();
    let compact = json::encode(&expected).unwrap();
    let bytes = compact.as_bytes();

    // Three-byte packets are guaranteed to split the four-byte wave
    // emoji somewhere in the middle.
    let mut text = String::new();
    let mut sink = Utf8Decoder::new().start_chunked(&mut text);
    for packet in bytes.chunks(3) {
        sink.add(packet).unwrap();
    }
    sink.close().unwrap();

    assert_eq!(json::decode(&text).unwrap(), expected);
}

#[test]
fn base64_armored_pipeline_roundtrips() {
    let value = json::decode(DOCUMENT).unwrap();

    let armor = JsonUtf8Encoder::new().fuse(Base64Encoder::new());
    let armored = armor.convert(&value).unwrap();
    assert!(armored.is_ascii());

    let unarmor = Base64Decoder::new()
        .fuse(Utf8Decoder::new())
        .fuse(JsonDecoder::new());
    assert_eq!(unarmor.convert(&armored).unwrap(), value);
}

#[test]
fn fuse_reports_the_stage_that_failed() {
    let decoder = Base64Decoder::new().fuse(Utf8Decoder::new());

    // Not Base64 at all: the first stage rejects it.
    assert!(matches!(decoder.convert("!!!"), Err(FuseError::First(_))));

    // Valid Base64 for the single byte 0xFF, which is not UTF-8.
    assert!(matches!(decoder.convert("/w=="), Err(FuseError::Second(_))));
}
