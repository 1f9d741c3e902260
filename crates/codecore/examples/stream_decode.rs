//! Reassembles a JSON document that arrives as UTF-8 bytes in packets
//! that pay no attention to character boundaries.
//!
//! A network peer sends one JSON document describing tide-gauge readings.
//! The transport hands us raw byte packets, and the second packet starts
//! in the middle of a four-byte emoji. Feeding the packets to a chunked
//! [`Utf8Decoder`] sink shows the carry behavior: every packet yields the
//! longest decodable prefix immediately, and the split character appears
//! as soon as its last byte arrives.
//!
//! The decoded text then goes through the JSON decoder, once chunked and
//! once as a fused one-shot pipeline straight from bytes to a value.
//!
//! Run with
//!
//! ```bash
//! cargo run -p codecore --example stream_decode
//! ```

use codecore::json::{self, JsonDecoder};
use codecore::utf8::Utf8Decoder;
use codecore::{Converter, TextSink, Value};

/// One JSON document, split into packets. The wave emoji is the four
/// bytes `F0 9F 8C 8A`; the first packet ends after two of them.
const PACKETS: [&[u8]; 3] = [
    b"{\"gauge\":\"Fundy \xF0\x9F",
    b"\x8C\x8A\",\"readings\":[11.3,0.9,11.7],",
    b"\"alert\":null}",
];

/// Prints every decoded text chunk as it becomes available while also
/// accumulating the full document.
struct Progress {
    text: String,
}

impl TextSink for Progress {
    fn add(&mut self, chunk: &str) {
        println!("  decoded: {chunk:?}");
        self.text.push_str(chunk);
    }

    fn close(&mut self) {}
}

fn main() {
    // Stage 1: bytes to text, packet by packet.
    let mut progress = Progress {
        text: String::new(),
    };
    let mut utf8 = Utf8Decoder::new().start_chunked(&mut progress);
    for (i, packet) in PACKETS.iter().enumerate() {
        println!("packet {i}: {} bytes", packet.len());
        utf8.add(packet).expect("malformed UTF-8 from peer");
    }
    utf8.close().expect("stream ended inside a character");

    // Stage 2: text to a value. The chunked JSON sink buffers text and
    // delivers the decoded document when the stream closes.
    let mut documents: Vec<Value> = Vec::new();
    let mut decoder = JsonDecoder::new().start_chunked(&mut documents);
    decoder.add(&progress.text);
    decoder.close().expect("peer sent invalid JSON");

    let document = &documents[0];
    let root = document.as_object().expect("document is an object");
    println!("gauge: {}", root.get("gauge").unwrap().as_str().unwrap());
    let readings = root.get("readings").unwrap();
    let readings = readings.as_array().unwrap();
    println!("readings: {}", readings.len());

    // The same trip as a single fused converter, bytes straight to value.
    let pipeline = Utf8Decoder::new().fuse(JsonDecoder::new());
    let full: Vec<u8> = PACKETS.concat();
    let value = pipeline.convert(&full).expect("pipeline failed");
    assert_eq!(&value, document);

    println!("round trip: {}", json::encode(&value).expect("encodable"));
}
