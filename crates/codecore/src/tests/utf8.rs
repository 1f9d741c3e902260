use alloc::string::String;
use alloc::vec::Vec;

use rstest::rstest;

use crate::convert::Converter;
use crate::utf8::{self, Utf8DecodeError, Utf8Decoder, Utf8Encoder, Utf8ErrorKind};

fn decode_err(bytes: &[u8]) -> Utf8DecodeError {
    utf8::decode(bytes).unwrap_err()
}

fn kind_at(error: &Utf8DecodeError) -> (Utf8ErrorKind, usize) {
    match error {
        Utf8DecodeError::Invalid { kind, index, .. } => (*kind, *index),
        Utf8DecodeError::Unfinished => panic!("expected an in-place error"),
    }
}

#[test]
fn encodes_a_paired_surrogate_as_four_bytes() {
    let units: Vec<u16> = "\u{1F600}".encode_utf16().collect();
    assert_eq!(units, [0xD83D, 0xDE00]);
    assert_eq!(utf8::encode_utf16(&units), "\u{1F600}".as_bytes());
}

#[test]
fn pairs_surrogates_across_chunk_boundaries() {
    let mut out = Vec::new();
    let mut sink = Utf8Encoder::new().start_chunked(&mut out);
    sink.add(&[0xD83D]);
    sink.add(&[0xDE00]);
    sink.close();
    assert_eq!(out, "\u{1F600}".as_bytes());
}

#[test]
fn unpaired_lead_surrogate_is_three_raw_bytes() {
    assert_eq!(utf8::encode_utf16(&[0xD83D]), [0xED, 0xA0, 0xBD]);
}

#[test]
fn lead_surrogate_followed_by_scalar_flushes_raw() {
    assert_eq!(utf8::encode_utf16(&[0xD83D, 0x0041]), [0xED, 0xA0, 0xBD, 0x41]);
}

#[test]
fn lone_trail_surrogate_is_three_raw_bytes() {
    assert_eq!(utf8::encode_utf16(&[0xDE00]), [0xED, 0xB8, 0x80]);
}

#[test]
fn close_flushes_a_pending_lead() {
    let mut out = Vec::new();
    let mut sink = Utf8Encoder::new().start_chunked(&mut out);
    sink.add(&[0x61, 0xD83D]);
    sink.close();
    assert_eq!(out, [0x61, 0xED, 0xA0, 0xBD]);
}

#[test]
fn encode_of_a_str_is_its_bytes() {
    assert_eq!(utf8::encode("héllo"), "héllo".as_bytes());
}

#[rstest]
#[case(b"A\xC3\xA9z", "Aéz")]
#[case(b"\xE2\x82\xAC", "€")]
#[case(b"\xF0\x9D\x84\x9E", "\u{1D11E}")]
#[case(b"\xF4\x8F\xBF\xBF", "\u{10FFFF}")]
#[case(b"", "")]
fn decodes_well_formed_sequences(#[case] bytes: &[u8], #[case] expected: &str) {
    assert_eq!(utf8::decode(bytes).unwrap(), expected);
}

#[test]
fn strips_a_leading_byte_order_mark_only() {
    assert_eq!(utf8::decode(b"\xEF\xBB\xBFA").unwrap(), "A");
    assert_eq!(utf8::decode(b"\xEF\xBB\xBF").unwrap(), "");
    assert_eq!(utf8::decode(b"A\xEF\xBB\xBF").unwrap(), "A\u{FEFF}");
}

#[test]
fn strips_a_byte_order_mark_split_across_chunks() {
    let mut out = String::new();
    let mut sink = Utf8Decoder::new().start_chunked(&mut out);
    sink.add(&[0xEF]).unwrap();
    sink.add(&[0xBB, 0xBF, 0x41]).unwrap();
    sink.close().unwrap();
    assert_eq!(out, "A");
}

#[rstest]
#[case(&[0xC0, 0x80], Utf8ErrorKind::Overlong, 1)]
#[case(&[0xE0, 0x80, 0x80], Utf8ErrorKind::Overlong, 2)]
#[case(&[0xF0, 0x80, 0x80, 0x80], Utf8ErrorKind::Overlong, 3)]
#[case(&[0xED, 0xA0, 0x80], Utf8ErrorKind::InvalidCodePoint, 2)]
#[case(&[0xF4, 0x90, 0x80, 0x80], Utf8ErrorKind::InvalidCodePoint, 3)]
#[case(&[0x80], Utf8ErrorKind::UnexpectedContinuation, 0)]
#[case(&[0xFF], Utf8ErrorKind::InvalidByte, 0)]
#[case(&[0xF5, 0x80], Utf8ErrorKind::InvalidByte, 0)]
#[case(&[0xE2, 0x41], Utf8ErrorKind::MissingContinuation, 1)]
fn rejects_malformed_sequences(
    #[case] bytes: &[u8],
    #[case] kind: Utf8ErrorKind,
    #[case] index: usize,
) {
    assert_eq!(kind_at(&decode_err(bytes)), (kind, index));
}

#[test]
fn error_carries_the_offending_chunk() {
    let Utf8DecodeError::Invalid { input, .. } = decode_err(b"ab\xFF") else {
        panic!("expected an in-place error");
    };
    assert_eq!(input, b"ab\xFF".as_slice());
}

#[test]
fn truncated_sequence_fails_at_close() {
    let mut out = String::new();
    let mut sink = Utf8Decoder::new().start_chunked(&mut out);
    sink.add(&[0xE2, 0x82]).unwrap();
    assert_eq!(sink.close(), Err(Utf8DecodeError::Unfinished));
}

#[test]
fn lossy_replaces_each_malformed_sequence_once() {
    assert_eq!(utf8::decode_lossy(b"A\xFFB"), "A\u{FFFD}B");
    assert_eq!(utf8::decode_lossy(b"\xE2\x82"), "\u{FFFD}");
    assert_eq!(utf8::decode_lossy(b"\xC0\x80"), "\u{FFFD}");
}

#[test]
fn lossy_reexamines_the_byte_that_broke_a_sequence() {
    // 0x41 both terminates the unfinished sequence and decodes itself.
    assert_eq!(utf8::decode_lossy(b"\xE2\x41"), "\u{FFFD}A");
}

#[test]
fn sequences_split_across_chunks_decode_whole() {
    let text = "aé€\u{1D11E}";
    let bytes = text.as_bytes();
    for split in 0..=bytes.len() {
        let mut out = String::new();
        let mut sink = Utf8Decoder::new().start_chunked(&mut out);
        sink.add(&bytes[..split]).unwrap();
        sink.add(&bytes[split..]).unwrap();
        sink.close().unwrap();
        assert_eq!(out, text, "split at {split}");
    }
}

#[test]
fn error_index_is_relative_to_the_chunk() {
    let mut out = String::new();
    let mut sink = Utf8Decoder::new().start_chunked(&mut out);
    sink.add(b"ab").unwrap();
    let err = sink.add(b"c\xFF").unwrap_err();
    assert_eq!(kind_at(&err), (Utf8ErrorKind::InvalidByte, 1));
}

#[test]
fn converter_and_free_function_agree() {
    let bytes = "héllo".as_bytes();
    assert_eq!(Utf8Decoder::new().convert(bytes).unwrap(), utf8::decode(bytes).unwrap());
}

#[test]
#[should_panic(expected = "add on a closed sink")]
fn add_after_close_panics() {
    let mut out = Vec::new();
    let mut sink = Utf8Encoder::new().start_chunked(&mut out);
    sink.close();
    sink.add(&[0x41]);
}
