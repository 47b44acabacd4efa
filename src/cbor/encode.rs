//! CBOR encoder, the bit-for-bit inverse of the decoder.
//!
//! Integers replay their recorded wire width, strings replay their chunk
//! boundaries, containers replay their indefinite flag. Length prefixes for
//! strings, containers and tags use the smallest encoding that fits, and map
//! entries are emitted in canonical key order.

use std::cmp::Ordering;

use crate::cbor::decode::{
    ADDITIONAL_INDEFINITE, ADDITIONAL_U16, ADDITIONAL_U32, ADDITIONAL_U64, ADDITIONAL_U8,
    BREAK_BYTE,
};
use crate::cbor::item::{DataItem, IntWidth, MajorType, Primitive};

const PRIMITIVE_BASE: u8 = (MajorType::Primitive as u8) << 5;

/// Encode a list of items into one contiguous buffer.
pub fn encode_items(items: &[DataItem]) -> Vec<u8> {
    let mut buf = Vec::new();
    for item in items {
        item.encode_into(&mut buf);
    }
    buf
}

impl DataItem {
    /// CBOR bytes for this item.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }

    /// Append this item's CBOR bytes to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            DataItem::Positive { width, value } => {
                emit_prefix(buf, MajorType::PositiveInt, *width, *value);
            }
            DataItem::Negative { width, value } => {
                // Encoded unsigned field is -1 - value.
                emit_prefix(buf, MajorType::NegativeInt, *width, (-1 - value) as u64);
            }
            DataItem::ByteString { bytes, chunks } => {
                emit_string(buf, MajorType::ByteString, bytes, chunks.as_deref());
            }
            DataItem::TextString { bytes, chunks } => {
                emit_string(buf, MajorType::TextString, bytes, chunks.as_deref());
            }
            DataItem::Array { items, indefinite } => {
                if *indefinite {
                    buf.push(((MajorType::Array as u8) << 5) | ADDITIONAL_INDEFINITE);
                } else {
                    emit_minimal_prefix(buf, MajorType::Array, items.len() as u64);
                }
                for item in items {
                    item.encode_into(buf);
                }
                if *indefinite {
                    buf.push(BREAK_BYTE);
                }
            }
            DataItem::Map {
                entries,
                indefinite,
            } => {
                if *indefinite {
                    buf.push(((MajorType::Map as u8) << 5) | ADDITIONAL_INDEFINITE);
                } else {
                    emit_minimal_prefix(buf, MajorType::Map, entries.len() as u64);
                }
                // Stable sort: comparator ties (same key, or container/tag/
                // primitive keys) keep insertion order.
                let mut ordered: Vec<&(DataItem, DataItem)> = entries.iter().collect();
                ordered.sort_by(|a, b| canonical_key_cmp(&a.0, &b.0));
                for (key, value) in ordered {
                    key.encode_into(buf);
                    value.encode_into(buf);
                }
                if *indefinite {
                    buf.push(BREAK_BYTE);
                }
            }
            DataItem::Tagged { tag, item } => {
                emit_minimal_prefix(buf, MajorType::Semantic, *tag);
                item.encode_into(buf);
            }
            DataItem::Primitive(primitive) => emit_primitive(buf, primitive),
        }
    }
}

/// Canonical map key order: major-type rank first, then numeric order for
/// integers and byte-wise order for strings. Containers, tags and primitives
/// compare equal so the stable sort preserves their insertion order.
pub fn canonical_key_cmp(a: &DataItem, b: &DataItem) -> Ordering {
    match a.major_type().cmp(&b.major_type()) {
        Ordering::Equal => {}
        rank => return rank,
    }
    match (a, b) {
        (DataItem::Positive { value: x, .. }, DataItem::Positive { value: y, .. }) => x.cmp(y),
        (DataItem::Negative { value: x, .. }, DataItem::Negative { value: y, .. }) => x.cmp(y),
        (DataItem::ByteString { bytes: x, .. }, DataItem::ByteString { bytes: y, .. }) => x.cmp(y),
        (DataItem::TextString { bytes: x, .. }, DataItem::TextString { bytes: y, .. }) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Emit `major | additional` with the value laid out at exactly `width`.
fn emit_prefix(buf: &mut Vec<u8>, major: MajorType, width: IntWidth, value: u64) {
    let base = (major as u8) << 5;
    match width {
        IntWidth::Tiny => buf.push(base | value as u8),
        IntWidth::U8 => {
            buf.push(base | ADDITIONAL_U8);
            buf.push(value as u8);
        }
        IntWidth::U16 => {
            buf.push(base | ADDITIONAL_U16);
            buf.extend_from_slice(&(value as u16).to_be_bytes());
        }
        IntWidth::U32 => {
            buf.push(base | ADDITIONAL_U32);
            buf.extend_from_slice(&(value as u32).to_be_bytes());
        }
        IntWidth::U64 => {
            buf.push(base | ADDITIONAL_U64);
            buf.extend_from_slice(&value.to_be_bytes());
        }
    }
}

/// Emit `major | additional` with the smallest encoding that fits `value`.
fn emit_minimal_prefix(buf: &mut Vec<u8>, major: MajorType, value: u64) {
    emit_prefix(buf, major, IntWidth::for_value(value), value);
}

fn emit_string(buf: &mut Vec<u8>, major: MajorType, bytes: &[u8], chunks: Option<&[usize]>) {
    let base = (major as u8) << 5;
    match chunks {
        None => {
            emit_minimal_prefix(buf, major, bytes.len() as u64);
            buf.extend_from_slice(bytes);
        }
        Some(chunks) => {
            buf.push(base | ADDITIONAL_INDEFINITE);
            let mut offset = 0;
            for &length in chunks {
                buf.push(base | length as u8);
                buf.extend_from_slice(&bytes[offset..offset + length]);
                offset += length;
            }
            buf.push(BREAK_BYTE);
        }
    }
}

fn emit_primitive(buf: &mut Vec<u8>, primitive: &Primitive) {
    match primitive {
        Primitive::False => buf.push(PRIMITIVE_BASE | 20),
        Primitive::True => buf.push(PRIMITIVE_BASE | 21),
        Primitive::Null => buf.push(PRIMITIVE_BASE | 22),
        Primitive::Undefined => buf.push(PRIMITIVE_BASE | 23),
        Primitive::Simple(value) => {
            buf.push(PRIMITIVE_BASE | ADDITIONAL_U8);
            buf.push(*value);
        }
        Primitive::HalfFloat(bits) => {
            buf.push(PRIMITIVE_BASE | ADDITIONAL_U16);
            buf.extend_from_slice(&bits.to_be_bytes());
        }
        Primitive::SingleFloat(value) => {
            buf.push(PRIMITIVE_BASE | ADDITIONAL_U32);
            buf.extend_from_slice(&value.to_bits().to_be_bytes());
        }
        Primitive::DoubleFloat(value) => {
            buf.push(PRIMITIVE_BASE | ADDITIONAL_U64);
            buf.extend_from_slice(&value.to_bits().to_be_bytes());
        }
        Primitive::Break => buf.push(BREAK_BYTE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cbor::decode::decode;

    /// decode then encode must reproduce the input byte for byte.
    fn assert_round_trip(bytes: &[u8]) {
        let items = decode(bytes).unwrap();
        assert_eq!(
            encode_items(&items),
            bytes,
            "round trip failed for {}",
            hex::encode(bytes)
        );
    }

    #[test]
    fn test_round_trip_integers_all_widths() {
        assert_round_trip(&[0x00]);
        assert_round_trip(&[0x17]);
        assert_round_trip(&[0x18, 0x18]);
        assert_round_trip(&[0x18, 0x17]); // non-minimal u8 width is preserved
        assert_round_trip(&[0x19, 0x03, 0xe8]);
        assert_round_trip(&[0x1a, 0x00, 0x0f, 0x42, 0x40]);
        assert_round_trip(&[0x1b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
        assert_round_trip(&[0x20]);
        assert_round_trip(&[0x38, 0x63]);
        assert_round_trip(&[0x39, 0x03, 0xe7]);
        assert_round_trip(&[0x3a, 0x00, 0x0f, 0x42, 0x3f]);
        assert_round_trip(&[0x3b, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_round_trip_strings() {
        assert_round_trip(&[0x40]);
        assert_round_trip(&[0x44, 0x01, 0x02, 0x03, 0x04]);
        assert_round_trip(&[0x60]);
        assert_round_trip(&[0x64, b'I', b'E', b'T', b'F']);
        // Chunked forms replay their exact chunk boundaries.
        assert_round_trip(&[0x5f, 0x42, 0xaa, 0xbb, 0x41, 0xcc, 0xff]);
        assert_round_trip(&[
            0x7f, 0x65, b's', b't', b'r', b'e', b'a', 0x64, b'm', b'i', b'n', b'g', 0xff,
        ]);
        // Empty indefinite string.
        assert_round_trip(&[0x5f, 0xff]);
    }

    #[test]
    fn test_round_trip_containers() {
        assert_round_trip(&[0x80]);
        assert_round_trip(&[0x81, 0x01]);
        assert_round_trip(&[0x82, 0x01, 0x82, 0x20, 0x81, 0x61, 0x62]);
        assert_round_trip(&[0x9f, 0x01, 0x02, 0xff]);
        assert_round_trip(&[0xa0]);
        assert_round_trip(&[0xa1, 0x01, 0x02]);
        assert_round_trip(&[0xbf, 0x63, b'F', b'u', b'n', 0xf5, 0xff]);
    }

    #[test]
    fn test_round_trip_tags() {
        // Date/time string, epoch, bignums, URI.
        assert_round_trip(&[
            0xc0, 0x74, b'2', b'0', b'1', b'3', b'-', b'0', b'3', b'-', b'2', b'1', b'T', b'2',
            b'0', b':', b'0', b'4', b':', b'0', b'0', b'Z',
        ]);
        assert_round_trip(&[0xc1, 0x1a, 0x51, 0x4b, 0x67, 0xb0]);
        assert_round_trip(&[0xc2, 0x49, 0x01, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_round_trip(&[0xc3, 0x49, 0x01, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_round_trip(&[0xd8, 0x20, 0x61, b'a']);
        // Pass-through tags keep their payload verbatim.
        assert_round_trip(&[0xc4, 0x82, 0x01, 0x02]);
        assert_round_trip(&[0xd9, 0xd9, 0xf7, 0x01]);
    }

    #[test]
    fn test_round_trip_primitives() {
        assert_round_trip(&[0xf4]);
        assert_round_trip(&[0xf5]);
        assert_round_trip(&[0xf6]);
        assert_round_trip(&[0xf7]);
        assert_round_trip(&[0xf8, 0x20]);
        assert_round_trip(&[0xf8, 0xff]);
        assert_round_trip(&[0xf9, 0x3c, 0x00]);
        assert_round_trip(&[0xf9, 0x7e, 0x00]); // half NaN
        assert_round_trip(&[0xfa, 0x47, 0xc3, 0x50, 0x00]);
        assert_round_trip(&[0xfb, 0x3f, 0xf1, 0x99, 0x99, 0x99, 0x99, 0x99, 0x9a]);
    }

    #[test]
    fn test_new_items_use_minimal_widths() {
        assert_eq!(DataItem::positive(0).encode(), vec![0x00]);
        assert_eq!(DataItem::positive(23).encode(), vec![0x17]);
        assert_eq!(DataItem::positive(24).encode(), vec![0x18, 0x18]);
        assert_eq!(DataItem::positive(256).encode(), vec![0x19, 0x01, 0x00]);
        assert_eq!(
            DataItem::positive(1 << 32).encode(),
            vec![0x1b, 0, 0, 0, 1, 0, 0, 0, 0]
        );
        assert_eq!(DataItem::negative(-1).unwrap().encode(), vec![0x20]);
        assert_eq!(DataItem::negative(-24).unwrap().encode(), vec![0x37]);
        assert_eq!(DataItem::negative(-25).unwrap().encode(), vec![0x38, 0x18]);
    }

    #[test]
    fn test_negative_encoded_field_law() {
        // Encoded unsigned field must equal -1 - value.
        for value in [-1i64, -10, -100, -1000, -65536] {
            let bytes = DataItem::negative(value).unwrap().encode();
            let reparsed = decode(&bytes).unwrap();
            assert_eq!(reparsed[0].as_i64().unwrap(), value);
            // Strip the major bits and re-read the unsigned field directly.
            let expected = (-1 - value) as u64;
            let unsigned = match bytes.len() {
                1 => u64::from(bytes[0] & 0x1f),
                2 => u64::from(bytes[1]),
                3 => u64::from(u16::from_be_bytes([bytes[1], bytes[2]])),
                5 => u64::from(u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]])),
                _ => u64::from_be_bytes(bytes[1..9].try_into().unwrap()),
            };
            assert_eq!(unsigned, expected);
        }
    }

    #[test]
    fn test_map_canonical_order() {
        // Keys inserted out of order re-encode sorted: majors first, then
        // numeric / byte-wise order within a major.
        let map = DataItem::map(vec![
            (DataItem::text_string("b"), DataItem::positive(1)),
            (DataItem::positive(10), DataItem::positive(2)),
            (DataItem::text_string("a"), DataItem::positive(3)),
            (DataItem::negative(-2).unwrap(), DataItem::positive(4)),
            (DataItem::positive(2), DataItem::positive(5)),
            (DataItem::byte_string(vec![0x00]), DataItem::positive(6)),
        ]);
        let bytes = map.encode();
        let reparsed = decode(&bytes).unwrap();
        let entries = reparsed[0].as_map().unwrap();
        let keys: Vec<String> = entries.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(
            keys,
            vec![
                "Positive(2)",
                "Positive(10)",
                "Negative(-2)",
                "ByteString(len 1, 00)",
                "TextString(\"a\")",
                "TextString(\"b\")",
            ]
        );
    }

    #[test]
    fn test_map_order_ties_keep_insertion_order() {
        // Array keys are incomparable; the stable sort must not reorder them.
        let map = DataItem::map(vec![
            (DataItem::array(vec![DataItem::positive(9)]), DataItem::positive(1)),
            (DataItem::array(vec![DataItem::positive(1)]), DataItem::positive(2)),
        ]);
        let bytes = map.encode();
        let reparsed = decode(&bytes).unwrap();
        let entries = reparsed[0].as_map().unwrap();
        assert_eq!(entries[0].0.as_array().unwrap()[0].as_u64().unwrap(), 9);
        assert_eq!(entries[1].0.as_array().unwrap()[0].as_u64().unwrap(), 1);
    }

    #[test]
    fn test_decoded_map_insertion_order_preserved_until_encode() {
        // {2: "b", 1: "a"} decodes in wire order and re-encodes sorted.
        let bytes = [0xa2, 0x02, 0x61, b'b', 0x01, 0x61, b'a'];
        let items = decode(&bytes).unwrap();
        let entries = items[0].as_map().unwrap();
        assert_eq!(entries[0].0.as_u64().unwrap(), 2);
        assert_eq!(entries[1].0.as_u64().unwrap(), 1);

        let reencoded = encode_items(&items);
        assert_eq!(reencoded, [0xa2, 0x01, 0x61, b'a', 0x02, 0x61, b'b']);
    }

    #[test]
    fn test_chunked_constructor_round_trip() {
        let item = DataItem::chunked_byte_string(&[b"ab".as_slice(), b"c".as_slice()]).unwrap();
        let bytes = item.encode();
        assert_eq!(bytes, [0x5f, 0x42, b'a', b'b', 0x41, b'c', 0xff]);
        assert_eq!(decode(&bytes).unwrap()[0], item);
    }

    #[test]
    fn test_single_float_nan_bits_preserved() {
        // A NaN with a distinctive payload must survive the trip.
        let bits = 0x7fc0_1234u32;
        let mut bytes = vec![0xfa];
        bytes.extend_from_slice(&bits.to_be_bytes());
        assert_round_trip(&bytes);
    }
}
