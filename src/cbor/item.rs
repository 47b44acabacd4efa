//! CBOR data items as a tagged sum type.
//!
//! Every variant carries exactly the fields needed to recover its byte
//! layout: integers remember the wire width they were decoded with, strings
//! remember their chunk boundaries, containers remember whether they were
//! definite or indefinite. Re-encoding replays those fields verbatim, which
//! is what makes the byte-for-byte round-trip invariant hold.

use std::fmt;

use crate::error::{Error, Result};

/// Well-known semantic tag ids (RFC 7049 §2.4).
pub mod tag {
    /// RFC 3339 date/time string.
    pub const DATE_TIME_STRING: u64 = 0;
    /// Epoch-based date/time, integer payload.
    pub const DATE_TIME_EPOCH: u64 = 1;
    /// Positive big integer, byte-string magnitude payload.
    pub const POSITIVE_BIGNUM: u64 = 2;
    /// Negative big integer, `-1 - magnitude`.
    pub const NEGATIVE_BIGNUM: u64 = 3;
    /// Decimal fraction (pass-through).
    pub const DECIMAL_FRACTION: u64 = 4;
    /// Big float (pass-through).
    pub const BIG_FLOAT: u64 = 5;
    /// Expected conversion to base64url (pass-through).
    pub const EXPECT_BASE64URL: u64 = 21;
    /// Expected conversion to base64 (pass-through).
    pub const EXPECT_BASE64: u64 = 22;
    /// Expected conversion to base16 (pass-through).
    pub const EXPECT_BASE16: u64 = 23;
    /// Encoded CBOR data item (pass-through).
    pub const ENCODED_CBOR: u64 = 24;
    /// URI text.
    pub const URI: u64 = 32;
    /// base64url-encoded text.
    pub const BASE64URL: u64 = 33;
    /// base64-encoded text.
    pub const BASE64: u64 = 34;
    /// Regular expression text.
    pub const REGEX: u64 = 35;
    /// MIME message text.
    pub const MIME: u64 = 36;
    /// Self-described CBOR (pass-through).
    pub const SELF_DESCRIBE: u64 = 55799;
}

/// Lowest simple value that is not a reserved primitive encoding.
pub const SIMPLE_VALUE_MIN: u8 = 32;

/// CBOR major type, the top 3 bits of an item's first byte.
///
/// The derived ordering doubles as the major-type rank used for canonical
/// map key ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MajorType {
    /// Major type 0, unsigned integer.
    PositiveInt = 0,
    /// Major type 1, negative integer.
    NegativeInt = 1,
    /// Major type 2, byte string.
    ByteString = 2,
    /// Major type 3, UTF-8 text string.
    TextString = 3,
    /// Major type 4, array.
    Array = 4,
    /// Major type 5, map of pairs.
    Map = 5,
    /// Major type 6, semantic tag.
    Semantic = 6,
    /// Major type 7, primitives and floats.
    Primitive = 7,
}

impl fmt::Display for MajorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MajorType::PositiveInt => "positive integer",
            MajorType::NegativeInt => "negative integer",
            MajorType::ByteString => "byte string",
            MajorType::TextString => "text string",
            MajorType::Array => "array",
            MajorType::Map => "map",
            MajorType::Semantic => "semantic tag",
            MajorType::Primitive => "primitive",
        };
        f.write_str(name)
    }
}

/// Wire width of an integer item's additional-type encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    /// Value 0..=23 packed directly into the additional type.
    Tiny,
    /// Additional type 24, one following byte.
    U8,
    /// Additional type 25, two following bytes.
    U16,
    /// Additional type 26, four following bytes.
    U32,
    /// Additional type 27, eight following bytes.
    U64,
}

impl IntWidth {
    /// Smallest width that can carry `value`.
    pub fn for_value(value: u64) -> IntWidth {
        match value {
            0..=23 => IntWidth::Tiny,
            24..=0xff => IntWidth::U8,
            0x100..=0xffff => IntWidth::U16,
            0x1_0000..=0xffff_ffff => IntWidth::U32,
            _ => IntWidth::U64,
        }
    }
}

/// Major type 7 sub-variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    /// Boolean false (additional type 20).
    False,
    /// Boolean true (additional type 21).
    True,
    /// Null (additional type 22).
    Null,
    /// Undefined (additional type 23).
    Undefined,
    /// Simple value in 32..=255 (additional type 24).
    Simple(u8),
    /// Half-precision float, stored as its raw bits (additional type 25).
    HalfFloat(u16),
    /// Single-precision float (additional type 26).
    SingleFloat(f32),
    /// Double-precision float (additional type 27).
    DoubleFloat(f64),
    /// Break stop code for indefinite containers (additional type 31).
    /// In-stream terminator only, never a user-visible item.
    Break,
}

/// A single CBOR data item.
#[derive(Debug, Clone, PartialEq)]
pub enum DataItem {
    /// Major type 0.
    Positive {
        /// Wire width recorded at decode time.
        width: IntWidth,
        /// The unsigned value.
        value: u64,
    },
    /// Major type 1. The encoded unsigned field is `-1 - value`.
    Negative {
        /// Wire width recorded at decode time.
        width: IntWidth,
        /// The (strictly negative) value.
        value: i64,
    },
    /// Major type 2.
    ByteString {
        /// The concatenated payload.
        bytes: Vec<u8>,
        /// Per-chunk lengths when the string was chunked (indefinite form);
        /// `None` for the definite form. Lengths sum to `bytes.len()`.
        chunks: Option<Vec<usize>>,
    },
    /// Major type 3. Raw bytes are preserved; UTF-8 validation happens when
    /// the consumer asks for text.
    TextString {
        /// The concatenated payload.
        bytes: Vec<u8>,
        /// Per-chunk lengths when the string was chunked, as for byte strings.
        chunks: Option<Vec<usize>>,
    },
    /// Major type 4.
    Array {
        /// The items, in wire order.
        items: Vec<DataItem>,
        /// Whether the array used the indefinite-length form.
        indefinite: bool,
    },
    /// Major type 5. Entries preserve insertion order; canonical key order
    /// is applied on encode.
    Map {
        /// Key/value pairs, in wire order.
        entries: Vec<(DataItem, DataItem)>,
        /// Whether the map used the indefinite-length form.
        indefinite: bool,
    },
    /// Major type 6.
    Tagged {
        /// The semantic tag id.
        tag: u64,
        /// The wrapped item.
        item: Box<DataItem>,
    },
    /// Major type 7.
    Primitive(Primitive),
}

impl DataItem {
    /// Positive integer with the smallest width that fits.
    pub fn positive(value: u64) -> DataItem {
        DataItem::Positive {
            width: IntWidth::for_value(value),
            value,
        }
    }

    /// Negative integer with the smallest width that fits the encoded field.
    ///
    /// # Errors
    ///
    /// `NegativeIntExpected` for any `value >= 0`.
    pub fn negative(value: i64) -> Result<DataItem> {
        if value >= 0 {
            return Err(Error::NegativeIntExpected { value });
        }
        let encoded = (-1 - value) as u64;
        Ok(DataItem::Negative {
            width: IntWidth::for_value(encoded),
            value,
        })
    }

    /// Definite-length byte string.
    pub fn byte_string(bytes: Vec<u8>) -> DataItem {
        DataItem::ByteString {
            bytes,
            chunks: None,
        }
    }

    /// Indefinite-length byte string built from explicit chunks.
    ///
    /// # Errors
    ///
    /// `InvalidPayload` if any chunk is longer than 23 bytes; chunk headers
    /// carry their length directly in the low 5 bits.
    pub fn chunked_byte_string(parts: &[&[u8]]) -> Result<DataItem> {
        let chunks = chunk_lengths(parts.iter().map(|p| p.len()))?;
        Ok(DataItem::ByteString {
            bytes: parts.concat(),
            chunks: Some(chunks),
        })
    }

    /// Definite-length text string.
    pub fn text_string(text: &str) -> DataItem {
        DataItem::TextString {
            bytes: text.as_bytes().to_vec(),
            chunks: None,
        }
    }

    /// Indefinite-length text string built from explicit chunks.
    ///
    /// # Errors
    ///
    /// `InvalidPayload` if any chunk is longer than 23 bytes.
    pub fn chunked_text_string(parts: &[&str]) -> Result<DataItem> {
        let chunks = chunk_lengths(parts.iter().map(|p| p.len()))?;
        Ok(DataItem::TextString {
            bytes: parts.concat().into_bytes(),
            chunks: Some(chunks),
        })
    }

    /// Definite-length array.
    pub fn array(items: Vec<DataItem>) -> DataItem {
        DataItem::Array {
            items,
            indefinite: false,
        }
    }

    /// Indefinite-length array (break-terminated on the wire).
    pub fn indefinite_array(items: Vec<DataItem>) -> DataItem {
        DataItem::Array {
            items,
            indefinite: true,
        }
    }

    /// Definite-length map. Entry order is kept until encode applies the
    /// canonical key order.
    pub fn map(entries: Vec<(DataItem, DataItem)>) -> DataItem {
        DataItem::Map {
            entries,
            indefinite: false,
        }
    }

    /// Indefinite-length map (break-terminated on the wire).
    pub fn indefinite_map(entries: Vec<(DataItem, DataItem)>) -> DataItem {
        DataItem::Map {
            entries,
            indefinite: true,
        }
    }

    /// Semantic tag wrapping `item`.
    pub fn tagged(tag: u64, item: DataItem) -> DataItem {
        DataItem::Tagged {
            tag,
            item: Box::new(item),
        }
    }

    /// Simple value.
    ///
    /// # Errors
    ///
    /// `UnexpectedCborItem` for values below 32, which collide with the
    /// reserved primitive encodings.
    pub fn simple(value: u8) -> Result<DataItem> {
        if value < SIMPLE_VALUE_MIN {
            return Err(Error::UnexpectedCborItem {
                reason: format!("simple value {value} is below the minimum of {SIMPLE_VALUE_MIN}"),
            });
        }
        Ok(DataItem::Primitive(Primitive::Simple(value)))
    }

    /// Major type of this item.
    pub fn major_type(&self) -> MajorType {
        match self {
            DataItem::Positive { .. } => MajorType::PositiveInt,
            DataItem::Negative { .. } => MajorType::NegativeInt,
            DataItem::ByteString { .. } => MajorType::ByteString,
            DataItem::TextString { .. } => MajorType::TextString,
            DataItem::Array { .. } => MajorType::Array,
            DataItem::Map { .. } => MajorType::Map,
            DataItem::Tagged { .. } => MajorType::Semantic,
            DataItem::Primitive(_) => MajorType::Primitive,
        }
    }

    /// Unsigned value of a positive integer.
    pub fn as_u64(&self) -> Result<u64> {
        match self {
            DataItem::Positive { value, .. } => Ok(*value),
            other => Err(shape_error("positive integer", other)),
        }
    }

    /// Unsigned value of a positive integer that must fit 32 bits.
    pub fn as_u32(&self) -> Result<u32> {
        let value = self.as_u64()?;
        u32::try_from(value).map_err(|_| Error::UnexpectedCborItem {
            reason: format!("value {value} does not fit in 32 bits"),
        })
    }

    /// Signed value of a positive or negative integer.
    pub fn as_i64(&self) -> Result<i64> {
        match self {
            DataItem::Positive { value, .. } => {
                i64::try_from(*value).map_err(|_| Error::UnexpectedCborItem {
                    reason: format!("value {value} does not fit in a signed 64-bit integer"),
                })
            }
            DataItem::Negative { value, .. } => Ok(*value),
            other => Err(shape_error("integer", other)),
        }
    }

    /// Payload of a byte string.
    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            DataItem::ByteString { bytes, .. } => Ok(bytes),
            other => Err(shape_error("byte string", other)),
        }
    }

    /// Payload of a text string, validated as UTF-8 on demand.
    ///
    /// # Errors
    ///
    /// `TextNotUtf8` if the preserved bytes are not valid UTF-8.
    pub fn as_text(&self) -> Result<&str> {
        match self {
            DataItem::TextString { bytes, .. } => {
                std::str::from_utf8(bytes).map_err(|source| Error::TextNotUtf8 { source })
            }
            other => Err(shape_error("text string", other)),
        }
    }

    /// Items of an array.
    pub fn as_array(&self) -> Result<&[DataItem]> {
        match self {
            DataItem::Array { items, .. } => Ok(items),
            other => Err(shape_error("array", other)),
        }
    }

    /// Entries of a map.
    pub fn as_map(&self) -> Result<&[(DataItem, DataItem)]> {
        match self {
            DataItem::Map { entries, .. } => Ok(entries),
            other => Err(shape_error("map", other)),
        }
    }

    /// Unsigned big-integer value of this item.
    ///
    /// Accepts a plain positive integer or a tag-2 bignum whose magnitude
    /// fits 128 bits.
    ///
    /// # Errors
    ///
    /// `BigNumParse` for magnitudes above 16 bytes, `UnexpectedCborItem` for
    /// any other shape.
    pub fn as_big_uint(&self) -> Result<u128> {
        match self {
            DataItem::Positive { value, .. } => Ok(u128::from(*value)),
            DataItem::Tagged {
                tag: tag::POSITIVE_BIGNUM,
                item,
            } => magnitude_to_u128(item.as_bytes()?),
            other => Err(shape_error("unsigned big integer", other)),
        }
    }

    /// Signed big-integer value of this item.
    ///
    /// Accepts plain integers and tag-2/tag-3 bignums; a tag-3 magnitude `n`
    /// denotes `-1 - n`.
    pub fn as_big_int(&self) -> Result<i128> {
        match self {
            DataItem::Positive { value, .. } => Ok(i128::from(*value)),
            DataItem::Negative { value, .. } => Ok(i128::from(*value)),
            DataItem::Tagged {
                tag: tag::POSITIVE_BIGNUM,
                item,
            } => {
                let magnitude = magnitude_to_u128(item.as_bytes()?)?;
                i128::try_from(magnitude).map_err(|_| Error::BigNumParse { len: 16 })
            }
            DataItem::Tagged {
                tag: tag::NEGATIVE_BIGNUM,
                item,
            } => {
                let magnitude = magnitude_to_u128(item.as_bytes()?)?;
                let magnitude = i128::try_from(magnitude).map_err(|_| Error::BigNumParse { len: 16 })?;
                Ok(-1 - magnitude)
            }
            other => Err(shape_error("big integer", other)),
        }
    }

    /// Numeric value of a float primitive, widened to `f64`.
    pub fn as_f64(&self) -> Result<f64> {
        match self {
            DataItem::Primitive(Primitive::HalfFloat(bits)) => {
                Ok(f64::from(half::f16::from_bits(*bits).to_f32()))
            }
            DataItem::Primitive(Primitive::SingleFloat(v)) => Ok(f64::from(*v)),
            DataItem::Primitive(Primitive::DoubleFloat(v)) => Ok(*v),
            other => Err(shape_error("float", other)),
        }
    }
}

fn shape_error(expected: &str, actual: &DataItem) -> Error {
    Error::UnexpectedCborItem {
        reason: format!("expected {expected}, got {}", actual.major_type()),
    }
}

fn chunk_lengths(lengths: impl Iterator<Item = usize>) -> Result<Vec<usize>> {
    let chunks: Vec<usize> = lengths.collect();
    if let Some(too_long) = chunks.iter().find(|&&len| len > 23) {
        return Err(Error::InvalidPayload {
            reason: format!("string chunk of {too_long} bytes exceeds the 23-byte chunk limit"),
        });
    }
    Ok(chunks)
}

fn magnitude_to_u128(magnitude: &[u8]) -> Result<u128> {
    if magnitude.len() > 16 {
        return Err(Error::BigNumParse {
            len: magnitude.len(),
        });
    }
    let mut value = 0u128;
    for &byte in magnitude {
        value = (value << 8) | u128::from(byte);
    }
    Ok(value)
}

impl fmt::Display for DataItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataItem::Positive { value, .. } => write!(f, "Positive({value})"),
            DataItem::Negative { value, .. } => write!(f, "Negative({value})"),
            DataItem::ByteString { bytes, .. } => {
                write!(f, "ByteString(len {}, {})", bytes.len(), hex::encode(bytes))
            }
            DataItem::TextString { bytes, .. } => match std::str::from_utf8(bytes) {
                Ok(text) => write!(f, "TextString({text:?})"),
                Err(_) => write!(f, "TextString(invalid utf-8, {})", hex::encode(bytes)),
            },
            DataItem::Array { items, indefinite } => {
                let marker = if *indefinite { "*" } else { "" };
                write!(f, "Array{marker}[{}]", items.len())
            }
            DataItem::Map { entries, indefinite } => {
                let marker = if *indefinite { "*" } else { "" };
                write!(f, "Map{marker}[{}]", entries.len())
            }
            DataItem::Tagged { tag, .. } => write!(f, "Tag({tag})"),
            DataItem::Primitive(primitive) => match primitive {
                Primitive::False => f.write_str("False"),
                Primitive::True => f.write_str("True"),
                Primitive::Null => f.write_str("Null"),
                Primitive::Undefined => f.write_str("Undefined"),
                Primitive::Simple(value) => write!(f, "Simple({value})"),
                Primitive::HalfFloat(bits) => {
                    write!(f, "HalfFloat({})", half::f16::from_bits(*bits))
                }
                Primitive::SingleFloat(value) => write!(f, "SingleFloat({value})"),
                Primitive::DoubleFloat(value) => write!(f, "DoubleFloat({value})"),
                Primitive::Break => f.write_str("Break"),
            },
        }
    }
}

/// Indented multi-line rendering of a list of items, for trace logging.
pub fn dump_items(items: &[DataItem]) -> String {
    let mut out = String::new();
    for item in items {
        dump_into(&mut out, item, 0);
    }
    out
}

fn dump_into(out: &mut String, item: &DataItem, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(&item.to_string());
    out.push('\n');
    match item {
        DataItem::Array { items, .. } => {
            for child in items {
                dump_into(out, child, depth + 1);
            }
        }
        DataItem::Map { entries, .. } => {
            for (key, value) in entries {
                dump_into(out, key, depth + 1);
                dump_into(out, value, depth + 2);
            }
        }
        DataItem::Tagged { item, .. } => dump_into(out, item, depth + 1),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_selection() {
        assert_eq!(IntWidth::for_value(0), IntWidth::Tiny);
        assert_eq!(IntWidth::for_value(23), IntWidth::Tiny);
        assert_eq!(IntWidth::for_value(24), IntWidth::U8);
        assert_eq!(IntWidth::for_value(255), IntWidth::U8);
        assert_eq!(IntWidth::for_value(256), IntWidth::U16);
        assert_eq!(IntWidth::for_value(65536), IntWidth::U32);
        assert_eq!(IntWidth::for_value(1 << 32), IntWidth::U64);
    }

    #[test]
    fn test_negative_rejects_non_negative() {
        let err = DataItem::negative(0).unwrap_err();
        assert!(matches!(err, Error::NegativeIntExpected { value: 0 }));
        assert!(DataItem::negative(7).is_err());
        assert!(DataItem::negative(-1).is_ok());
    }

    #[test]
    fn test_negative_width_tracks_encoded_field() {
        // -24 encodes as 23, still tiny; -25 encodes as 24, needs a byte.
        match DataItem::negative(-24).unwrap() {
            DataItem::Negative { width, .. } => assert_eq!(width, IntWidth::Tiny),
            _ => unreachable!(),
        }
        match DataItem::negative(-25).unwrap() {
            DataItem::Negative { width, .. } => assert_eq!(width, IntWidth::U8),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_simple_value_range() {
        assert!(DataItem::simple(31).is_err());
        assert!(DataItem::simple(32).is_ok());
        assert!(DataItem::simple(255).is_ok());
    }

    #[test]
    fn test_chunked_string_rejects_long_chunks() {
        let long = [0u8; 24];
        assert!(DataItem::chunked_byte_string(&[&long[..]]).is_err());
        let ok = DataItem::chunked_byte_string(&[b"ab".as_slice(), b"c".as_slice()]).unwrap();
        assert_eq!(ok.as_bytes().unwrap(), b"abc");
    }

    #[test]
    fn test_text_utf8_checked_on_demand() {
        let item = DataItem::TextString {
            bytes: vec![0xff, 0xfe],
            chunks: None,
        };
        assert!(matches!(
            item.as_text().unwrap_err(),
            Error::TextNotUtf8 { .. }
        ));

        let item = DataItem::text_string("ok");
        assert_eq!(item.as_text().unwrap(), "ok");
    }

    #[test]
    fn test_big_uint_from_tag_2() {
        // 2^64 as a 9-byte magnitude.
        let magnitude = vec![0x01, 0, 0, 0, 0, 0, 0, 0, 0];
        let item = DataItem::tagged(2, DataItem::byte_string(magnitude));
        assert_eq!(item.as_big_uint().unwrap(), 18446744073709551616u128);
    }

    #[test]
    fn test_big_int_from_tag_3() {
        // Magnitude 2^64 under tag 3 denotes -1 - 2^64.
        let magnitude = vec![0x01, 0, 0, 0, 0, 0, 0, 0, 0];
        let item = DataItem::tagged(3, DataItem::byte_string(magnitude));
        assert_eq!(item.as_big_int().unwrap(), -1 - 18446744073709551616i128);
    }

    #[test]
    fn test_big_uint_oversized_magnitude() {
        let item = DataItem::tagged(2, DataItem::byte_string(vec![1u8; 17]));
        assert!(matches!(
            item.as_big_uint().unwrap_err(),
            Error::BigNumParse { len: 17 }
        ));
    }

    #[test]
    fn test_accessor_shape_errors() {
        let item = DataItem::positive(1);
        assert!(item.as_bytes().is_err());
        assert!(item.as_array().is_err());
        assert!(DataItem::text_string("x").as_u64().is_err());
    }

    #[test]
    fn test_as_u32_range_check() {
        assert_eq!(DataItem::positive(7).as_u32().unwrap(), 7);
        assert!(DataItem::positive(1 << 35).as_u32().is_err());
    }

    #[test]
    fn test_major_type_rank_order() {
        assert!(MajorType::PositiveInt < MajorType::NegativeInt);
        assert!(MajorType::NegativeInt < MajorType::ByteString);
        assert!(MajorType::Semantic < MajorType::Primitive);
    }

    #[test]
    fn test_dump_items_indents_children() {
        let item = DataItem::array(vec![
            DataItem::positive(1),
            DataItem::array(vec![DataItem::text_string("b")]),
        ]);
        let dump = dump_items(std::slice::from_ref(&item));
        assert!(dump.contains("Array[2]"));
        assert!(dump.contains("  Positive(1)"));
        assert!(dump.contains("    TextString(\"b\")"));
    }
}
