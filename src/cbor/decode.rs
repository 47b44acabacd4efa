//! Fail-fast CBOR decoder.
//!
//! Reads the 3-bit major type, resolves the 5-bit additional type to a
//! length or value, then dispatches per major type. Decoding never returns a
//! partial item: the first malformed byte aborts the whole call with the
//! byte offset in the error.

use crate::cbor::item::{tag, DataItem, IntWidth, MajorType, Primitive, SIMPLE_VALUE_MIN};
use crate::cbor::reader::BitReader;
use crate::error::{Error, Result};

pub(crate) const ADDITIONAL_U8: u8 = 24;
pub(crate) const ADDITIONAL_U16: u8 = 25;
pub(crate) const ADDITIONAL_U32: u8 = 26;
pub(crate) const ADDITIONAL_U64: u8 = 27;
pub(crate) const ADDITIONAL_INDEFINITE: u8 = 31;

const PRIMITIVE_FALSE: u8 = 20;
const PRIMITIVE_TRUE: u8 = 21;
const PRIMITIVE_NULL: u8 = 22;
const PRIMITIVE_UNDEFINED: u8 = 23;
const PRIMITIVE_SIMPLE: u8 = 24;
const PRIMITIVE_HALF: u8 = 25;
const PRIMITIVE_SINGLE: u8 = 26;
const PRIMITIVE_DOUBLE: u8 = 27;
const PRIMITIVE_BREAK: u8 = 31;

/// The indefinite-length terminator as a full byte.
pub(crate) const BREAK_BYTE: u8 = 0xff;

/// Semantic tags that are decoded with a structurally validated payload.
fn is_interpreted_tag(id: u64) -> bool {
    matches!(
        id,
        tag::DATE_TIME_STRING
            | tag::DATE_TIME_EPOCH
            | tag::POSITIVE_BIGNUM
            | tag::NEGATIVE_BIGNUM
            | tag::URI
            | tag::BASE64URL
            | tag::BASE64
            | tag::REGEX
            | tag::MIME
    )
}

/// Semantic tags that are accepted and passed through without structural
/// interpretation. They must not be silently discarded.
fn is_passthrough_tag(id: u64) -> bool {
    matches!(
        id,
        tag::DECIMAL_FRACTION
            | tag::BIG_FLOAT
            | tag::EXPECT_BASE64URL
            | tag::EXPECT_BASE64
            | tag::EXPECT_BASE16
            | tag::ENCODED_CBOR
            | tag::SELF_DESCRIBE
    )
}

/// Decode a byte buffer into the list of data items it contains.
///
/// The whole buffer must be consumed; a stray break code or trailing
/// malformed item fails the entire call.
pub fn decode(data: &[u8]) -> Result<Vec<DataItem>> {
    let mut reader = BitReader::new(data);
    let mut items = Vec::new();
    while reader.has_more() {
        let offset = reader.byte_offset();
        match next_item(&mut reader)? {
            DataItem::Primitive(Primitive::Break) => {
                return Err(Error::UnexpectedCborItem {
                    reason: format!("stray break code at byte offset {offset}"),
                });
            }
            item => items.push(item),
        }
    }
    Ok(items)
}

/// Parse the next data item. The reader must be positioned on a major type.
fn next_item(reader: &mut BitReader<'_>) -> Result<DataItem> {
    let offset = reader.byte_offset();
    let major = reader.read_bits(3)? as u8;
    match major {
        0 => decode_positive(reader),
        1 => decode_negative(reader),
        2 => decode_string(reader, MajorType::ByteString),
        3 => decode_string(reader, MajorType::TextString),
        4 => decode_array(reader),
        5 => decode_map(reader),
        6 => decode_semantic(reader, offset),
        7 => decode_primitive(reader, offset),
        other => Err(Error::UnhandledMajorType {
            major: other,
            offset,
        }),
    }
}

/// Read the 5-bit additional type and resolve it to a value:
/// 0..=23 direct, 24..=27 one following uint of 8/16/32/64 bits, 31
/// indefinite (value 0). 28..=30 are reserved.
fn read_additional(reader: &mut BitReader<'_>) -> Result<(u8, u64)> {
    let offset = reader.byte_offset();
    let additional = reader.read_bits(5)? as u8;
    match additional {
        0..=23 => Ok((additional, u64::from(additional))),
        ADDITIONAL_U8 => Ok((additional, u64::from(reader.read_u8()?))),
        ADDITIONAL_U16 => Ok((additional, u64::from(reader.read_u16()?))),
        ADDITIONAL_U32 => Ok((additional, u64::from(reader.read_u32()?))),
        ADDITIONAL_U64 => Ok((additional, reader.read_u64()?)),
        ADDITIONAL_INDEFINITE => Ok((additional, 0)),
        other => Err(Error::UnhandledAdditionalType {
            additional: other,
            offset,
        }),
    }
}

fn width_for(additional: u8) -> IntWidth {
    match additional {
        ADDITIONAL_U8 => IntWidth::U8,
        ADDITIONAL_U16 => IntWidth::U16,
        ADDITIONAL_U32 => IntWidth::U32,
        ADDITIONAL_U64 => IntWidth::U64,
        _ => IntWidth::Tiny,
    }
}

fn decode_positive(reader: &mut BitReader<'_>) -> Result<DataItem> {
    let (additional, value) = read_additional(reader)?;
    Ok(DataItem::Positive {
        width: width_for(additional),
        value,
    })
}

fn decode_negative(reader: &mut BitReader<'_>) -> Result<DataItem> {
    let (additional, encoded) = read_additional(reader)?;
    if encoded > i64::MAX as u64 {
        // -1 - encoded underflows i64; surface as a tag-3 big negative.
        return Ok(DataItem::tagged(
            tag::NEGATIVE_BIGNUM,
            DataItem::byte_string(encoded.to_be_bytes().to_vec()),
        ));
    }
    Ok(DataItem::Negative {
        width: width_for(additional),
        value: -1 - encoded as i64,
    })
}

/// Shared byte/text string decoding. The definite form reads `length` bytes;
/// the indefinite form reads break-terminated chunks whose one-byte headers
/// repeat the string's major type with a direct length of 0..=23.
fn decode_string(reader: &mut BitReader<'_>, major: MajorType) -> Result<DataItem> {
    let (additional, length) = read_additional(reader)?;

    let (bytes, chunks) = if additional != ADDITIONAL_INDEFINITE {
        (reader.read_bytes(length as usize)?.to_vec(), None)
    } else {
        let mut payload = Vec::new();
        let mut chunks = Vec::new();
        loop {
            let offset = reader.byte_offset();
            let token = reader.read_u8()?;
            if token == BREAK_BYTE {
                break;
            }
            if token >> 5 != major as u8 {
                return Err(Error::InvalidPayload {
                    reason: format!(
                        "chunk at byte offset {offset} does not carry major type {major}"
                    ),
                });
            }
            let chunk_length = (token & 0x1f) as usize;
            if chunk_length > 23 {
                return Err(Error::InvalidPayload {
                    reason: format!(
                        "chunk at byte offset {offset} uses unsupported length encoding {chunk_length}"
                    ),
                });
            }
            payload.extend_from_slice(reader.read_bytes(chunk_length)?);
            chunks.push(chunk_length);
        }
        (payload, Some(chunks))
    };

    Ok(match major {
        MajorType::ByteString => DataItem::ByteString { bytes, chunks },
        _ => DataItem::TextString { bytes, chunks },
    })
}

fn decode_array(reader: &mut BitReader<'_>) -> Result<DataItem> {
    let (additional, length) = read_additional(reader)?;
    let indefinite = additional == ADDITIONAL_INDEFINITE;
    let mut items = Vec::new();

    if indefinite {
        loop {
            match next_item(reader)? {
                DataItem::Primitive(Primitive::Break) => break,
                item => items.push(item),
            }
        }
    } else {
        for _ in 0..length {
            let offset = reader.byte_offset();
            match next_item(reader)? {
                DataItem::Primitive(Primitive::Break) => {
                    return Err(Error::UnexpectedCborItem {
                        reason: format!(
                            "break code inside a definite-length array at byte offset {offset}"
                        ),
                    });
                }
                item => items.push(item),
            }
        }
    }

    Ok(DataItem::Array { items, indefinite })
}

fn decode_map(reader: &mut BitReader<'_>) -> Result<DataItem> {
    let (additional, length) = read_additional(reader)?;
    let indefinite = additional == ADDITIONAL_INDEFINITE;
    let mut entries = Vec::new();

    loop {
        if !indefinite && entries.len() as u64 == length {
            break;
        }
        let key_offset = reader.byte_offset();
        let key = match next_item(reader)? {
            // The break is only legal in the key position of an
            // indefinite-length map.
            DataItem::Primitive(Primitive::Break) if indefinite => break,
            DataItem::Primitive(Primitive::Break) => {
                return Err(Error::UnexpectedCborItem {
                    reason: format!(
                        "break code inside a definite-length map at byte offset {key_offset}"
                    ),
                });
            }
            key => key,
        };

        let value_offset = reader.byte_offset();
        let value = match next_item(reader)? {
            DataItem::Primitive(Primitive::Break) => {
                return Err(Error::UnexpectedCborItem {
                    reason: format!(
                        "break code in map value position at byte offset {value_offset}"
                    ),
                });
            }
            value => value,
        };
        entries.push((key, value));
    }

    Ok(DataItem::Map {
        entries,
        indefinite,
    })
}

fn decode_semantic(reader: &mut BitReader<'_>, offset: usize) -> Result<DataItem> {
    let (additional, tag) = read_additional(reader)?;
    if additional == ADDITIONAL_INDEFINITE {
        return Err(Error::UnhandledAdditionalType {
            additional: ADDITIONAL_INDEFINITE,
            offset,
        });
    }

    if !is_interpreted_tag(tag) && !is_passthrough_tag(tag) {
        return Err(Error::UnhandledSemanticTag { tag, offset });
    }

    let payload_offset = reader.byte_offset();
    let payload = match next_item(reader)? {
        DataItem::Primitive(Primitive::Break) => {
            return Err(Error::UnexpectedCborItem {
                reason: format!("break code as tag payload at byte offset {payload_offset}"),
            });
        }
        item => item,
    };

    if is_interpreted_tag(tag) {
        let valid = match tag {
            // Date/time strings, URI, base64url, base64, regex, MIME all
            // carry a text payload.
            0 | 32..=36 => payload.major_type() == MajorType::TextString,
            // Epoch date/time carries a signed integer.
            1 => matches!(
                payload.major_type(),
                MajorType::PositiveInt | MajorType::NegativeInt
            ),
            // Bignums carry the big-endian magnitude bytes.
            2 | 3 => payload.major_type() == MajorType::ByteString,
            _ => true,
        };
        if !valid {
            return Err(Error::UnexpectedCborItem {
                reason: format!(
                    "tag {tag} at byte offset {offset} does not accept a {} payload",
                    payload.major_type()
                ),
            });
        }
    }

    Ok(DataItem::tagged(tag, payload))
}

fn decode_primitive(reader: &mut BitReader<'_>, offset: usize) -> Result<DataItem> {
    let additional = reader.read_bits(5)? as u8;
    let primitive = match additional {
        PRIMITIVE_FALSE => Primitive::False,
        PRIMITIVE_TRUE => Primitive::True,
        PRIMITIVE_NULL => Primitive::Null,
        PRIMITIVE_UNDEFINED => Primitive::Undefined,
        PRIMITIVE_SIMPLE => {
            let value = reader.read_u8()?;
            if value < SIMPLE_VALUE_MIN {
                return Err(Error::UnexpectedCborItem {
                    reason: format!(
                        "simple value {value} at byte offset {offset} is below the minimum of {SIMPLE_VALUE_MIN}"
                    ),
                });
            }
            Primitive::Simple(value)
        }
        PRIMITIVE_HALF => Primitive::HalfFloat(reader.read_u16()?),
        PRIMITIVE_SINGLE => Primitive::SingleFloat(f32::from_bits(reader.read_u32()?)),
        PRIMITIVE_DOUBLE => Primitive::DoubleFloat(f64::from_bits(reader.read_u64()?)),
        PRIMITIVE_BREAK => Primitive::Break,
        other => {
            return Err(Error::UnhandledAdditionalType {
                additional: other,
                offset,
            });
        }
    };
    Ok(DataItem::Primitive(primitive))
}
