//! CBOR codec (RFC 7049) - data model, decoder, and encoder.
//!
//! The codec covers all eight major types, the five length encodings,
//! indefinite-length containers, chunked byte/text strings, half/single/
//! double-precision floats, and the recognized semantic tags. Decoded items
//! carry enough layout information (integer widths, chunk boundaries,
//! indefinite flags) that `encode(decode(x)) == x` byte for byte.

mod decode;
mod encode;
mod item;
mod reader;

pub use decode::decode;
pub use encode::{canonical_key_cmp, encode_items};
pub use item::{dump_items, tag, DataItem, IntWidth, MajorType, Primitive, SIMPLE_VALUE_MIN};
pub use reader::BitReader;
