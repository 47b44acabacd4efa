//! Error types for the Ouroboros node-to-client library.
//!
//! Every failure in the crate is one variant of [`Error`]. Each variant
//! carries an integer diagnostic code (see [`Error::code`]) so external
//! tooling can classify failures without parsing messages.

use std::io;
use std::path::PathBuf;
use std::str::Utf8Error;

use thiserror::Error;

/// Main error type for all client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The socket path does not exist on the filesystem.
    #[error("socket [{}] not found", path.display())]
    SocketNotFound {
        /// Path that was probed.
        path: PathBuf,
    },

    /// Writing to the stream failed.
    #[error("error writing to stream: {source}")]
    StreamWrite {
        #[source]
        source: io::Error,
    },

    /// Reading from the stream failed.
    #[error("error reading from stream: {source}")]
    StreamRead {
        #[source]
        source: io::Error,
    },

    /// The peer closed the stream before any byte of the next segment.
    #[error("stream closed by peer")]
    EndOfStream,

    /// A read or write deadline expired.
    #[error("{operation} deadline exceeded")]
    Timeout {
        /// Which operation hit its deadline.
        operation: &'static str,
    },

    /// Any other I/O failure (connect, shutdown).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A segment header slice was not exactly 8 bytes.
    #[error("segment header must be exactly 8 bytes, got {actual}")]
    InvalidHeaderSize {
        /// Number of bytes actually presented.
        actual: usize,
    },

    /// The bit reader ran out of input.
    #[error("unexpected end of input at byte offset {offset}")]
    BitReaderEof {
        /// Byte offset of the cursor when the read was attempted.
        offset: usize,
    },

    /// More than 64 bits were requested in a single read.
    #[error("cannot read {requested} bits into a 64-bit value")]
    CapacityExceeded {
        /// Number of bits requested.
        requested: u32,
    },

    /// Reserved CBOR major type value (unreachable for RFC 7049 input).
    #[error("unhandled CBOR major type {major} at byte offset {offset}")]
    UnhandledMajorType {
        /// Raw major type value.
        major: u8,
        /// Byte offset of the offending item.
        offset: usize,
    },

    /// Reserved additional-type encoding (28..=30).
    #[error("unhandled CBOR additional type {additional} at byte offset {offset}")]
    UnhandledAdditionalType {
        /// Raw additional type value.
        additional: u8,
        /// Byte offset of the offending item.
        offset: usize,
    },

    /// A non-negative value was passed to a negative-integer constructor.
    #[error("negative integer requires a value below zero, got {value}")]
    NegativeIntExpected {
        /// The rejected value.
        value: i64,
    },

    /// `read_bytes` was called while the cursor sat mid-byte.
    #[error("byte read requires an aligned cursor, bit position {position} is mid-byte")]
    UnalignedRead {
        /// Absolute bit position of the cursor.
        position: usize,
    },

    /// A big-integer magnitude was too large to convert.
    #[error("big integer magnitude of {len} bytes exceeds the supported range")]
    BigNumParse {
        /// Magnitude length in bytes.
        len: usize,
    },

    /// A semantic tag outside the recognized and pass-through sets.
    #[error("unhandled semantic tag {tag} at byte offset {offset}")]
    UnhandledSemanticTag {
        /// The tag id.
        tag: u64,
        /// Byte offset of the tag.
        offset: usize,
    },

    /// A text string's payload was requested as text but is not UTF-8.
    #[error("text string is not valid UTF-8: {source}")]
    TextNotUtf8 {
        #[source]
        source: Utf8Error,
    },

    /// An SDU or chunk stream inconsistent with its framing.
    #[error("invalid payload: {reason}")]
    InvalidPayload {
        /// Human-readable description of the inconsistency.
        reason: String,
    },

    /// A reply arrived in initiator mode where responder mode was required.
    #[error("expected a responder segment, got initiator")]
    InvalidContainerMode,

    /// A reply decoded fine but did not have the expected shape.
    #[error("unexpected CBOR item: {reason}")]
    UnexpectedCborItem {
        /// What was expected and what was found.
        reason: String,
    },

    /// The node refused the proposed versions.
    #[error("handshake failed: {reason}")]
    HandshakeFailed {
        /// Refusal detail reported by the node.
        reason: String,
    },

    /// A max-size continuation segment switched mini-protocol or mode.
    #[error("interleaved SDU: expected {expected}, got {actual}")]
    InterleavedSdu {
        /// `(protocol, mode)` of the open SDU.
        expected: String,
        /// `(protocol, mode)` of the offending segment.
        actual: String,
    },
}

impl Error {
    /// Integer diagnostic code for this error kind.
    ///
    /// Codes are grouped by layer: 1xx stream/socket, 2xx multiplex header,
    /// 3xx bit reader, 4xx CBOR codec, 5xx protocol.
    pub fn code(&self) -> u16 {
        match self {
            Error::SocketNotFound { .. } => 100,
            Error::StreamWrite { .. } => 101,
            Error::StreamRead { .. } => 102,
            Error::EndOfStream => 103,
            Error::Timeout { .. } => 104,
            Error::Io(_) => 105,
            Error::InvalidHeaderSize { .. } => 201,
            Error::BitReaderEof { .. } => 301,
            Error::CapacityExceeded { .. } => 302,
            Error::UnhandledMajorType { .. } => 401,
            Error::UnhandledAdditionalType { .. } => 402,
            Error::NegativeIntExpected { .. } => 403,
            Error::UnalignedRead { .. } => 404,
            Error::BigNumParse { .. } => 405,
            Error::UnhandledSemanticTag { .. } => 406,
            Error::TextNotUtf8 { .. } => 407,
            Error::InvalidPayload { .. } => 501,
            Error::InvalidContainerMode => 502,
            Error::UnexpectedCborItem { .. } => 503,
            Error::HandshakeFailed { .. } => 504,
            Error::InterleavedSdu { .. } => 505,
        }
    }
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
