//! Segment header encoding and decoding.
//!
//! Every multiplexed segment starts with an 8-byte header:
//! ```text
//! ┌───────────────────┬─┬──────────────────┬────────────────┐
//! │ Transmission time │M│ Mini protocol id │ Payload length │
//! │ 4 bytes           │1│ 15 bits          │ 2 bytes        │
//! │ u32 BE            │b│                  │ u16 BE         │
//! └───────────────────┴─┴──────────────────┴────────────────┘
//! ```
//! The transmission time is the lower 32 bits of the sender's wall clock in
//! microseconds. The mode bit M is 0 in segments from the initiator and 1 in
//! segments from the responder. There is no checksum; corruption surfaces as
//! a CBOR decode failure downstream.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};
use crate::mux::protocol::MiniProtocol;

/// Header size in bytes (fixed, exactly 8).
pub const HEADER_SIZE: usize = 8;

/// Which side of the dual mini-protocol instance a segment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The side that initially has agency.
    Initiator,
    /// The replying side.
    Responder,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Initiator => f.write_str("initiator"),
            Mode::Responder => f.write_str("responder"),
        }
    }
}

/// Decoded segment header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    /// Lower 32 bits of the sender's microsecond wall clock.
    pub transmission_time: u32,
    /// Originating side.
    pub mode: Mode,
    /// Logical channel of this segment.
    pub protocol: MiniProtocol,
    /// Number of payload bytes that follow the header.
    pub payload_length: u16,
}

impl SegmentHeader {
    /// Create a header stamped with the current wall clock.
    pub fn new(protocol: MiniProtocol, mode: Mode, payload_length: u16) -> Self {
        Self {
            transmission_time: wall_clock_micros(),
            mode,
            protocol,
            payload_length,
        }
    }

    /// Create a header with an explicit transmission time.
    pub fn with_time(
        transmission_time: u32,
        protocol: MiniProtocol,
        mode: Mode,
        payload_length: u16,
    ) -> Self {
        Self {
            transmission_time,
            mode,
            protocol,
            payload_length,
        }
    }

    /// Encode to the 8-byte wire form (big endian).
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.transmission_time.to_be_bytes());
        let mut protocol_field = self.protocol.id() & 0x7fff;
        if self.mode == Mode::Responder {
            protocol_field |= 0x8000;
        }
        buf[4..6].copy_from_slice(&protocol_field.to_be_bytes());
        buf[6..8].copy_from_slice(&self.payload_length.to_be_bytes());
        buf
    }

    /// Decode from a byte slice.
    ///
    /// # Errors
    ///
    /// `InvalidHeaderSize` unless the slice is exactly 8 bytes.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() != HEADER_SIZE {
            return Err(Error::InvalidHeaderSize { actual: buf.len() });
        }
        let protocol_field = u16::from_be_bytes([buf[4], buf[5]]);
        let mode = if protocol_field & 0x8000 != 0 {
            Mode::Responder
        } else {
            Mode::Initiator
        };
        Ok(Self {
            transmission_time: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            mode,
            protocol: MiniProtocol::from_id(protocol_field & 0x7fff),
            payload_length: u16::from_be_bytes([buf[6], buf[7]]),
        })
    }

    /// Whether this segment came from the initiator.
    #[inline]
    pub fn is_from_initiator(&self) -> bool {
        self.mode == Mode::Initiator
    }

    /// Whether this segment came from the responder.
    #[inline]
    pub fn is_from_responder(&self) -> bool {
        self.mode == Mode::Responder
    }
}

impl fmt::Display for SegmentHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "time {} mode {} protocol {} payload {}",
            self.transmission_time, self.mode, self.protocol, self.payload_length
        )
    }
}

/// Lower 32 bits of the wall clock in microseconds.
fn wall_clock_micros() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_micros() as u32)
        .unwrap_or(0)
}
