//! Service Data Units: fragmentation of outbound messages and incremental
//! reassembly of inbound segments.
//!
//! One SDU carries one logical message for one `(mini-protocol, mode)` pair.
//! Messages larger than [`MAX_SDU_SIZE`] are split into consecutive max-size
//! segments terminated by a final short segment; a message whose length is an
//! exact multiple of the maximum is terminated by a zero-length segment.
//!
//! [`SduBuffer`] is a push-based state machine over `bytes::BytesMut`:
//! partial reads accumulate internally and complete SDUs are handed out as
//! soon as their terminating segment arrives.

use bytes::BytesMut;

use crate::cbor::{self, DataItem};
use crate::error::{Error, Result};
use crate::mux::header::{Mode, SegmentHeader, HEADER_SIZE};
use crate::mux::protocol::MiniProtocol;

/// Maximum number of payload bytes in one segment.
pub const MAX_SDU_SIZE: usize = 12288;

/// One logical message on one mini-protocol channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDataUnit {
    protocol: MiniProtocol,
    mode: Mode,
    items: Vec<DataItem>,
}

impl ServiceDataUnit {
    /// Create an SDU from decoded data items.
    pub fn new(protocol: MiniProtocol, mode: Mode, items: Vec<DataItem>) -> Self {
        Self {
            protocol,
            mode,
            items,
        }
    }

    /// The mini-protocol channel this SDU belongs to.
    pub fn protocol(&self) -> MiniProtocol {
        self.protocol
    }

    /// Which side produced this SDU.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The decoded data items.
    pub fn items(&self) -> &[DataItem] {
        &self.items
    }

    /// Serialize into wire segments.
    ///
    /// Each non-final segment carries exactly [`MAX_SDU_SIZE`] payload bytes;
    /// the final segment is shorter. When the payload is an exact multiple of
    /// the maximum, a zero-length segment is appended so the receiver can
    /// detect end-of-message.
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload = cbor::encode_items(&self.items);
        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());

        let mut offset = 0;
        loop {
            let take = (payload.len() - offset).min(MAX_SDU_SIZE);
            let header = SegmentHeader::new(self.protocol, self.mode, take as u16);
            buf.extend_from_slice(&header.encode());
            buf.extend_from_slice(&payload[offset..offset + take]);
            offset += take;
            if take < MAX_SDU_SIZE {
                break;
            }
        }
        buf
    }
}

/// Parsing state for the next segment.
#[derive(Debug)]
enum State {
    /// Waiting for a complete 8-byte header.
    WaitingForHeader,
    /// Header parsed, waiting for its payload bytes.
    WaitingForPayload { header: SegmentHeader },
}

/// Payload accumulated across the max-size segments of one open SDU.
#[derive(Debug)]
struct Assembly {
    protocol: MiniProtocol,
    mode: Mode,
    payload: BytesMut,
}

/// Buffer that accumulates incoming stream bytes and extracts complete SDUs.
#[derive(Debug)]
pub struct SduBuffer {
    /// Raw bytes not yet consumed by the state machine.
    buffer: BytesMut,
    state: State,
    /// Open multi-segment SDU, if the last segment was max-size.
    assembly: Option<Assembly>,
}

impl SduBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(2 * MAX_SDU_SIZE),
            state: State::WaitingForHeader,
            assembly: None,
        }
    }

    /// Push stream bytes and extract every SDU they complete.
    ///
    /// Partial segments are buffered for the next push.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<ServiceDataUnit>> {
        self.buffer.extend_from_slice(data);

        let mut complete = Vec::new();
        while let Some(sdu) = self.try_extract_one()? {
            complete.push(sdu);
        }
        Ok(complete)
    }

    fn try_extract_one(&mut self) -> Result<Option<ServiceDataUnit>> {
        match &self.state {
            State::WaitingForHeader => {
                if self.buffer.len() < HEADER_SIZE {
                    return Ok(None);
                }
                let header = SegmentHeader::decode(&self.buffer[..HEADER_SIZE])?;
                let _ = self.buffer.split_to(HEADER_SIZE);
                self.state = State::WaitingForPayload { header };
                self.try_extract_one()
            }

            State::WaitingForPayload { header } => {
                let length = header.payload_length as usize;
                if self.buffer.len() < length {
                    return Ok(None);
                }
                let header = *header;
                let segment = self.buffer.split_to(length);
                self.state = State::WaitingForHeader;

                match &mut self.assembly {
                    Some(assembly) => {
                        if assembly.protocol != header.protocol || assembly.mode != header.mode {
                            return Err(Error::InterleavedSdu {
                                expected: format!("({}, {})", assembly.protocol, assembly.mode),
                                actual: format!("({}, {})", header.protocol, header.mode),
                            });
                        }
                        assembly.payload.extend_from_slice(&segment);
                    }
                    None => {
                        self.assembly = Some(Assembly {
                            protocol: header.protocol,
                            mode: header.mode,
                            payload: BytesMut::from(&segment[..]),
                        });
                    }
                }

                if length == MAX_SDU_SIZE {
                    // Max-size segment: the message continues.
                    return self.try_extract_one();
                }

                let assembly = self.assembly.take().expect("assembly opened above");
                let items = cbor::decode(&assembly.payload)?;
                Ok(Some(ServiceDataUnit::new(
                    assembly.protocol,
                    assembly.mode,
                    items,
                )))
            }
        }
    }

    /// Whether an SDU is open mid-reassembly or a segment is partially read.
    pub fn has_partial(&self) -> bool {
        self.assembly.is_some()
            || !self.buffer.is_empty()
            || matches!(self.state, State::WaitingForPayload { .. })
    }

    /// Number of raw buffered bytes not yet consumed.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the raw buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for SduBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a complete byte stream into SDUs.
///
/// # Errors
///
/// `InvalidPayload` if the data ends mid-segment or mid-SDU.
pub fn parse_service_data_units(data: &[u8]) -> Result<Vec<ServiceDataUnit>> {
    let mut buffer = SduBuffer::new();
    let sdus = buffer.push(data)?;
    if buffer.has_partial() {
        return Err(Error::InvalidPayload {
            reason: "data ends mid-segment".to_string(),
        });
    }
    Ok(sdus)
}
