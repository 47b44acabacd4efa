//! Multiplexing layer - segment headers, mini-protocol ids, and SDU
//! fragmentation/reassembly.
//!
//! Application payloads are framed into fixed-size segments over a single
//! duplex byte stream. Each segment carries an 8-byte header tagging it with
//! a mini-protocol id and an initiator/responder mode bit; one logical
//! message (a Service Data Unit) spans one or more segments.

mod header;
mod protocol;
mod sdu;

pub use header::{Mode, SegmentHeader, HEADER_SIZE};
pub use protocol::MiniProtocol;
pub use sdu::{parse_service_data_units, SduBuffer, ServiceDataUnit, MAX_SDU_SIZE};
