//! Transport module - timed duplex-stream I/O.
//!
//! Wraps the byte-stream endpoint with per-operation deadlines and the
//! framed segment read loop.

mod socket;

pub use socket::{NodeSocket, DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT};
