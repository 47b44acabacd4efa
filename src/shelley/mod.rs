//! Shelley node-to-client mini-protocols and the client driver.
//!
//! The handshake and the chain-sync tip query demonstrate the
//! request/reply pattern every higher mini-protocol builds on: the caller
//! serializes one CBOR array, wraps it in an initiator-mode SDU, and parses
//! the responder-mode SDU that comes back.

pub mod chain_sync;
pub mod handshake;

mod client;

pub use chain_sync::{ChainSyncMessage, Tip};
pub use client::Client;
pub use handshake::{Accepted, HandshakeResult, RefuseReason, MAINNET_NETWORK_MAGIC};
