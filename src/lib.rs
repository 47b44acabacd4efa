//! # ouroboros-client
//!
//! Client library for the Ouroboros node-to-client wire protocol, speaking
//! to a Cardano Shelley node over a local stream socket.
//!
//! ## Architecture
//!
//! - **CBOR codec** ([`cbor`]): encoder/decoder for RFC 7049 data items that
//!   round-trips byte for byte.
//! - **Multiplexing** ([`mux`]): fixed-size Service Data Units over a single
//!   duplex stream, tagged with a mini-protocol id and an
//!   initiator/responder bit.
//! - **Transport** ([`transport`]): timed read/write with the framed segment
//!   read loop.
//! - **Shelley driver** ([`shelley`]): version-negotiation handshake and the
//!   chain-tip query.
//!
//! ## Example
//!
//! ```ignore
//! use ouroboros_client::Client;
//!
//! #[tokio::main]
//! async fn main() -> ouroboros_client::Result<()> {
//!     let mut client = Client::connect("/run/cardano/node.socket").await?;
//!     client.handshake().await?;
//!     let tip = client.query_tip().await?;
//!     println!("tip at slot {}", tip.slot);
//!     client.disconnect().await
//! }
//! ```

pub mod cbor;
pub mod error;
pub mod mux;
pub mod shelley;
pub mod transport;

pub use error::{Error, Result};
pub use shelley::{Client, Tip};
