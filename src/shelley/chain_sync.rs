//! Chain-sync mini-protocol messages and the tip query reply shape.
//!
//! ```text
//! chainSyncMessage
//!     = msgRequestNext        ; [0]
//!     / msgAwaitReply         ; [1]
//!     / msgRollForward        ; [2, wrappedHeader, tip]
//!     / msgRollBackward       ; [3, point, tip]
//!     / msgFindIntersect      ; [4, points]
//!     / msgIntersectFound     ; [5, point, tip]
//!     / msgIntersectNotFound  ; [6, tip]
//!     / chainSyncMsgDone      ; [7]
//!
//! tip    = [point, blockNumber]
//! point  = [slotNumber, blockHeaderHash]
//! points = [ *point ]
//! ```
//!
//! A fresh client that sends `msgRequestNext` is rolled back to the node's
//! tip, so the tip query reads the tip out of the `msgRollBackward` reply.

use std::fmt;

use crate::cbor::DataItem;
use crate::error::{Error, Result};
use crate::mux::{Mode, ServiceDataUnit};
use crate::shelley::handshake::{element, single_array};

/// Chain-sync message types, by wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainSyncMessage {
    /// Ask for the next chain update.
    RequestNext = 0,
    /// The node has nothing yet; a reply will follow.
    AwaitReply = 1,
    /// A new header, plus the current tip.
    RollForward = 2,
    /// Rewind to a point, plus the current tip.
    RollBackward = 3,
    /// Ask the node to find an intersection with the given points.
    FindIntersect = 4,
    /// An intersection point was found.
    IntersectFound = 5,
    /// No intersection point exists.
    IntersectNotFound = 6,
    /// Terminate the exchange.
    Done = 7,
}

/// Build `msgRequestNext`.
pub fn request_next() -> DataItem {
    DataItem::array(vec![DataItem::positive(ChainSyncMessage::RequestNext as u64)])
}

/// Build `chainSyncMsgDone`.
pub fn done() -> DataItem {
    DataItem::array(vec![DataItem::positive(ChainSyncMessage::Done as u64)])
}

/// Build `msgFindIntersect` for a list of `(slot, hash)` points.
pub fn find_intersect(points: &[(u32, Vec<u8>)]) -> DataItem {
    let points = points
        .iter()
        .map(|(slot, hash)| {
            DataItem::array(vec![
                DataItem::positive(u64::from(*slot)),
                DataItem::byte_string(hash.clone()),
            ])
        })
        .collect();
    DataItem::array(vec![
        DataItem::positive(ChainSyncMessage::FindIntersect as u64),
        DataItem::array(points),
    ])
}

/// The most recent block header the node has adopted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tip {
    /// Slot number of the tip.
    pub slot: u32,
    /// Block header hash.
    pub hash: [u8; 32],
    /// Block number of the tip.
    pub block_number: u32,
}

impl fmt::Display for Tip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slot {} hash {} block {}",
            self.slot,
            hex::encode(self.hash),
            self.block_number
        )
    }
}

/// Parse the `msgRollBackward` reply to a fresh `msgRequestNext`:
/// `[3, point, [[slot, hash], blockNumber]]`.
///
/// # Errors
///
/// `InvalidContainerMode` unless the reply arrived in responder mode,
/// `UnexpectedCborItem` for any shape mismatch.
pub fn parse_tip(sdu: &ServiceDataUnit) -> Result<Tip> {
    if sdu.mode() != Mode::Responder {
        return Err(Error::InvalidContainerMode);
    }

    let message = single_array(sdu)?;
    let message_type = element(message, 0)?.as_u64()?;
    if message_type != ChainSyncMessage::RollBackward as u64 {
        return Err(Error::UnexpectedCborItem {
            reason: format!("expected rollBackward (3), got message type {message_type}"),
        });
    }

    let tip = element(message, 2)?.as_array()?;
    let point = element(tip, 0)?.as_array()?;

    let slot = element(point, 0)?.as_u32()?;
    let hash_bytes = element(point, 1)?.as_bytes()?;
    let hash: [u8; 32] = hash_bytes
        .try_into()
        .map_err(|_| Error::UnexpectedCborItem {
            reason: format!("tip hash must be 32 bytes, got {}", hash_bytes.len()),
        })?;
    let block_number = element(tip, 1)?.as_u32()?;

    Ok(Tip {
        slot,
        hash,
        block_number,
    })
}
