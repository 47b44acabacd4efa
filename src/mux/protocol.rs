//! Mini-protocol identifiers.
//!
//! A mini-protocol is a numbered logical channel multiplexed over the single
//! byte stream. The node-to-client set is closed; ids outside it decode to
//! the [`MiniProtocol::Unknown`] sentinel rather than failing.

use std::fmt;

/// Identifies the mini-protocol a segment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MiniProtocol {
    /// 0, handshake / mux control.
    MuxControl,
    /// 1, delta-Q, available node-to-node and node-to-client.
    DeltaQ,
    /// 2, chain sync over headers (node-to-node only).
    ChainSyncHeaders,
    /// 3, block fetch (node-to-node only).
    BlockFetch,
    /// 4, transaction submission.
    TxSubmission,
    /// 5, chain sync over full blocks (node-to-client).
    ChainSyncBlocks,
    /// 6, local transaction submission.
    LocalTxSubmission,
    /// 7, local state query.
    LocalStateQuery,
    /// 8, keep-alive.
    KeepAlive,
    /// Any id outside the known set, preserved verbatim.
    Unknown(u16),
}

impl MiniProtocol {
    /// Map a raw 15-bit id to a mini-protocol.
    pub fn from_id(id: u16) -> MiniProtocol {
        match id {
            0 => MiniProtocol::MuxControl,
            1 => MiniProtocol::DeltaQ,
            2 => MiniProtocol::ChainSyncHeaders,
            3 => MiniProtocol::BlockFetch,
            4 => MiniProtocol::TxSubmission,
            5 => MiniProtocol::ChainSyncBlocks,
            6 => MiniProtocol::LocalTxSubmission,
            7 => MiniProtocol::LocalStateQuery,
            8 => MiniProtocol::KeepAlive,
            other => MiniProtocol::Unknown(other),
        }
    }

    /// Raw id of this mini-protocol.
    pub fn id(&self) -> u16 {
        match self {
            MiniProtocol::MuxControl => 0,
            MiniProtocol::DeltaQ => 1,
            MiniProtocol::ChainSyncHeaders => 2,
            MiniProtocol::BlockFetch => 3,
            MiniProtocol::TxSubmission => 4,
            MiniProtocol::ChainSyncBlocks => 5,
            MiniProtocol::LocalTxSubmission => 6,
            MiniProtocol::LocalStateQuery => 7,
            MiniProtocol::KeepAlive => 8,
            MiniProtocol::Unknown(id) => *id,
        }
    }
}

impl fmt::Display for MiniProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiniProtocol::MuxControl => f.write_str("muxControl"),
            MiniProtocol::DeltaQ => f.write_str("deltaQ"),
            MiniProtocol::ChainSyncHeaders => f.write_str("chainSyncHeaders"),
            MiniProtocol::BlockFetch => f.write_str("blockFetch"),
            MiniProtocol::TxSubmission => f.write_str("txSubmission"),
            MiniProtocol::ChainSyncBlocks => f.write_str("chainSyncBlocks"),
            MiniProtocol::LocalTxSubmission => f.write_str("localTxSubmission"),
            MiniProtocol::LocalStateQuery => f.write_str("localStateQuery"),
            MiniProtocol::KeepAlive => f.write_str("keepAlive"),
            MiniProtocol::Unknown(id) => write!(f, "unknown({id})"),
        }
    }
}
