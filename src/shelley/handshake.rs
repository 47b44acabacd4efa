//! Version-negotiation handshake (mini-protocol 0).
//!
//! ```text
//! handshakeMessage
//!     = msgProposeVersions  ; [0, versionTable]
//!     / msgAcceptVersion    ; [1, versionNumber, extraParams]
//!     / msgRefuse           ; [2, refuseReason]
//!
//! refuseReason
//!     = [0, [ *versionNumber ]]       ; version mismatch
//!     / [1, versionNumber, tstr]      ; handshake decode error
//!     / [2, versionNumber, tstr]      ; refused
//! ```
//!
//! The version table maps version numbers to parameters; its keys must be
//! unique and in ascending order, which the canonical map encoding
//! guarantees.

use std::fmt;

use crate::cbor::DataItem;
use crate::error::{Error, Result};
use crate::mux::ServiceDataUnit;

const MSG_PROPOSE_VERSIONS: u64 = 0;
const MSG_ACCEPT_VERSION: u64 = 1;
const MSG_REFUSE: u64 = 2;

const REFUSE_VERSION_MISMATCH: u64 = 0;
const REFUSE_DECODE_ERROR: u64 = 1;
const REFUSE_REFUSED: u64 = 2;

/// Network magic for the Cardano mainnet, sent as the parameter of every
/// proposed version.
pub const MAINNET_NETWORK_MAGIC: u64 = 764824073;

/// Protocol versions proposed to the node, in ascending order.
pub const PROPOSED_VERSIONS: [u64; 3] = [1, 2, 3];

/// Build `msgProposeVersions` for the standard version set.
pub fn propose_versions(network_magic: u64) -> DataItem {
    let table = PROPOSED_VERSIONS
        .iter()
        .map(|&version| (DataItem::positive(version), DataItem::positive(network_magic)))
        .collect();
    DataItem::array(vec![
        DataItem::positive(MSG_PROPOSE_VERSIONS),
        DataItem::map(table),
    ])
}

/// A successful negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted {
    /// The version number the node settled on.
    pub version: u64,
    /// Extra parameters echoed by the node (the network magic).
    pub extra_params: u64,
}

/// Why the node refused the proposal. Each reason is a distinct kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefuseReason {
    /// None of the proposed versions is supported; carries the node's
    /// version numbers.
    VersionMismatch(Vec<u64>),
    /// The node could not decode the proposal.
    DecodeError {
        /// Version the failure relates to.
        version: u64,
        /// Node-supplied detail.
        message: String,
    },
    /// The node understood and declined.
    Refused {
        /// Version the refusal relates to.
        version: u64,
        /// Node-supplied detail.
        message: String,
    },
}

impl fmt::Display for RefuseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefuseReason::VersionMismatch(versions) => {
                write!(f, "version mismatch, node supports {versions:?}")
            }
            RefuseReason::DecodeError { version, message } => {
                write!(f, "decode error for version {version}: {message}")
            }
            RefuseReason::Refused { version, message } => {
                write!(f, "refused for version {version}: {message}")
            }
        }
    }
}

/// Outcome of parsing the node's handshake reply.
#[derive(Debug, Clone, PartialEq)]
pub enum HandshakeResult {
    /// `msgAcceptVersion`.
    Accepted(Accepted),
    /// `msgRefuse` with its decoded reason.
    Refused(RefuseReason),
}

/// Parse the node's reply to `msgProposeVersions`.
///
/// # Errors
///
/// `InvalidContainerMode` if the reply did not arrive in responder mode,
/// `UnexpectedCborItem` if the reply shape does not match the protocol.
pub fn parse_response(sdu: &ServiceDataUnit) -> Result<HandshakeResult> {
    if sdu.mode() != crate::mux::Mode::Responder {
        return Err(Error::InvalidContainerMode);
    }

    let message = single_array(sdu)?;
    match element(message, 0)?.as_u64()? {
        MSG_ACCEPT_VERSION => Ok(HandshakeResult::Accepted(Accepted {
            version: element(message, 1)?.as_u64()?,
            extra_params: element(message, 2)?.as_u64()?,
        })),
        MSG_REFUSE => {
            let reason = element(message, 1)?.as_array()?;
            let kind = element(reason, 0)?.as_u64()?;
            let reason = match kind {
                REFUSE_VERSION_MISMATCH => {
                    let versions = element(reason, 1)?
                        .as_array()?
                        .iter()
                        .map(|item| item.as_u64())
                        .collect::<Result<Vec<u64>>>()?;
                    RefuseReason::VersionMismatch(versions)
                }
                REFUSE_DECODE_ERROR => RefuseReason::DecodeError {
                    version: element(reason, 1)?.as_u64()?,
                    message: element(reason, 2)?.as_text()?.to_string(),
                },
                REFUSE_REFUSED => RefuseReason::Refused {
                    version: element(reason, 1)?.as_u64()?,
                    message: element(reason, 2)?.as_text()?.to_string(),
                },
                other => {
                    return Err(Error::UnexpectedCborItem {
                        reason: format!("unknown refuse reason {other}"),
                    });
                }
            };
            Ok(HandshakeResult::Refused(reason))
        }
        other => Err(Error::UnexpectedCborItem {
            reason: format!("unknown handshake message type {other}"),
        }),
    }
}

/// The single top-level array every protocol reply consists of.
pub(crate) fn single_array(sdu: &ServiceDataUnit) -> Result<&[DataItem]> {
    match sdu.items() {
        [only] => only.as_array(),
        items => Err(Error::UnexpectedCborItem {
            reason: format!("expected one top-level array, got {} items", items.len()),
        }),
    }
}

/// Array element accessor with a shape error instead of a panic.
pub(crate) fn element(items: &[DataItem], index: usize) -> Result<&DataItem> {
    items.get(index).ok_or_else(|| Error::UnexpectedCborItem {
        reason: format!("missing element {index} in a {}-item array", items.len()),
    })
}
