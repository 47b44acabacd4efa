//! Client driver: version negotiation and the chain-tip query.
//!
//! The driver issues strictly synchronous request/reply exchanges; there is
//! no background reader task. One outstanding exchange per connection is
//! enforced by `&mut self`.

use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;

use crate::cbor::{dump_items, DataItem};
use crate::error::{Error, Result};
use crate::mux::{MiniProtocol, Mode, ServiceDataUnit};
use crate::shelley::chain_sync::{self, Tip};
use crate::shelley::handshake::{self, Accepted, HandshakeResult, MAINNET_NETWORK_MAGIC};
use crate::transport::{NodeSocket, DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT};

/// A connected node-to-client session.
#[derive(Debug)]
pub struct Client<S = UnixStream> {
    socket: NodeSocket<S>,
    network_magic: u64,
}

impl Client<UnixStream> {
    /// Connect to the node socket at `path` with default timeouts.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with_timeouts(path, DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT).await
    }

    /// Connect with explicit read/write timeouts.
    pub async fn connect_with_timeouts(
        path: impl AsRef<Path>,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Result<Self> {
        let socket = NodeSocket::connect(path, read_timeout, write_timeout).await?;
        Ok(Self::from_socket(socket))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Client<S> {
    /// Wrap an already-connected transport.
    pub fn from_socket(socket: NodeSocket<S>) -> Self {
        Self {
            socket,
            network_magic: MAINNET_NETWORK_MAGIC,
        }
    }

    /// Override the network magic proposed during the handshake.
    pub fn with_network_magic(mut self, network_magic: u64) -> Self {
        self.network_magic = network_magic;
        self
    }

    /// Negotiate a protocol version with the node.
    ///
    /// # Errors
    ///
    /// `HandshakeFailed` when the node refuses every proposed version.
    pub async fn handshake(&mut self) -> Result<Accepted> {
        let request = handshake::propose_versions(self.network_magic);
        let reply = self
            .query_node(MiniProtocol::MuxControl, vec![request])
            .await?;

        match handshake::parse_response(&reply)? {
            HandshakeResult::Accepted(accepted) => {
                tracing::debug!(
                    version = accepted.version,
                    extra_params = accepted.extra_params,
                    "handshake accepted"
                );
                Ok(accepted)
            }
            HandshakeResult::Refused(reason) => Err(Error::HandshakeFailed {
                reason: reason.to_string(),
            }),
        }
    }

    /// Query the node's chain tip.
    ///
    /// Sends `msgRequestNext` on the chain-sync-blocks channel, reads the
    /// tip out of the roll-backward reply, then closes the exchange with
    /// `chainSyncMsgDone` (whose reply, if any, is ignored).
    pub async fn query_tip(&mut self) -> Result<Tip> {
        let reply = self
            .query_node(MiniProtocol::ChainSyncBlocks, vec![chain_sync::request_next()])
            .await?;
        let tip = chain_sync::parse_tip(&reply)?;
        tracing::debug!(%tip, "tip received");

        if let Err(err) = self
            .query_node(MiniProtocol::ChainSyncBlocks, vec![chain_sync::done()])
            .await
        {
            tracing::debug!(error = %err, "ignoring reply to chainSyncMsgDone");
        }

        Ok(tip)
    }

    /// One initiator-mode request/reply exchange on `protocol`.
    async fn query_node(
        &mut self,
        protocol: MiniProtocol,
        items: Vec<DataItem>,
    ) -> Result<ServiceDataUnit> {
        let request = ServiceDataUnit::new(protocol, Mode::Initiator, items);
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!(%protocol, "request:\n{}", dump_items(request.items()));
        }

        let reply = self.socket.round_trip(&request.to_bytes()).await?;

        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!(protocol = %reply.protocol(), "reply:\n{}", dump_items(reply.items()));
        }
        Ok(reply)
    }

    /// Close the connection.
    pub async fn disconnect(self) -> Result<()> {
        self.socket.close().await
    }
}
