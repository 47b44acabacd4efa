//! Timed request/reply transport over a duplex byte stream.
//!
//! [`NodeSocket`] owns the stream exclusively; `round_trip` takes `&mut
//! self`, so at most one exchange is outstanding by construction. Deadlines
//! are absolute per operation: the write deadline covers the full write and
//! the read deadline is computed once and covers the entire segment read
//! loop, however many segments the reply spans.

use std::io;
use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::{timeout_at, Instant};

use crate::error::{Error, Result};
use crate::mux::{SduBuffer, SegmentHeader, ServiceDataUnit, HEADER_SIZE};

/// Default read deadline for one exchange.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default write deadline for one exchange.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(5000);

/// A connection to a node over a duplex byte stream.
///
/// The stream type is generic so tests can drive the transport over an
/// in-memory duplex pipe; production code connects over a Unix socket.
#[derive(Debug)]
pub struct NodeSocket<S = UnixStream> {
    stream: S,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl NodeSocket<UnixStream> {
    /// Connect to the stream socket at `path`.
    ///
    /// # Errors
    ///
    /// `SocketNotFound` if the path does not exist; underlying I/O errors
    /// are propagated.
    pub async fn connect(
        path: impl AsRef<Path>,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::SocketNotFound {
                path: path.to_path_buf(),
            });
        }
        let stream = UnixStream::connect(path).await?;
        tracing::debug!(path = %path.display(), "connected to node socket");
        Ok(Self::from_stream(stream, read_timeout, write_timeout))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> NodeSocket<S> {
    /// Wrap an already-connected stream.
    pub fn from_stream(stream: S, read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            stream,
            read_timeout,
            write_timeout,
        }
    }

    /// Write `payload` fully, then read segments until one SDU completes.
    ///
    /// The connection is poisoned after any I/O error; callers must
    /// reconnect.
    pub async fn round_trip(&mut self, payload: &[u8]) -> Result<ServiceDataUnit> {
        let write_deadline = Instant::now() + self.write_timeout;
        tracing::debug!(bytes = payload.len(), "writing request");
        timeout_at(write_deadline, self.stream.write_all(payload))
            .await
            .map_err(|_| Error::Timeout { operation: "write" })?
            .map_err(|source| Error::StreamWrite { source })?;
        timeout_at(write_deadline, self.stream.flush())
            .await
            .map_err(|_| Error::Timeout { operation: "write" })?
            .map_err(|source| Error::StreamWrite { source })?;

        let read_deadline = Instant::now() + self.read_timeout;
        let mut assembler = SduBuffer::new();
        let mut first_segment = true;

        loop {
            let mut header_buf = [0u8; HEADER_SIZE];
            let got_header = timeout_at(
                read_deadline,
                read_exact_or_eof(&mut self.stream, &mut header_buf),
            )
            .await
            .map_err(|_| Error::Timeout { operation: "read" })?
            .map_err(|source| Error::StreamRead { source })?;

            if !got_header {
                if first_segment {
                    return Err(Error::EndOfStream);
                }
                return Err(Error::StreamRead {
                    source: io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "stream ended mid-message",
                    ),
                });
            }
            first_segment = false;

            let header = SegmentHeader::decode(&header_buf)?;
            tracing::trace!(%header, "read segment header");

            // The stream may deliver short reads; read_exact loops until the
            // declared payload length is accumulated.
            let mut segment = vec![0u8; header.payload_length as usize];
            timeout_at(read_deadline, self.stream.read_exact(&mut segment))
                .await
                .map_err(|_| Error::Timeout { operation: "read" })?
                .map_err(|source| Error::StreamRead { source })?;

            let mut complete = assembler.push(&header_buf)?;
            complete.extend(assembler.push(&segment)?);
            if let Some(sdu) = complete.into_iter().next() {
                tracing::debug!(protocol = %sdu.protocol(), "completed inbound SDU");
                return Ok(sdu);
            }
        }
    }

    /// Shut the stream down.
    pub async fn close(mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

/// Read exactly `buf.len()` bytes. Returns `false` on a clean end-of-stream
/// before the first byte; mid-buffer end-of-stream is an error.
async fn read_exact_or_eof<S: AsyncRead + Unpin>(
    stream: &mut S,
    buf: &mut [u8],
) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(false);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream ended mid-segment",
            ));
        }
        filled += n;
    }
    Ok(true)
}
