//! Transport trait for byte-channel collaborators.

use bytes::Bytes;

use crate::Result;

/// One delivery from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The channel became usable for sending.
    Opened,
    /// A chunk of inbound bytes. May contain a partial frame, a whole frame,
    /// or several concatenated — no framing is assumed.
    Data(Bytes),
    /// The channel closed (either side).
    Closed,
}

/// An already-connected bidirectional byte channel.
///
/// The engine assumes in-order, reliable delivery with no built-in framing —
/// a WebSocket, a TCP stream, an in-process pipe. Implementations handle
/// their own timing internally; both methods are awaited from the single
/// driver task, so no concurrent calls ever occur.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    /// Wait for the next delivery.
    ///
    /// Returns:
    /// - `Ok(Some(event))` - the next lifecycle or data event
    /// - `Ok(None)` - the transport is finished (treated as a close)
    /// - `Err(e)` - transport failure (also treated as a close)
    async fn recv(&mut self) -> Result<Option<TransportEvent>>;

    /// Send one outbound message's bytes.
    ///
    /// Must fail with [`ViewerError::NotOpen`](crate::ViewerError::NotOpen)
    /// when the channel is not open, and must tolerate being called after
    /// close without re-entering the closing path.
    async fn send(&mut self, bytes: Bytes) -> Result<()>;
}
