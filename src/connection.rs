//! The public connection handle.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::Result;
use crate::ViewerError;
use crate::auth::{CredentialHasher, LegacyMd5Hasher};
use crate::config::ViewerConfig;
use crate::driver::{Driver, Intent};
use crate::session::machine::SessionMachine;
use crate::session::state::ConnectionPhase;
use crate::stream::ThrottleExt;
use crate::transport::Transport;
use crate::types::{Credentials, DisplayEvent, InputEvent, SessionNotice};

/// A live viewer session over an injected transport.
///
/// Dropping the connection cancels the driver task; the transport is dropped
/// with it.
pub struct Connection {
    intents: mpsc::UnboundedSender<Intent>,
    display: mpsc::UnboundedReceiver<DisplayEvent>,
    notices: mpsc::UnboundedReceiver<SessionNotice>,
    phase: watch::Receiver<ConnectionPhase>,
    cancel: CancellationToken,
}

impl Connection {
    /// Start a session over `transport` with the default configuration and
    /// the wire-compatible credential hasher.
    ///
    /// Returns as soon as the driver task is running. The handshake
    /// progresses in the background — the transport may not even be open
    /// yet — so observe [`phase_changes`](Self::phase_changes) or
    /// [`next_notice`](Self::next_notice) for the outcome rather than
    /// waiting here.
    pub async fn connect<T>(transport: T, credentials: Credentials) -> Result<Self>
    where
        T: Transport,
    {
        Self::connect_with(transport, credentials, ViewerConfig::default(), Arc::new(LegacyMd5Hasher))
            .await
    }

    /// Start a session with explicit configuration and hashing strategy.
    pub async fn connect_with<T>(
        transport: T,
        credentials: Credentials,
        config: ViewerConfig,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Result<Self>
    where
        T: Transport,
    {
        info!(partner = %credentials.partner_id, "starting viewer session");
        let machine = SessionMachine::new(credentials, hasher);
        let channels = Driver::spawn(transport, machine, config);

        Ok(Self {
            intents: channels.intents,
            display: channels.display,
            notices: channels.notices,
            phase: channels.phase,
            cancel: channels.cancel,
        })
    }

    /// The current connection phase.
    pub fn phase(&self) -> ConnectionPhase {
        *self.phase.borrow()
    }

    /// Subscribe to phase transitions.
    ///
    /// Yields the current phase immediately, then each change. Watch
    /// semantics apply: rapid intermediate phases may be skipped, the latest
    /// is always delivered.
    pub fn phase_changes(&self) -> impl Stream<Item = ConnectionPhase> + 'static {
        WatchStream::new(self.phase.clone())
    }

    /// Wait for the next decoded image event.
    ///
    /// Returns `None` once the session has ended and all buffered events
    /// were drained. Tiles arrive in wire order, unmodified; the renderer
    /// owns overwrite semantics.
    pub async fn next_display_event(&mut self) -> Option<DisplayEvent> {
        self.display.recv().await
    }

    /// Wait for the next session notice.
    pub async fn next_notice(&mut self) -> Option<SessionNotice> {
        self.notices.recv().await
    }

    /// Send one input event to the remote host.
    pub fn send_input(&self, event: InputEvent) -> Result<()> {
        self.intend(Intent::Input(event))
    }

    /// Ask the host for the current image (sent automatically after
    /// authentication; callers rarely need this directly).
    pub fn request_image(&self) -> Result<()> {
        self.intend(Intent::RequestImage)
    }

    /// Discard locally buffered stream bytes and ask the host to resend the
    /// whole display. Does not change the connection phase; calling it twice
    /// in a row is harmless.
    pub fn request_refresh(&self) -> Result<()> {
        self.intend(Intent::RequestRefresh)
    }

    /// Ask the host to cycle to its next display.
    pub fn next_display(&self) -> Result<()> {
        self.intend(Intent::NextDisplay)
    }

    /// Acknowledge a received tile so the host can pace its stream.
    pub fn acknowledge_tile(&self, sequence: u16) -> Result<()> {
        self.intend(Intent::AcknowledgeTile { sequence })
    }

    /// Forward a stream of absolute cursor positions, coalesced to at most
    /// `max_hz` sends per second (latest position wins within an interval).
    ///
    /// Runs until the position stream ends or the session closes.
    pub async fn stream_cursor_positions<S>(&self, positions: S, max_hz: u32) -> Result<()>
    where
        S: Stream<Item = (u16, u16)>,
    {
        let interval = Duration::from_secs_f64(1.0 / f64::from(max_hz.max(1)));
        let mut throttled = std::pin::pin!(positions.throttle(interval));
        while let Some((x, y)) = throttled.next().await {
            self.send_input(InputEvent::CursorPosition { x, y })?;
        }
        Ok(())
    }

    /// End the session. Idempotent; equivalent to dropping the connection.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    fn intend(&self, intent: Intent) -> Result<()> {
        self.intents.send(intent).map_err(|_| ViewerError::Closed)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        debug!("dropping connection");
        self.cancel.cancel();
    }
}
