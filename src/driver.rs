//! Driver spawns and manages the per-connection event loop.

use std::pin::Pin;

use tokio::sync::{mpsc, watch};
use tokio::time::Sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::ViewerError;
use crate::canvas::TileAssembler;
use crate::config::ViewerConfig;
use crate::session::machine::{Action, SessionMachine};
use crate::session::state::ConnectionPhase;
use crate::transport::{Transport, TransportEvent};
use crate::types::{DisplayEvent, InputEvent, SessionNotice};
use crate::wire::decoder::Frame;
use crate::wire::{InboundMessage, OutboundMessage, StreamDecoder, tags};

/// A local request relayed from the connection handle into the driver task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Input(InputEvent),
    RequestImage,
    /// Discard the decoder's buffered bytes and ask the host to resend the
    /// whole display.
    RequestRefresh,
    NextDisplay,
    AcknowledgeTile { sequence: u16 },
}

/// Result of spawning the driver task.
pub struct DriverChannels {
    /// Receiver for decoded image traffic.
    pub display: mpsc::UnboundedReceiver<DisplayEvent>,
    /// Receiver for session lifecycle notices.
    pub notices: mpsc::UnboundedReceiver<SessionNotice>,
    /// Watch over the connection phase.
    pub phase: watch::Receiver<ConnectionPhase>,
    /// Sender for local intents.
    pub intents: mpsc::UnboundedSender<Intent>,
    /// Cancellation token for graceful shutdown.
    pub cancel: CancellationToken,
}

/// Driver spawns and manages the session task.
///
/// One task owns every mutable piece — transport, decoder, state machine,
/// assembler — so inbound decode-and-dispatch and outbound sends are
/// serialized by construction. No locks.
pub struct Driver;

impl Driver {
    /// Spawn the session task for the given transport.
    pub fn spawn<T>(transport: T, machine: SessionMachine, config: ViewerConfig) -> DriverChannels
    where
        T: Transport,
    {
        let (display_tx, display_rx) = mpsc::unbounded_channel();
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let (phase_tx, phase_rx) = watch::channel(machine.phase());
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let decoder = StreamDecoder::new(config.max_payload_size, config.sync_mode);
        let task = SessionTask {
            transport,
            machine,
            config,
            decoder,
            assembler: TileAssembler::new(),
            display_tx,
            notice_tx,
            phase_tx,
            intents: intent_rx,
            cancel: cancel.clone(),
        };
        tokio::spawn(task.run());

        DriverChannels {
            display: display_rx,
            notices: notice_rx,
            phase: phase_rx,
            intents: intent_tx,
            cancel,
        }
    }
}

struct SessionTask<T> {
    transport: T,
    machine: SessionMachine,
    config: ViewerConfig,
    decoder: StreamDecoder,
    assembler: TileAssembler,
    display_tx: mpsc::UnboundedSender<DisplayEvent>,
    notice_tx: mpsc::UnboundedSender<SessionNotice>,
    phase_tx: watch::Sender<ConnectionPhase>,
    intents: mpsc::UnboundedReceiver<Intent>,
    cancel: CancellationToken,
}

impl<T: Transport> SessionTask<T> {
    async fn run(mut self) {
        info!("session driver started");

        // The settle timer between transport-open and the session request.
        // Armed on open, disarmed on close; the machine also re-checks its
        // phase when it fires, so a late timer can never revive a dead
        // session.
        let mut settle: Option<Pin<Box<Sleep>>> = None;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("driver cancelled");
                    break;
                }

                _ = async {
                    match settle.as_mut() {
                        Some(timer) => timer.await,
                        None => std::future::pending().await,
                    }
                } => {
                    settle = None;
                    let actions = self.machine.on_ready();
                    // Publish before applying: observers woken by an action
                    // must already see the new phase.
                    self.publish_phase();
                    if self.apply(actions).await.is_err() {
                        break;
                    }
                }

                intent = self.intents.recv() => {
                    match intent {
                        Some(intent) => {
                            if self.on_intent(intent).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            debug!("connection handle dropped, shutting down");
                            break;
                        }
                    }
                }

                event = self.transport.recv() => {
                    match event {
                        Ok(Some(TransportEvent::Opened)) => {
                            debug!("transport ready, arming settle window");
                            settle =
                                Some(Box::pin(tokio::time::sleep(self.config.connect_delay())));
                        }
                        Ok(Some(TransportEvent::Data(bytes))) => {
                            match self.decoder.feed(&bytes) {
                                Ok(Some(frame)) => {
                                    if self.dispatch(frame).await.is_err() {
                                        break;
                                    }
                                }
                                Ok(None) => {}
                                Err(e) => {
                                    error!(error = %e, "protocol violation, disconnecting");
                                    settle = None;
                                    self.close();
                                    break;
                                }
                            }
                        }
                        Ok(Some(TransportEvent::Closed)) | Ok(None) => {
                            settle = None;
                            self.close();
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "transport receive failed");
                            settle = None;
                            self.close();
                            break;
                        }
                    }
                }
            }
        }

        info!("session driver ended");
    }

    /// Route one complete frame to the assembler or the state machine.
    ///
    /// Undecodable and unknown frames are logged and skipped; neither breaks
    /// the session.
    async fn dispatch(&mut self, frame: Frame) -> Result<()> {
        let message = match InboundMessage::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "undecodable frame skipped");
                return Ok(());
            }
        };

        match message {
            InboundMessage::Unknown { tag, payload } => {
                warn!(tag = %tags::display(&tag), len = payload.len(), "unknown command ignored");
                Ok(())
            }
            InboundMessage::CanvasGeometry(_)
            | InboundMessage::Tile(_)
            | InboundMessage::FullScreen { .. } => {
                if let Some(event) = self.assembler.on_message(message)
                    && self.display_tx.send(event).is_err()
                {
                    debug!("display receiver dropped");
                }
                Ok(())
            }
            message => {
                let actions = self.machine.on_message(&message);
                self.publish_phase();
                self.apply(actions).await?;
                Ok(())
            }
        }
    }

    async fn on_intent(&mut self, intent: Intent) -> Result<()> {
        let message = match intent {
            Intent::Input(event) => OutboundMessage::input(event),
            Intent::RequestImage => OutboundMessage::get_image(),
            Intent::RequestRefresh => {
                // Buffered partial frames describe tiles the refresh will
                // resend; they must not survive it.
                self.decoder.reset();
                OutboundMessage::refresh_display()
            }
            Intent::NextDisplay => OutboundMessage::change_display(),
            Intent::AcknowledgeTile { sequence } => OutboundMessage::tile_received(sequence),
        };
        self.send(message).await
    }

    async fn apply(&mut self, actions: Vec<Action>) -> Result<()> {
        for action in actions {
            match action {
                Action::Send(message) => self.send(message).await?,
                Action::Notify(notice) => self.notify(notice),
            }
        }
        Ok(())
    }

    /// Send one message, treating a not-yet-open transport as a dropped
    /// message rather than a failure (the peer never queues for us either).
    /// Any other send error tears the session down.
    async fn send(&mut self, message: OutboundMessage) -> Result<()> {
        match self.transport.send(message.encode()).await {
            Ok(()) => Ok(()),
            Err(ViewerError::NotOpen) => {
                warn!("send on a transport that is not open, dropped");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "transport send failed, closing");
                self.close();
                Err(e)
            }
        }
    }

    fn notify(&self, notice: SessionNotice) {
        if self.notice_tx.send(notice).is_err() {
            debug!("notice receiver dropped");
        }
    }

    /// Run the machine's close transition and surface its notices. Safe to
    /// call more than once.
    fn close(&mut self) {
        let actions = self.machine.on_closed();
        self.publish_phase();
        for action in actions {
            match action {
                Action::Send(_) => {} // nothing is sent after close
                Action::Notify(notice) => self.notify(notice),
            }
        }
    }

    fn publish_phase(&self) {
        let phase = self.machine.phase();
        self.phase_tx.send_if_modified(|current| {
            if *current == phase {
                false
            } else {
                *current = phase;
                true
            }
        });
    }
}
