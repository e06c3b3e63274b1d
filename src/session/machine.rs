//! The connection/authentication state machine.
//!
//! Consumes decoded inbound messages plus transport lifecycle events and
//! returns the actions they imply — wire messages to send and notices for
//! the UI collaborator. The machine never touches the transport itself; the
//! driver applies the actions, which keeps every transition synchronously
//! testable.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::CredentialHasher;
use crate::session::state::{ConnectionPhase, SessionState};
use crate::types::{Credentials, SessionNotice};
use crate::wire::{InboundMessage, OutboundMessage};

/// One consequence of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Send(OutboundMessage),
    Notify(SessionNotice),
}

/// Owns the [`SessionState`] and applies every transition to it.
pub struct SessionMachine {
    state: SessionState,
    hasher: Arc<dyn CredentialHasher>,
}

impl SessionMachine {
    pub fn new(credentials: Credentials, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self {
            state: SessionState::for_login(credentials.partner_id, credentials.partner_secret),
            hasher,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.state.phase
    }

    /// The transport reported ready and the settle delay elapsed. Generates
    /// a fresh session identifier and issues the textual connection request.
    ///
    /// If the transport closed while the timer was pending this observes the
    /// disconnected state and becomes a no-op — the scheduled transition
    /// must never outlive the connection that armed it.
    pub fn on_ready(&mut self) -> Vec<Action> {
        if self.state.phase != ConnectionPhase::SocketOpen {
            debug!(phase = ?self.state.phase, "settle timer fired out of phase, ignoring");
            return Vec::new();
        }

        let (Some(partner_id), Some(_)) = (&self.state.partner_id, &self.state.partner_secret)
        else {
            warn!("no credentials configured, session request suppressed");
            return Vec::new();
        };

        let session_id = uuid::Uuid::new_v4().to_string();
        debug!(%session_id, "issuing session request");
        let request = OutboundMessage::ConnectRequest { partner_id: partner_id.clone() };
        self.state.session_id = Some(session_id);
        self.state.phase = ConnectionPhase::SessionRequested;
        vec![Action::Send(request)]
    }

    /// Apply one decoded inbound message.
    ///
    /// Image traffic is not the machine's business and yields no actions;
    /// the driver routes it to the tile assembler.
    pub fn on_message(&mut self, message: &InboundMessage) -> Vec<Action> {
        match message {
            InboundMessage::ConnectionAck { text } => self.on_connection_ack(text),
            InboundMessage::Nonce { nonce } => self.on_nonce(nonce),
            InboundMessage::AuthOutcome { code } => self.on_auth_outcome(*code),
            InboundMessage::DesktopEntry { id, name } => {
                // Only meaningful while a login screen could show it.
                if self.state.phase.is_authenticated() {
                    Vec::new()
                } else {
                    vec![Action::Notify(SessionNotice::DesktopDiscovered {
                        id: *id,
                        name: name.clone(),
                    })]
                }
            }
            InboundMessage::DisplayTitle { title } => {
                vec![Action::Notify(SessionNotice::DisplayTitle { title: title.clone() })]
            }
            InboundMessage::CanvasGeometry(_)
            | InboundMessage::Tile(_)
            | InboundMessage::FullScreen { .. }
            | InboundMessage::Unknown { .. } => Vec::new(),
        }
    }

    /// The transport closed. Clears every session field and reports whether
    /// the loss happened before or after authentication. Idempotent.
    pub fn on_closed(&mut self) -> Vec<Action> {
        if self.state.phase == ConnectionPhase::Disconnected {
            return Vec::new();
        }
        let authenticated = self.state.phase.is_authenticated();
        info!(authenticated, "transport closed, clearing session");
        self.state.clear();
        vec![Action::Notify(SessionNotice::ConnectionLost { authenticated })]
    }

    fn on_connection_ack(&mut self, text: &str) -> Vec<Action> {
        if self.state.phase != ConnectionPhase::SessionRequested {
            debug!(phase = ?self.state.phase, "unexpected connection ack, ignoring");
            return Vec::new();
        }

        let acknowledged = self
            .state
            .partner_id
            .as_deref()
            .is_some_and(|partner| text.contains(partner));
        if !acknowledged {
            // The proxy answers a failed match with a payload that names
            // nobody; indistinguishable from bad credentials by design.
            info!("connection ack does not name our partner, rejecting");
            self.state.phase = ConnectionPhase::AuthRejected;
            return vec![Action::Notify(SessionNotice::WrongCredentials)];
        }

        let Some(session_id) = self.state.session_id.clone() else {
            warn!("connection ack before a session identifier exists, ignoring");
            return Vec::new();
        };
        debug!("connection acknowledged, sending session identifier");
        self.state.phase = ConnectionPhase::NonceReceived;
        vec![Action::Send(OutboundMessage::connect_uuid(&session_id))]
    }

    fn on_nonce(&mut self, nonce: &[u8]) -> Vec<Action> {
        if self.state.phase != ConnectionPhase::NonceReceived {
            debug!(phase = ?self.state.phase, "unexpected nonce, ignoring");
            return Vec::new();
        }
        let (Some(partner_id), Some(secret)) =
            (self.state.partner_id.clone(), self.state.partner_secret.clone())
        else {
            warn!("nonce arrived without credentials, ignoring");
            return Vec::new();
        };

        use base64::Engine as _;
        self.state.nonce =
            Some(base64::engine::general_purpose::STANDARD.encode(nonce));

        let digest = self.hasher.respond(&partner_id, &secret, nonce);
        debug!(digest_len = digest.len(), "nonce received, sending auth request");
        self.state.phase = ConnectionPhase::AuthRequested;
        vec![Action::Send(OutboundMessage::auth_request(digest))]
    }

    fn on_auth_outcome(&mut self, code: u32) -> Vec<Action> {
        if self.state.phase != ConnectionPhase::AuthRequested {
            debug!(phase = ?self.state.phase, "unexpected auth outcome, ignoring");
            return Vec::new();
        }
        if code == 1 {
            info!("authenticated, requesting image stream");
            self.state.phase = ConnectionPhase::Authenticated;
            vec![
                Action::Notify(SessionNotice::Authenticated),
                Action::Send(OutboundMessage::get_image()),
            ]
        } else {
            info!("authentication rejected");
            self.state.phase = ConnectionPhase::AuthRejected;
            vec![Action::Notify(SessionNotice::WrongCredentials)]
        }
    }
}
