//! Explicit session state.
//!
//! All mutable session fields live in one value owned by the state machine —
//! no hidden shared globals. The driver reads the phase through the machine;
//! nothing else touches this struct.

/// Connection/authentication phase.
///
/// `Authenticated` is the only phase from which streaming-image requests are
/// sent. A transport close returns to `Disconnected` from any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    #[default]
    Disconnected,
    /// A transport handle exists but is not yet assumed usable.
    SocketOpen,
    /// The connection request has been issued; awaiting the ack.
    SessionRequested,
    /// Ack received and answered with the session identifier; awaiting the
    /// nonce challenge.
    NonceReceived,
    /// Credential digest sent; awaiting the outcome.
    AuthRequested,
    Authenticated,
    /// Terminal for this attempt: the host rejected the connection or the
    /// credentials. The transport may remain open.
    AuthRejected,
}

impl ConnectionPhase {
    pub fn is_authenticated(self) -> bool {
        matches!(self, ConnectionPhase::Authenticated)
    }
}

/// The per-attempt session fields.
///
/// Created at login start; the partner fields, nonce, and session identifier
/// are cleared on disconnect. Exactly one instance exists per active login
/// attempt.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub phase: ConnectionPhase,
    /// Client-generated opaque session identifier (UUID text).
    pub session_id: Option<String>,
    /// The host's nonce challenge, kept in its transmitted base64 text form.
    pub nonce: Option<String>,
    pub partner_id: Option<String>,
    pub partner_secret: Option<String>,
}

impl SessionState {
    /// A login attempt begins with a transport handle in hand; the handle is
    /// not yet assumed usable, so the phase starts at `SocketOpen`.
    pub fn for_login(partner_id: String, partner_secret: String) -> Self {
        Self {
            phase: ConnectionPhase::SocketOpen,
            session_id: None,
            nonce: None,
            partner_id: Some(partner_id),
            partner_secret: Some(partner_secret),
        }
    }

    /// Reset to the disconnected state, clearing every per-attempt field.
    pub fn clear(&mut self) {
        *self = SessionState::default();
    }
}
