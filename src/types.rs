//! Core types flowing through the protocol engine.
//!
//! The engine has three public data surfaces, all defined here:
//!
//! - [`DisplayEvent`] — decoded image traffic for the rendering collaborator
//!   (geometry resets, tile overwrites, whole-canvas replacements),
//! - [`SessionNotice`] — lifecycle signals for the login/UI collaborator
//!   (authentication outcome, connection loss, discoverable desktops),
//! - [`InputEvent`] — local input destined for the remote host.
//!
//! Image payloads are opaque encoded-image byte sequences ([`bytes::Bytes`],
//! shared without copying); this crate never inspects pixel data.

use bytes::Bytes;

pub use crate::session::state::ConnectionPhase;

/// Login input for a connection attempt.
///
/// `partner_id` names the remote desktop; `partner_secret` is the shared
/// password. Both are consumed by the handshake and cleared from session
/// state on disconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub partner_id: String,
    pub partner_secret: String,
}

impl Credentials {
    pub fn new(partner_id: impl Into<String>, partner_secret: impl Into<String>) -> Self {
        Self { partner_id: partner_id.into(), partner_secret: partner_secret.into() }
    }
}

/// Logical remote screen geometry and the fixed tiling unit.
///
/// Set by an image-parameter frame; replaced wholesale if the remote screen
/// geometry changes mid-session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasParameters {
    pub width: u32,
    pub height: u32,
    pub tile_edge: u32,
}

/// One incremental update to a fixed screen region.
///
/// Tiles are idempotent overwrites; ordering and overwrite semantics are
/// delegated to the renderer, which owns the pixel cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileUpdate {
    pub origin_x: u32,
    pub origin_y: u32,
    /// Monotonic tile sequence index assigned by the host; echo it back via
    /// [`Connection::acknowledge_tile`](crate::connection::Connection::acknowledge_tile)
    /// to let the host pace its stream.
    pub sequence: u32,
    /// Opaque encoded image bytes for this tile.
    pub image: Bytes,
}

/// Decoded image traffic, forwarded to the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    /// The remote screen geometry changed; the renderer should rebuild its
    /// canvas before applying further tiles.
    Geometry(CanvasParameters),
    /// Overwrite one tile region.
    Tile(TileUpdate),
    /// Replace the whole canvas with a single encoded image.
    FullScreen { image: Bytes },
}

/// Session lifecycle signals for the login/UI collaborator.
///
/// Every notice is optional to observe; dropping the receiver never stalls
/// the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// The handshake completed and image streaming has been requested.
    Authenticated,
    /// The host rejected the connection or the credentials. The reason is
    /// deliberately not disclosed (connect failure and bad password look
    /// identical on the wire).
    WrongCredentials,
    /// The transport closed. `authenticated` distinguishes "unable to
    /// connect" from "connection lost" for user messaging.
    ConnectionLost { authenticated: bool },
    /// A discoverable desktop advertised itself while unauthenticated.
    DesktopDiscovered { id: [u8; 16], name: String },
    /// The remote display published its title.
    DisplayTitle { title: String },
}

/// Local input destined for the remote host.
///
/// Parameters are transmitted verbatim in the fixed 12-byte input layout;
/// the builder performs no range validation, so callers supply
/// already-clamped coordinates and codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Absolute cursor position on the remote canvas.
    CursorPosition { x: u16, y: u16 },
    /// Relative cursor movement.
    CursorDelta { dx: u16, dy: u16 },
    /// Mouse button transition; `button` is the host's button code.
    MouseButton { button: u16, pressed: bool },
    /// Mouse wheel rotation.
    MouseWheel { delta: u16, horizontal: bool },
    /// Keyboard key transition; `code` is the host's key code.
    KeyState { code: u16, pressed: bool },
}

impl InputEvent {
    /// The `(param1, param2)` pair carried by the wire layout.
    pub(crate) fn params(self) -> (u16, u16) {
        match self {
            InputEvent::CursorPosition { x, y } => (x, y),
            InputEvent::CursorDelta { dx, dy } => (dx, dy),
            InputEvent::MouseButton { button, pressed } => (button, pressed as u16),
            InputEvent::MouseWheel { delta, horizontal } => (delta, horizontal as u16),
            InputEvent::KeyState { code, pressed } => (code, pressed as u16),
        }
    }
}
