//! Type-safe async client engine for the Periscope remote-desktop protocol.
//!
//! Periscope is the client-side endpoint of a tiled-image streaming
//! protocol: it maintains a message-oriented connection to a remote host,
//! performs a challenge–response authentication handshake, and reassembles
//! an incremental tile stream plus control events.
//!
//! # Features
//!
//! - **Fragmentation-tolerant framing**: the transport may deliver partial
//!   or concatenated frames; reassembly is chunk-boundary invariant
//! - **Explicit session state machine**: every transition is a pure,
//!   testable function from state plus message to actions
//! - **Pluggable authentication**: the legacy wire digest is one strategy
//!   behind a trait
//! - **Transport agnostic**: bring any in-order byte channel
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use periscope::{Credentials, DisplayEvent, Periscope};
//!
//! # async fn example(transport: impl periscope::Transport) -> periscope::Result<()> {
//! let mut connection =
//!     Periscope::connect(transport, Credentials::new("2142717624", "secret")).await?;
//!
//! while let Some(event) = connection.next_display_event().await {
//!     match event {
//!         DisplayEvent::Geometry(params) => println!("canvas {}x{}", params.width, params.height),
//!         DisplayEvent::Tile(tile) => println!("tile at ({}, {})", tile.origin_x, tile.origin_y),
//!         DisplayEvent::FullScreen { image } => println!("full frame, {} bytes", image.len()),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// Core types and error handling
pub mod auth;
mod error;
pub mod types;

// Protocol engine
pub mod canvas;
pub mod session;
pub mod wire;

// Stream-based session architecture
pub mod config;
pub mod connection;
pub mod driver;
pub mod stream;
pub mod transport;

// Core exports
pub use auth::{CredentialHasher, LegacyMd5Hasher};
pub use config::ViewerConfig;
pub use error::{Result, ViewerError};
pub use types::*;

// Protocol exports
pub use canvas::TileAssembler;
pub use session::{ConnectionPhase as Phase, SessionMachine};
pub use wire::{Frame, InboundMessage, OutboundMessage, StreamDecoder, SyncMode};

// Main API exports
pub use connection::Connection;
pub use transport::{Transport, TransportEvent};

use std::sync::Arc;

/// Unified entry point for viewer sessions.
///
/// # Examples
///
/// ```rust,no_run
/// use periscope::{Credentials, Periscope};
///
/// # async fn example(transport: impl periscope::Transport) -> periscope::Result<()> {
/// let connection = Periscope::connect(transport, Credentials::new("partner", "secret")).await?;
/// // Use connection...
/// # Ok(())
/// # }
/// ```
pub struct Periscope;

impl Periscope {
    /// Start a session over an already-connected transport with the default
    /// configuration.
    ///
    /// Returns as soon as the session driver is running; the handshake
    /// completes in the background. Observe
    /// [`Connection::phase_changes`] or [`Connection::next_notice`] for the
    /// outcome.
    pub async fn connect<T>(transport: T, credentials: Credentials) -> Result<Connection>
    where
        T: Transport,
    {
        Connection::connect(transport, credentials).await
    }

    /// Start a session with explicit configuration.
    pub async fn connect_with_config<T>(
        transport: T,
        credentials: Credentials,
        config: ViewerConfig,
    ) -> Result<Connection>
    where
        T: Transport,
    {
        Connection::connect_with(transport, credentials, config, Arc::new(LegacyMd5Hasher)).await
    }
}
