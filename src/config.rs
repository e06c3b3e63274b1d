//! Connection configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::wire::SyncMode;

/// Tunable parameters for a viewer connection.
///
/// The defaults reproduce the deployed peer's behavior; embedders typically
/// deserialize this from their own settings file and only adjust
/// `connect_delay_ms` for tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Delay between the transport reporting open and the connection request
    /// being issued, in milliseconds. The deployed peer needs this settle
    /// window; shortening it risks racing the transport's readiness.
    pub connect_delay_ms: u64,

    /// Upper bound on a declared frame payload length. A frame declaring
    /// more is a protocol violation and tears the session down.
    pub max_payload_size: usize,

    /// Frame-boundary recognition mode. `Lenient` matches the deployed
    /// peer's heuristic; `Strict` requires a contiguous sync marker.
    pub sync_mode: SyncMode,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            connect_delay_ms: 1500,
            max_payload_size: crate::wire::DEFAULT_MAX_PAYLOAD,
            sync_mode: SyncMode::Lenient,
        }
    }
}

impl ViewerConfig {
    /// The settle window as a [`Duration`].
    pub fn connect_delay(&self) -> Duration {
        Duration::from_millis(self.connect_delay_ms)
    }
}
