//! Tile-based image reconstruction.
//!
//! The assembler tracks the logical canvas geometry and turns decoded image
//! frames into [`DisplayEvent`]s for the rendering collaborator. It holds no
//! tile cache: tiles are idempotent overwrites of fixed screen regions, and
//! the pixel state lives in the renderer.

use tracing::{debug, trace};

use crate::types::{CanvasParameters, DisplayEvent};
use crate::wire::InboundMessage;

/// Stateful forwarder for image traffic.
#[derive(Debug, Default)]
pub struct TileAssembler {
    geometry: Option<CanvasParameters>,
}

impl TileAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent canvas geometry, if any image-parameter frame has
    /// arrived.
    pub fn geometry(&self) -> Option<CanvasParameters> {
        self.geometry
    }

    /// Consume one decoded message if it is image traffic.
    ///
    /// Geometry frames replace the stored parameters (the remote screen may
    /// change mid-session); tiles and full-screen frames pass through
    /// unmodified, without reordering or deduplication. A full-screen frame
    /// does not require a prior geometry frame.
    pub fn on_message(&mut self, message: InboundMessage) -> Option<DisplayEvent> {
        match message {
            InboundMessage::CanvasGeometry(params) => {
                debug!(
                    width = params.width,
                    height = params.height,
                    tile_edge = params.tile_edge,
                    "canvas geometry replaced"
                );
                self.geometry = Some(params);
                Some(DisplayEvent::Geometry(params))
            }
            InboundMessage::Tile(tile) => {
                trace!(
                    x = tile.origin_x,
                    y = tile.origin_y,
                    sequence = tile.sequence,
                    len = tile.image.len(),
                    "tile update"
                );
                Some(DisplayEvent::Tile(tile))
            }
            InboundMessage::FullScreen { image } => {
                debug!(len = image.len(), "full-screen update");
                Some(DisplayEvent::FullScreen { image })
            }
            _ => None,
        }
    }
}
