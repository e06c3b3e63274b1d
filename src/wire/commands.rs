//! Inbound command decoding.
//!
//! Maps the closed set of 4-byte tags to typed message variants, reading
//! fixed-width little-endian integers and raw byte ranges from the payload.
//! Unknown tags are not an error: they decode to
//! [`InboundMessage::Unknown`] so the session can log and continue.

use bytes::Bytes;
use tracing::debug;

use crate::error::{Result, ViewerError};
use crate::types::{CanvasParameters, TileUpdate};
use crate::wire::decoder::Frame;
use crate::wire::tags::{self, CommandTag};

/// Byte length of the identifier prefix in a discoverable-desktop entry.
const DESKTOP_ID_SIZE: usize = 16;

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Connection acknowledged; the payload text names the partner the
    /// proxy matched (or a failure marker that names nobody).
    ConnectionAck { text: String },
    /// Nonce challenge for the credential digest.
    Nonce { nonce: Bytes },
    /// Authentication outcome; `1` is the only success value.
    AuthOutcome { code: u32 },
    /// Remote canvas geometry.
    CanvasGeometry(CanvasParameters),
    /// One tile overwrite.
    Tile(TileUpdate),
    /// Whole-canvas replacement.
    FullScreen { image: Bytes },
    /// A discoverable desktop advertising itself.
    DesktopEntry { id: [u8; DESKTOP_ID_SIZE], name: String },
    /// The remote display's title.
    DisplayTitle { title: String },
    /// Tag outside the known set; carried for diagnostics.
    Unknown { tag: CommandTag, payload: Bytes },
}

impl InboundMessage {
    /// Decode one frame.
    ///
    /// A truncated payload for a known tag is a protocol error — the
    /// original peer's lenient readers would fabricate zero values here,
    /// which hides corruption; the session logs the error and skips the
    /// frame instead.
    pub fn decode(frame: Frame) -> Result<Self> {
        let Frame { tag, payload } = frame;
        let message = match tag {
            tags::CONNECT_ACK => {
                InboundMessage::ConnectionAck { text: lossy_text(&payload) }
            }
            tags::SET_NONCE => InboundMessage::Nonce { nonce: payload },
            tags::AUTH_RESPONSE => {
                InboundMessage::AuthOutcome { code: read_u32_le(&payload, 0, "SARP")? }
            }
            tags::IMAGE_PARAM => InboundMessage::CanvasGeometry(CanvasParameters {
                width: read_u32_le(&payload, 0, "IMGP")?,
                height: read_u32_le(&payload, 4, "IMGP")?,
                tile_edge: read_u32_le(&payload, 8, "IMGP")?,
            }),
            tags::IMAGE_TILE => {
                let origin_x = read_u32_le(&payload, 0, "IMGT")?;
                let origin_y = read_u32_le(&payload, 4, "IMGT")?;
                let sequence = read_u32_le(&payload, 8, "IMGT")?;
                InboundMessage::Tile(TileUpdate {
                    origin_x,
                    origin_y,
                    sequence,
                    image: payload.slice(12..),
                })
            }
            tags::IMAGE_SCREEN => InboundMessage::FullScreen { image: payload },
            tags::DESKTOP_ENTRY => {
                if payload.len() < DESKTOP_ID_SIZE {
                    return Err(ViewerError::protocol(
                        "CARP decode",
                        format!(
                            "entry needs at least {DESKTOP_ID_SIZE} id bytes, have {}",
                            payload.len()
                        ),
                    ));
                }
                let id: [u8; DESKTOP_ID_SIZE] =
                    payload[..DESKTOP_ID_SIZE].try_into().expect("length checked");
                InboundMessage::DesktopEntry { id, name: lossy_text(&payload[DESKTOP_ID_SIZE..]) }
            }
            tags::SET_NAME => InboundMessage::DisplayTitle { title: lossy_text(&payload) },
            other => {
                debug!(tag = %tags::display(&other), len = payload.len(), "unknown command tag");
                InboundMessage::Unknown { tag: other, payload }
            }
        };
        Ok(message)
    }
}

/// Read a little-endian u32 at `offset`, failing with payload context.
fn read_u32_le(data: &[u8], offset: usize, context: &str) -> Result<u32> {
    let end = offset + 4;
    if end > data.len() {
        return Err(ViewerError::protocol(
            format!("{context} decode"),
            format!("need 4 bytes at offset {offset}, payload is {} bytes", data.len()),
        ));
    }
    Ok(u32::from_le_bytes(data[offset..end].try_into().expect("length checked")))
}

fn lossy_text(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}
