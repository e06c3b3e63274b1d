//! Outbound message construction.
//!
//! The protocol has three outbound wire shapes, plus a fixed-size input
//! layout. They are modelled as one tagged union rather than unified into a
//! single framing, because the remote peer expects each exact layout:
//!
//! - **Bare**: the 4-byte tag alone, used for zero-argument requests.
//! - **Framed**: `tag + u32-LE length + payload`. Note: *no* sync prefix —
//!   outbound traffic to the host is unsynced, only inbound frames carry
//!   the marker.
//! - **Connect request**: a pipe-delimited ASCII string, the sole textual
//!   message, sent once to open a session through the proxy.
//! - **Input**: fixed 12 bytes — `tag + u16 size (always 4, zero-padded to
//!   4 bytes) + u16 param1 + u16 param2` — shared by every input command.

use bytes::{BufMut, Bytes, BytesMut};

use crate::types::InputEvent;
use crate::wire::tags::{self, CommandTag};

/// Size of an input-event message on the wire.
const INPUT_MESSAGE_SIZE: usize = 12;
/// The input layout's parameter block is always 4 bytes.
const INPUT_PARAM_SIZE: u16 = 4;

/// An outbound wire message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Zero-argument request: exactly the 4 tag bytes.
    Bare { tag: CommandTag },
    /// Length-prefixed payload message.
    Framed { tag: CommandTag, payload: Bytes },
    /// The textual session-open request: `1111CONN|<partner>|1|`.
    ConnectRequest { partner_id: String },
    /// Fixed-layout input event.
    Input { tag: CommandTag, param1: u16, param2: u16 },
}

impl OutboundMessage {
    /// Bare image request, sent once authentication completes.
    pub fn get_image() -> Self {
        OutboundMessage::Bare { tag: tags::GET_IMAGE }
    }

    /// Bare full-refresh request.
    pub fn refresh_display() -> Self {
        OutboundMessage::Bare { tag: tags::REFRESH_DISPLAY }
    }

    /// Session-identifier handshake response (CTUU).
    pub fn connect_uuid(session_id: &str) -> Self {
        OutboundMessage::Framed {
            tag: tags::CONNECT_UUID,
            payload: Bytes::copy_from_slice(session_id.as_bytes()),
        }
    }

    /// Credential-digest handshake response (SARQ).
    pub fn auth_request(digest: Vec<u8>) -> Self {
        OutboundMessage::Framed { tag: tags::AUTH_REQUEST, payload: digest.into() }
    }

    /// Tile-received acknowledgement; lets the host pace its tile stream.
    pub fn tile_received(sequence: u16) -> Self {
        OutboundMessage::Input { tag: tags::TILE_RECEIVED, param1: sequence, param2: 0 }
    }

    /// Ask the host to cycle to its next display. Parameters are ignored by
    /// the host but the layout is fixed.
    pub fn change_display() -> Self {
        OutboundMessage::Input { tag: tags::CHANGE_DISPLAY, param1: 0, param2: 0 }
    }

    pub fn input(event: InputEvent) -> Self {
        let tag = match event {
            InputEvent::CursorPosition { .. } => tags::SET_CURSOR_POS,
            InputEvent::CursorDelta { .. } => tags::SET_CURSOR_DELTA,
            InputEvent::MouseButton { .. } => tags::SET_MOUSE_KEY,
            InputEvent::MouseWheel { .. } => tags::SET_MOUSE_WHEEL,
            InputEvent::KeyState { .. } => tags::SET_KEY_STATE,
        };
        let (param1, param2) = event.params();
        OutboundMessage::Input { tag, param1, param2 }
    }

    /// Encode to the exact wire bytes.
    pub fn encode(&self) -> Bytes {
        match self {
            OutboundMessage::Bare { tag } => Bytes::copy_from_slice(tag),
            OutboundMessage::Framed { tag, payload } => {
                let mut buf = BytesMut::with_capacity(8 + payload.len());
                buf.put_slice(tag);
                buf.put_u32_le(payload.len() as u32);
                buf.put_slice(payload);
                buf.freeze()
            }
            OutboundMessage::ConnectRequest { partner_id } => {
                Bytes::from(format!("1111CONN|{partner_id}|1|"))
            }
            OutboundMessage::Input { tag, param1, param2 } => {
                let mut buf = BytesMut::with_capacity(INPUT_MESSAGE_SIZE);
                buf.put_slice(tag);
                buf.put_u16_le(INPUT_PARAM_SIZE);
                buf.put_u16_le(0);
                buf.put_u16_le(*param1);
                buf.put_u16_le(*param2);
                buf.freeze()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::decoder::{StreamDecoder, SyncMode};

    #[test]
    fn bare_messages_are_exactly_the_tag() {
        assert_eq!(OutboundMessage::get_image().encode().as_ref(), b"GIMG");
        assert_eq!(OutboundMessage::refresh_display().encode().as_ref(), b"REFH");
    }

    #[test]
    fn framed_messages_carry_length_but_no_sync_prefix() {
        let session_id = "7f0d63be-03bd-4894-9b48-069f2e93ae2d";
        let wire = OutboundMessage::connect_uuid(session_id).encode();

        assert_eq!(&wire[..4], b"CTUU");
        assert_eq!(u32::from_le_bytes(wire[4..8].try_into().unwrap()), 36);
        assert_eq!(&wire[8..], session_id.as_bytes());
        assert_ne!(&wire[..4], b"1111");
    }

    #[test]
    fn connect_request_is_pipe_delimited_text() {
        let wire = OutboundMessage::ConnectRequest { partner_id: "2142717624".into() }.encode();
        assert_eq!(wire.as_ref(), b"1111CONN|2142717624|1|");
    }

    #[test]
    fn input_layout_is_twelve_bytes() {
        let wire =
            OutboundMessage::input(InputEvent::CursorPosition { x: 0x1234, y: 0x5678 }).encode();
        assert_eq!(wire.len(), 12);
        assert_eq!(&wire[..4], b"SCUP");
        // size field: u16(4) zero-padded to 4 bytes
        assert_eq!(&wire[4..8], &[4, 0, 0, 0]);
        assert_eq!(&wire[8..10], &0x1234u16.to_le_bytes());
        assert_eq!(&wire[10..12], &0x5678u16.to_le_bytes());
    }

    #[test]
    fn every_input_event_maps_to_its_tag() {
        let cases = [
            (InputEvent::CursorPosition { x: 1, y: 2 }, b"SCUP"),
            (InputEvent::CursorDelta { dx: 1, dy: 2 }, b"SCUD"),
            (InputEvent::MouseButton { button: 1, pressed: true }, b"SMKS"),
            (InputEvent::MouseWheel { delta: 120, horizontal: false }, b"SMWH"),
            (InputEvent::KeyState { code: 13, pressed: false }, b"SKST"),
        ];
        for (event, tag) in cases {
            assert_eq!(&OutboundMessage::input(event).encode()[..4], tag);
        }
    }

    #[test]
    fn tile_ack_and_display_change_use_the_input_layout() {
        let ack = OutboundMessage::tile_received(3).encode();
        assert_eq!(ack.len(), 12);
        assert_eq!(&ack[..4], b"TLRD");
        assert_eq!(&ack[8..10], &3u16.to_le_bytes());

        let chdp = OutboundMessage::change_display().encode();
        assert_eq!(chdp.len(), 12);
        assert_eq!(&chdp[..4], b"CHDP");
    }

    #[test]
    fn framed_round_trip_through_the_decoder() {
        // The inbound decoder expects a sync marker; prepend one to confirm
        // encode and decode agree on tag, length, and payload.
        let digest = vec![0xAB; 16];
        let framed = OutboundMessage::auth_request(digest.clone()).encode();

        let mut wire = vec![0x31u8; 4];
        wire.extend_from_slice(&framed);

        let mut decoder = StreamDecoder::new(1024, SyncMode::Strict);
        let frame = decoder.feed(&wire).unwrap().expect("round trip");
        assert_eq!(&frame.tag, b"SARQ");
        assert_eq!(frame.payload.as_ref(), digest.as_slice());
    }
}
