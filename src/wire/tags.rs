//! The closed set of 4-byte ASCII command tags.
//!
//! Tag direction is from the client's point of view. The host accepts the
//! inbound tags of its own (CTUU, SARQ, the input tags); everything else it
//! sends to us.

/// A 4-byte ASCII command tag.
pub type CommandTag = [u8; 4];

// Inbound (host -> client)
pub const CONNECT_ACK: CommandTag = *b"CONN";
pub const SET_NONCE: CommandTag = *b"STNC";
pub const AUTH_RESPONSE: CommandTag = *b"SARP";
pub const IMAGE_PARAM: CommandTag = *b"IMGP";
pub const IMAGE_TILE: CommandTag = *b"IMGT";
pub const IMAGE_SCREEN: CommandTag = *b"IMGS";
pub const DESKTOP_ENTRY: CommandTag = *b"CARP";
pub const SET_NAME: CommandTag = *b"STNM";

// Outbound (client -> host)
pub const CONNECT_UUID: CommandTag = *b"CTUU";
pub const AUTH_REQUEST: CommandTag = *b"SARQ";
pub const GET_IMAGE: CommandTag = *b"GIMG";
pub const REFRESH_DISPLAY: CommandTag = *b"REFH";
pub const CHANGE_DISPLAY: CommandTag = *b"CHDP";
pub const TILE_RECEIVED: CommandTag = *b"TLRD";

// Outbound input events (fixed 12-byte layout)
pub const SET_CURSOR_POS: CommandTag = *b"SCUP";
pub const SET_CURSOR_DELTA: CommandTag = *b"SCUD";
pub const SET_MOUSE_KEY: CommandTag = *b"SMKS";
pub const SET_MOUSE_WHEEL: CommandTag = *b"SMWH";
pub const SET_KEY_STATE: CommandTag = *b"SKST";

/// Render a tag for diagnostics; non-ASCII bytes are escaped.
pub fn display(tag: &CommandTag) -> String {
    tag.iter().flat_map(|b| (*b as char).escape_default()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_four_ascii_bytes() {
        for tag in [
            CONNECT_ACK,
            SET_NONCE,
            AUTH_RESPONSE,
            IMAGE_PARAM,
            IMAGE_TILE,
            IMAGE_SCREEN,
            DESKTOP_ENTRY,
            SET_NAME,
            CONNECT_UUID,
            AUTH_REQUEST,
            GET_IMAGE,
            REFRESH_DISPLAY,
            CHANGE_DISPLAY,
            TILE_RECEIVED,
            SET_CURSOR_POS,
            SET_CURSOR_DELTA,
            SET_MOUSE_KEY,
            SET_MOUSE_WHEEL,
            SET_KEY_STATE,
        ] {
            assert!(tag.iter().all(u8::is_ascii_uppercase), "{}", display(&tag));
        }
    }

    #[test]
    fn display_escapes_binary_tags() {
        assert_eq!(display(&CONNECT_ACK), "CONN");
        assert_eq!(display(&[0x00, 0x41, 0xFF, 0x42]), "\\u{0}A\\u{ff}B");
    }
}
