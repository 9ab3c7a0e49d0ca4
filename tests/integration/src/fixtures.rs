//! Test fixtures
//!
//! Submission bodies in the wire format the intake accepts.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};

pub const TEST_ROOM: &str = "!room:example.org";

/// Text-only submission
pub fn text_submission(channel: &str, message: &str, psk: &str) -> Value {
    json!({
        "Channel": channel,
        "Message": message,
        "PSK": psk,
    })
}

/// Submission carrying media and an optional message
pub fn media_submission(
    channel: &str,
    message: &str,
    content: &[u8],
    content_type: &str,
    caption: &str,
    psk: &str,
) -> Value {
    json!({
        "Channel": channel,
        "Message": message,
        "ContentBytes": STANDARD.encode(content),
        "ContentType": content_type,
        "Caption": caption,
        "PSK": psk,
    })
}

/// A tiny PNG header, enough to stand in for an image payload
pub fn png_bytes() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]
}
