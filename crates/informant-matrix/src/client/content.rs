//! `m.room.message` content bodies

use informant_core::{MediaKind, MediaMessage};
use serde_json::{json, Value};

pub fn text(body: &str) -> Value {
    json!({
        "msgtype": "m.text",
        "body": body,
    })
}

pub fn media(media: &MediaMessage) -> Value {
    json!({
        "msgtype": msgtype(media.kind),
        "body": media.caption,
        "url": media.location.as_str(),
        "info": {
            "mimetype": media.content_type,
            "size": media.size,
        },
    })
}

fn msgtype(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => "m.image",
        MediaKind::Video => "m.video",
        MediaKind::Audio => "m.audio",
        MediaKind::File => "m.file",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use informant_core::ContentUri;

    #[test]
    fn test_text_content() {
        assert_eq!(text("hi"), json!({ "msgtype": "m.text", "body": "hi" }));
    }

    #[test]
    fn test_media_content() {
        let message = MediaMessage::new(ContentUri::from("mxc://hs/abc"), "video/mp4", "clip", 42);
        assert_eq!(
            media(&message),
            json!({
                "msgtype": "m.video",
                "body": "clip",
                "url": "mxc://hs/abc",
                "info": { "mimetype": "video/mp4", "size": 42 },
            })
        );
    }

    #[test]
    fn test_unknown_type_is_file() {
        let message = MediaMessage::new(ContentUri::from("mxc://hs/abc"), "", "", 0);
        assert_eq!(media(&message)["msgtype"], "m.file");
    }
}
