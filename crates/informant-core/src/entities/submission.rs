//! Submission entity - one inbound request to post into a room
//!
//! The wire format uses the field names `Channel`, `Message`, `ContentBytes`,
//! `ContentType`, `Caption` and `PSK`. `ContentBytes` travels as standard
//! base64. Every field is optional on the wire and defaults to empty.
//!
//! Field names match case-insensitively (`contentbytes`, `PSK`, `psk` are all
//! the same field) and `content_bytes`/`content_type` are also accepted. When a
//! field appears more than once the last value wins. A `null` text field is
//! ignored and a `null` payload is empty.

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::value_objects::RoomId;

/// A request to post a message and/or a piece of media into a room
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
pub struct Submission {
    /// Target room identifier
    #[serde(rename = "Channel")]
    pub channel: String,

    /// Plain text body, may be empty
    #[serde(rename = "Message")]
    pub message: String,

    /// Raw binary payload, may be empty
    #[serde(rename = "ContentBytes", serialize_with = "base64_bytes::serialize")]
    pub content_bytes: Vec<u8>,

    /// MIME type of `content_bytes`
    #[serde(rename = "ContentType")]
    pub content_type: String,

    /// Text accompanying a media post
    #[serde(rename = "Caption")]
    pub caption: String,

    /// Pre-shared key presented by the caller
    #[serde(rename = "PSK")]
    pub psk: String,
}

impl Submission {
    /// Create a text-only submission
    pub fn text(channel: impl Into<String>, message: impl Into<String>, psk: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            message: message.into(),
            psk: psk.into(),
            ..Self::default()
        }
    }

    /// Attach a binary payload
    #[must_use]
    pub fn with_content(
        mut self,
        bytes: impl Into<Vec<u8>>,
        content_type: impl Into<String>,
        caption: impl Into<String>,
    ) -> Self {
        self.content_bytes = bytes.into();
        self.content_type = content_type.into();
        self.caption = caption.into();
        self
    }

    /// Parse a submission from a raw request body
    ///
    /// # Errors
    /// Returns the JSON error when the body is not a valid submission object
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Target room
    pub fn room_id(&self) -> RoomId {
        RoomId::new(self.channel.clone())
    }

    /// Check if the submission carries media
    #[inline]
    pub fn has_content(&self) -> bool {
        !self.content_bytes.is_empty()
    }

    /// Check if the submission carries a text message
    #[inline]
    pub fn has_message(&self) -> bool {
        !self.message.is_empty()
    }
}

impl fmt::Debug for Submission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submission")
            .field("channel", &self.channel)
            .field("message_len", &self.message.len())
            .field("content_len", &self.content_bytes.len())
            .field("content_type", &self.content_type)
            .field("caption", &self.caption)
            .field("psk", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Copy)]
enum Field {
    Channel,
    Message,
    ContentBytes,
    ContentType,
    Caption,
    Psk,
}

impl Field {
    fn from_key(key: &str) -> Option<Self> {
        match key.to_lowercase().as_str() {
            "channel" => Some(Self::Channel),
            "message" => Some(Self::Message),
            "contentbytes" | "content_bytes" => Some(Self::ContentBytes),
            "contenttype" | "content_type" => Some(Self::ContentType),
            "caption" => Some(Self::Caption),
            "psk" => Some(Self::Psk),
            _ => None,
        }
    }
}

struct ContentBytes(Vec<u8>);

impl<'de> Deserialize<'de> for ContentBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        base64_bytes::deserialize(deserializer).map(Self)
    }
}

impl<'de> Deserialize<'de> for Submission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SubmissionVisitor)
    }
}

struct SubmissionVisitor;

impl<'de> Visitor<'de> for SubmissionVisitor {
    type Value = Submission;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a submission object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Submission, A::Error> {
        let mut submission = Submission::default();

        while let Some(key) = map.next_key::<String>()? {
            let slot = match Field::from_key(&key) {
                Some(Field::ContentBytes) => {
                    submission.content_bytes = map.next_value::<ContentBytes>()?.0;
                    continue;
                }
                Some(Field::Channel) => &mut submission.channel,
                Some(Field::Message) => &mut submission.message,
                Some(Field::ContentType) => &mut submission.content_type,
                Some(Field::Caption) => &mut submission.caption,
                Some(Field::Psk) => &mut submission.psk,
                None => {
                    map.next_value::<IgnoredAny>()?;
                    continue;
                }
            };
            if let Some(value) = map.next_value::<Option<String>>()? {
                *slot = value;
            }
        }

        Ok(submission)
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => STANDARD
                .decode(encoded.as_bytes())
                .map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}
