//! Opaque identifiers
//!
//! Room ids, event ids and content URIs are treated as opaque strings. The
//! newtypes only exist so that a room id cannot be passed where an event id
//! is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the raw identifier
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the raw identifier
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

opaque_id!(
    /// Room identifier, e.g. `!abc:example.org` or an alias
    RoomId
);

opaque_id!(
    /// Identifier of an event accepted by the homeserver
    EventId
);

opaque_id!(
    /// Location of uploaded content, e.g. `mxc://example.org/abc`
    ContentUri
);
