use serde::{Deserialize, Serialize};

use crate::value_objects::{EventId, RoomId};

/// All events the core reacts to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEvent {
    MessageReceived(RoomMessageEvent),
    MemberInvited(InviteEvent),
}

impl SessionEvent {
    /// Get the event type name
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MessageReceived(_) => "MESSAGE_RECEIVED",
            Self::MemberInvited(_) => "MEMBER_INVITED",
        }
    }

    /// Room the event happened in
    #[must_use]
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::MessageReceived(e) => &e.room_id,
            Self::MemberInvited(e) => &e.room_id,
        }
    }
}

/// A message observed in a joined room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMessageEvent {
    pub room_id: RoomId,
    pub event_id: Option<EventId>,
    pub sender: String,
    pub msgtype: String,
    pub body: String,
}

/// A membership invite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteEvent {
    pub room_id: RoomId,
    /// User that sent the invite
    pub inviter: String,
    /// User being invited
    pub invitee: String,
}

impl InviteEvent {
    /// Check if the invite targets the given account
    #[inline]
    pub fn targets(&self, user_id: &str) -> bool {
        self.invitee == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_and_room() {
        let event = SessionEvent::MemberInvited(InviteEvent {
            room_id: RoomId::from("!r:x"),
            inviter: "@alice:x".to_string(),
            invitee: "@bot:x".to_string(),
        });

        assert_eq!(event.event_type(), "MEMBER_INVITED");
        assert_eq!(event.room_id().as_str(), "!r:x");
    }

    #[test]
    fn test_invite_targets() {
        let invite = InviteEvent {
            room_id: RoomId::from("!r:x"),
            inviter: "@alice:x".to_string(),
            invitee: "@bot:x".to_string(),
        };

        assert!(invite.targets("@bot:x"));
        assert!(!invite.targets("@alice:x"));
    }
}
