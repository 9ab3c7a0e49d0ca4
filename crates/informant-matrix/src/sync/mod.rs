//! `/sync` response model
//!
//! Only the parts the informant reacts to are modelled: invites addressed to
//! the account and messages in joined rooms. Everything else in the response
//! is ignored by serde.

use informant_core::events::{InviteEvent, RoomMessageEvent};
use informant_core::{EventId, RoomId, SessionEvent};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

const MEMBER_EVENT: &str = "m.room.member";
const MESSAGE_EVENT: &str = "m.room.message";

#[derive(Debug, Default, Deserialize)]
pub struct SyncResponse {
    pub next_batch: String,
    #[serde(default)]
    pub rooms: Rooms,
}

#[derive(Debug, Default, Deserialize)]
pub struct Rooms {
    #[serde(default)]
    pub join: BTreeMap<String, JoinedRoom>,
    #[serde(default)]
    pub invite: BTreeMap<String, InvitedRoom>,
}

#[derive(Debug, Default, Deserialize)]
pub struct JoinedRoom {
    #[serde(default)]
    pub timeline: Timeline,
}

#[derive(Debug, Default, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvitedRoom {
    #[serde(default)]
    pub invite_state: InviteState,
}

#[derive(Debug, Default, Deserialize)]
pub struct InviteState {
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

/// Client event with untyped content
#[derive(Debug, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub state_key: Option<String>,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub content: Value,
}

impl RawEvent {
    fn content_str(&self, key: &str) -> Option<&str> {
        self.content.get(key).and_then(Value::as_str)
    }
}

impl SyncResponse {
    /// Flatten the response into session events, invites first
    pub fn into_events(self) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        for (room_id, room) in self.rooms.invite {
            let invites = room
                .invite_state
                .events
                .into_iter()
                .filter(|e| e.event_type == MEMBER_EVENT)
                .filter(|e| e.content_str("membership") == Some("invite"));

            for event in invites {
                let Some(invitee) = event.state_key else {
                    continue;
                };
                events.push(SessionEvent::MemberInvited(InviteEvent {
                    room_id: RoomId::new(room_id.clone()),
                    inviter: event.sender,
                    invitee,
                }));
            }
        }

        for (room_id, room) in self.rooms.join {
            for event in room.timeline.events {
                if event.event_type != MESSAGE_EVENT {
                    continue;
                }
                let msgtype = event.content_str("msgtype").unwrap_or_default().to_string();
                let body = event.content_str("body").unwrap_or_default().to_string();
                events.push(SessionEvent::MessageReceived(RoomMessageEvent {
                    room_id: RoomId::new(room_id.clone()),
                    event_id: event.event_id.map(EventId::new),
                    sender: event.sender,
                    msgtype,
                    body,
                }));
            }
        }

        events
    }
}
