//! The closed set of events the backend can announce.

use serde::Serialize;
use zapchat_shared::types::{ChatId, UserId};
use zapchat_store::{Message, User};

/// Everything live subscribers can be told about.
///
/// Serialized form uses the event names the web client listened for
/// (`message_received`, `typing`, ...), so a rendering layer can forward
/// events over IPC untouched.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A message was newly created in some chat.
    MessageReceived(Message),
    /// An existing message's content or flags changed.
    MessageUpdated(Message),
    /// Ephemeral typing-state broadcast; never persisted.
    #[serde(rename_all = "camelCase")]
    Typing {
        chat_id: ChatId,
        user_id: UserId,
        is_typing: bool,
    },
    /// The signed-in user's profile changed.
    ProfileUpdated(User),
    /// Coarse-grained "re-fetch everything relevant" signal.
    Refresh,
}

impl ChatEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ChatEvent::MessageReceived(_) => EventKind::MessageReceived,
            ChatEvent::MessageUpdated(_) => EventKind::MessageUpdated,
            ChatEvent::Typing { .. } => EventKind::Typing,
            ChatEvent::ProfileUpdated(_) => EventKind::ProfileUpdated,
            ChatEvent::Refresh => EventKind::Refresh,
        }
    }
}

/// Discriminant-only mirror of [`ChatEvent`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MessageReceived,
    MessageUpdated,
    Typing,
    ProfileUpdated,
    Refresh,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_event_names_match_the_web_client() {
        let json = serde_json::to_value(&ChatEvent::Refresh).unwrap();
        assert_eq!(json["event"], "refresh");

        let json = serde_json::to_value(&ChatEvent::Typing {
            chat_id: ChatId::from("c1"),
            user_id: UserId::from("u1"),
            is_typing: true,
        })
        .unwrap();
        assert_eq!(json["event"], "typing");
        assert_eq!(json["data"]["chatId"], "c1");
        assert_eq!(json["data"]["isTyping"], true);
    }
}
