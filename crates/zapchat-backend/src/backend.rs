//! The backend facade.
//!
//! Every operation is a composite of store read, in-memory mutation,
//! whole-collection write and event emission, in that order.  Operations
//! run to completion on the calling thread.
//!
//! A [`Backend`] owns one [`Storage`] handle ("this tab") and one
//! [`EventBus`].  At construction it installs the cross-tab bridge: a
//! store watcher that republishes [`ChatEvent::Refresh`] locally whenever
//! another handle on the same directory mutates messages, chats or
//! stories.  Dropping the backend tears the bridge down.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::info;

use zapchat_shared::constants::{AVATAR_BASE_URL, STORY_TTL_HOURS};
use zapchat_shared::types::{ChatId, ChatType, MessageId, MessageType, StoryId, StoryMediaType, UserId};
use zapchat_store::{seed, Chat, Collection, Message, Storage, Story, User, WatchGuard};

use crate::bus::EventBus;
use crate::error::{BackendError, Result};
use crate::events::ChatEvent;

/// Partial profile change; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub status_message: Option<String>,
    pub avatar_url: Option<String>,
}

/// The single API surface combining store mutation and event emission.
pub struct Backend {
    storage: Storage,
    bus: Arc<EventBus>,
    _bridge: WatchGuard,
}

impl Backend {
    /// Open the default application store and build a facade over it.
    pub fn new() -> Result<Self> {
        Self::with_storage(Storage::new()?)
    }

    /// Build a facade over a store at an explicit directory.  Opening the
    /// same directory from two backends models two tabs of one device.
    pub fn open_at(dir: &Path) -> Result<Self> {
        Self::with_storage(Storage::open_at(dir)?)
    }

    /// Build a facade over an already-open storage handle.  Seeds the
    /// demo data (idempotent) and installs the cross-tab refresh bridge.
    pub fn with_storage(storage: Storage) -> Result<Self> {
        seed::ensure_seeded(&storage)?;

        let bus = Arc::new(EventBus::new());
        let bridge = {
            let bus = Arc::clone(&bus);
            storage.watch(move |collection| {
                if matches!(
                    collection,
                    Collection::Messages | Collection::Chats | Collection::Stories
                ) {
                    bus.publish(&ChatEvent::Refresh);
                }
            })
        };

        Ok(Self {
            storage,
            bus,
            _bridge: bridge,
        })
    }

    /// The event bus live views subscribe on.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// The storage handle backing this facade.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Sign in as the seeded user matching `email`.  The session pointer
    /// is shared through the store, so signing in here signs in every tab.
    pub fn login(&self, email: &str) -> Result<User> {
        let users: Vec<User> = self.storage.get(Collection::Users)?;
        let user = users
            .into_iter()
            .find(|u| u.email == email)
            .ok_or_else(|| BackendError::UserNotFound(email.to_string()))?;

        self.storage.put_record(Collection::CurrentUser, &user)?;
        info!(user = %user.id, "logged in");
        Ok(user)
    }

    /// Clear the session pointer.  No event is published; callers reset
    /// their own view state.
    pub fn logout(&self) -> Result<()> {
        self.storage.delete_record(Collection::CurrentUser)?;
        info!("logged out");
        Ok(())
    }

    /// The signed-in user, if any.  Pure read of the session pointer.
    pub fn current_user(&self) -> Result<Option<User>> {
        Ok(self.storage.get_record(Collection::CurrentUser)?)
    }

    /// Merge the given fields into the signed-in user and persist the
    /// result to both the users collection and the session pointer.
    pub fn update_profile(&self, update: ProfileUpdate) -> Result<User> {
        let mut user = self.require_user()?;

        if let Some(display_name) = update.display_name {
            user.display_name = display_name;
        }
        if let Some(status_message) = update.status_message {
            user.status_message = Some(status_message);
        }
        if let Some(avatar_url) = update.avatar_url {
            user.avatar_url = avatar_url;
        }

        let mut users: Vec<User> = self.storage.get(Collection::Users)?;
        let slot = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| BackendError::UserNotFound(user.email.clone()))?;
        *slot = user.clone();
        self.storage.put(Collection::Users, &users)?;
        self.storage.put_record(Collection::CurrentUser, &user)?;

        self.bus.publish(&ChatEvent::ProfileUpdated(user.clone()));
        self.bus.publish(&ChatEvent::Refresh);
        Ok(user)
    }

    // ------------------------------------------------------------------
    // Chats
    // ------------------------------------------------------------------

    /// All chats, pinned first, then most recent activity first.
    pub fn chats(&self) -> Result<Vec<Chat>> {
        let mut chats: Vec<Chat> = self.storage.get(Collection::Chats)?;
        chats.sort_by(|a, b| {
            b.is_pinned.cmp(&a.is_pinned).then_with(|| {
                let a_at = a.last_message.as_ref().map(|m| m.created_at);
                let b_at = b.last_message.as_ref().map(|m| m.created_at);
                b_at.cmp(&a_at)
            })
        });
        Ok(chats)
    }

    /// Create a group chat with the signed-in user plus `member_ids`.
    pub fn create_group(&self, name: &str, member_ids: &[UserId]) -> Result<Chat> {
        let user = self.require_user()?;

        let name = name.trim();
        if name.is_empty() {
            return Err(BackendError::InvalidGroup("group name is empty"));
        }

        let mut members = vec![user.id.clone()];
        for member in member_ids {
            if !members.contains(member) {
                members.push(member.clone());
            }
        }
        if members.len() < 2 {
            return Err(BackendError::InvalidGroup(
                "a group needs at least one other member",
            ));
        }

        let chat = Chat {
            id: ChatId::generate(),
            chat_type: ChatType::Group,
            name: Some(name.to_string()),
            avatar_url: Some(format!("{AVATAR_BASE_URL}/seed/{name}/200/200")),
            members,
            created_by: user.id,
            last_message: None,
            unread_count: 0,
            is_pinned: false,
            is_archived: false,
            folder_id: None,
        };

        let mut chats: Vec<Chat> = self.storage.get(Collection::Chats)?;
        chats.push(chat.clone());
        self.storage.put(Collection::Chats, &chats)?;

        info!(chat = %chat.id, name, "group created");
        self.bus.publish(&ChatEvent::Refresh);
        Ok(chat)
    }

    /// Set or clear a chat's pin flag.  Idempotent.
    pub fn pin_chat(&self, chat_id: &ChatId, pinned: bool) -> Result<()> {
        self.mutate_chat(chat_id, |chat| chat.is_pinned = pinned)?;
        self.bus.publish(&ChatEvent::Refresh);
        Ok(())
    }

    /// Set or clear a chat's archive flag.  Idempotent.
    pub fn set_archived(&self, chat_id: &ChatId, archived: bool) -> Result<()> {
        self.mutate_chat(chat_id, |chat| chat.is_archived = archived)?;
        self.bus.publish(&ChatEvent::Refresh);
        Ok(())
    }

    /// Zero a chat's unread counter.
    pub fn mark_chat_read(&self, chat_id: &ChatId) -> Result<()> {
        self.mutate_chat(chat_id, |chat| chat.unread_count = 0)?;
        self.bus.publish(&ChatEvent::Refresh);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Messages of one chat, oldest first.
    pub fn messages(&self, chat_id: &ChatId) -> Result<Vec<Message>> {
        let all: Vec<Message> = self.storage.get(Collection::Messages)?;
        let mut messages: Vec<Message> =
            all.into_iter().filter(|m| &m.chat_id == chat_id).collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    /// Append a message to a chat and refresh the chat's denormalized
    /// last-message snapshot.
    pub fn send_message(
        &self,
        chat_id: &ChatId,
        content: impl Into<String>,
        message_type: MessageType,
        reply_to: Option<MessageId>,
    ) -> Result<Message> {
        let user = self.require_user()?;

        let mut chats: Vec<Chat> = self.storage.get(Collection::Chats)?;
        let chat_idx = chats
            .iter()
            .position(|c| &c.id == chat_id)
            .ok_or_else(|| BackendError::ChatNotFound(chat_id.clone()))?;

        let message = Message {
            id: MessageId::generate(),
            chat_id: chat_id.clone(),
            sender_id: user.id,
            content: content.into(),
            message_type,
            file_url: None,
            file_name: None,
            reply_to_id: reply_to,
            is_edited: false,
            is_deleted: false,
            delivered_at: None,
            read_at: None,
            created_at: Utc::now(),
            reactions: HashMap::new(),
        };

        let mut messages: Vec<Message> = self.storage.get(Collection::Messages)?;
        messages.push(message.clone());
        self.storage.put(Collection::Messages, &messages)?;

        chats[chat_idx].last_message = Some(message.clone());
        self.storage.put(Collection::Chats, &chats)?;

        info!(message = %message.id, chat = %chat_id, "message sent");
        self.bus.publish(&ChatEvent::MessageReceived(message.clone()));
        Ok(message)
    }

    /// Replace a message's content.  Sender only.
    pub fn edit_message(
        &self,
        message_id: &MessageId,
        content: impl Into<String>,
    ) -> Result<Message> {
        let user = self.require_user()?;
        let content = content.into();
        let updated = self.mutate_message(message_id, Some(&user.id), |message| {
            message.content = content;
            message.is_edited = true;
        })?;

        self.bus.publish(&ChatEvent::MessageUpdated(updated.clone()));
        Ok(updated)
    }

    /// Soft-delete a message.  Sender only; the record stays in the
    /// collection with its flag set.
    pub fn delete_message(&self, message_id: &MessageId) -> Result<Message> {
        let user = self.require_user()?;
        let updated = self.mutate_message(message_id, Some(&user.id), |message| {
            message.is_deleted = true;
        })?;

        self.bus.publish(&ChatEvent::MessageUpdated(updated.clone()));
        Ok(updated)
    }

    /// Add or remove the signed-in user's reaction under `emoji`.
    pub fn toggle_reaction(&self, message_id: &MessageId, emoji: &str) -> Result<Message> {
        let user = self.require_user()?;
        let updated = self.mutate_message(message_id, None, |message| {
            let reacted = message
                .reactions
                .get(emoji)
                .is_some_and(|ids| ids.contains(&user.id));
            if reacted {
                if let Some(ids) = message.reactions.get_mut(emoji) {
                    ids.retain(|id| id != &user.id);
                    if ids.is_empty() {
                        message.reactions.remove(emoji);
                    }
                }
            } else {
                message
                    .reactions
                    .entry(emoji.to_string())
                    .or_default()
                    .push(user.id.clone());
            }
        })?;

        self.bus.publish(&ChatEvent::MessageUpdated(updated.clone()));
        Ok(updated)
    }

    /// Announce the signed-in user's typing state for a chat.  Nothing is
    /// persisted; subscribers on this tab see a [`ChatEvent::Typing`].
    pub fn broadcast_typing(&self, chat_id: &ChatId, is_typing: bool) -> Result<()> {
        let user = self.require_user()?;
        self.bus.publish(&ChatEvent::Typing {
            chat_id: chat_id.clone(),
            user_id: user.id,
            is_typing,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// All known user accounts.
    pub fn users(&self) -> Result<Vec<User>> {
        Ok(self.storage.get(Collection::Users)?)
    }

    /// Ids of blocked users.  Seeded empty; nothing here mutates it.
    pub fn blocked_users(&self) -> Result<Vec<UserId>> {
        Ok(self.storage.get(Collection::BlockedUsers)?)
    }

    // ------------------------------------------------------------------
    // Stories
    // ------------------------------------------------------------------

    /// Stories still visible now.
    pub fn stories(&self) -> Result<Vec<Story>> {
        self.stories_at(Utc::now())
    }

    /// Stories still visible at `now`.  Visibility is a pure function of
    /// the expiry timestamp; expired stories stay stored.
    pub fn stories_at(&self, now: DateTime<Utc>) -> Result<Vec<Story>> {
        let stories: Vec<Story> = self.storage.get(Collection::Stories)?;
        Ok(stories.into_iter().filter(|s| s.expires_at > now).collect())
    }

    /// Post a story that expires 24 hours from now.
    pub fn post_story(&self, content_url: &str, media_type: StoryMediaType) -> Result<Story> {
        let user = self.require_user()?;

        let created_at = Utc::now();
        let story = Story {
            id: StoryId::generate(),
            user_id: user.id,
            content_url: content_url.to_string(),
            media_type,
            created_at,
            expires_at: created_at + Duration::hours(STORY_TTL_HOURS),
            viewers: Vec::new(),
        };

        let mut stories: Vec<Story> = self.storage.get(Collection::Stories)?;
        stories.push(story.clone());
        self.storage.put(Collection::Stories, &stories)?;

        info!(story = %story.id, "story posted");
        self.bus.publish(&ChatEvent::Refresh);
        Ok(story)
    }

    /// Record that the signed-in user viewed a story.  Counts each viewer
    /// once; repeat views change nothing and publish nothing.
    pub fn mark_story_viewed(&self, story_id: &StoryId) -> Result<()> {
        let user = self.require_user()?;

        let mut stories: Vec<Story> = self.storage.get(Collection::Stories)?;
        let story = stories
            .iter_mut()
            .find(|s| &s.id == story_id)
            .ok_or_else(|| BackendError::StoryNotFound(story_id.clone()))?;

        if story.viewers.contains(&user.id) {
            return Ok(());
        }
        story.viewers.push(user.id);
        self.storage.put(Collection::Stories, &stories)?;

        self.bus.publish(&ChatEvent::Refresh);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn require_user(&self) -> Result<User> {
        self.current_user()?.ok_or(BackendError::Unauthorized)
    }

    /// Single mutation entry point for the chats collection.
    fn mutate_chat(&self, chat_id: &ChatId, mutate: impl FnOnce(&mut Chat)) -> Result<Chat> {
        let mut chats: Vec<Chat> = self.storage.get(Collection::Chats)?;
        let chat = chats
            .iter_mut()
            .find(|c| &c.id == chat_id)
            .ok_or_else(|| BackendError::ChatNotFound(chat_id.clone()))?;

        mutate(chat);
        let updated = chat.clone();
        self.storage.put(Collection::Chats, &chats)?;
        Ok(updated)
    }

    /// Single mutation entry point for the messages collection.  When
    /// `sender` is given, the message must have been sent by that user.
    /// Keeps the parent chat's last-message snapshot in sync when the
    /// mutated message is the snapshot.
    fn mutate_message(
        &self,
        message_id: &MessageId,
        sender: Option<&UserId>,
        mutate: impl FnOnce(&mut Message),
    ) -> Result<Message> {
        let mut messages: Vec<Message> = self.storage.get(Collection::Messages)?;
        let message = messages
            .iter_mut()
            .find(|m| &m.id == message_id)
            .ok_or_else(|| BackendError::MessageNotFound(message_id.clone()))?;

        if let Some(sender) = sender {
            if &message.sender_id != sender {
                return Err(BackendError::NotMessageSender);
            }
        }

        mutate(message);
        let updated = message.clone();
        self.storage.put(Collection::Messages, &messages)?;
        self.sync_last_message(&updated)?;
        Ok(updated)
    }

    /// If `message` is the one denormalized onto its chat, copy the new
    /// state into the snapshot so the chat list never shows stale content.
    fn sync_last_message(&self, message: &Message) -> Result<()> {
        let mut chats: Vec<Chat> = self.storage.get(Collection::Chats)?;
        let Some(chat) = chats.iter_mut().find(|c| c.id == message.chat_id) else {
            return Ok(());
        };

        let is_snapshot = chat
            .last_message
            .as_ref()
            .is_some_and(|last| last.id == message.id);
        if is_snapshot {
            chat.last_message = Some(message.clone());
            self.storage.put(Collection::Chats, &chats)?;
        }
        Ok(())
    }
}
