//! First-run demonstration data.
//!
//! Seeding is guarded per collection: only collections that have never
//! been written are populated, so re-running it against an existing store
//! neither duplicates nor resets anything.

use chrono::{Duration, Utc};
use zapchat_shared::types::{ChatId, ChatType, UserId};

use crate::error::Result;
use crate::models::{Chat, User};
use crate::storage::{Collection, Storage};

/// Populate the demo users, chats and blocked-user list if absent.
pub fn ensure_seeded(storage: &Storage) -> Result<()> {
    if !storage.contains(Collection::Users) {
        tracing::info!("seeding demo users");
        storage.put(Collection::Users, &demo_users())?;
    }

    if !storage.contains(Collection::Chats) {
        tracing::info!("seeding demo chats");
        storage.put(Collection::Chats, &demo_chats())?;
    }

    if !storage.contains(Collection::BlockedUsers) {
        storage.put::<UserId>(Collection::BlockedUsers, &[])?;
    }

    Ok(())
}

fn demo_users() -> Vec<User> {
    let now = Utc::now();
    vec![
        User {
            id: UserId::from("u1"),
            username: "alex_dev".to_string(),
            display_name: "Alex Rivers".to_string(),
            email: "alex@example.com".to_string(),
            avatar_url: "https://picsum.photos/id/64/200/200".to_string(),
            status_message: Some("Building the future.".to_string()),
            is_online: true,
            last_seen: now,
            is_premium: true,
        },
        User {
            id: UserId::from("u2"),
            username: "sarah_m".to_string(),
            display_name: "Sarah Miller".to_string(),
            email: "sarah@example.com".to_string(),
            avatar_url: "https://picsum.photos/id/65/200/200".to_string(),
            status_message: Some("At the gym 🏋️‍♀️".to_string()),
            is_online: false,
            last_seen: now - Duration::hours(1),
            is_premium: false,
        },
        User {
            id: UserId::from("u3"),
            username: "jason_k".to_string(),
            display_name: "Jason Knight".to_string(),
            email: "jason@example.com".to_string(),
            avatar_url: "https://picsum.photos/id/66/200/200".to_string(),
            status_message: Some("Available".to_string()),
            is_online: true,
            last_seen: now,
            is_premium: false,
        },
        User {
            id: UserId::from("u4"),
            username: "zap_news".to_string(),
            display_name: "ZapChat News".to_string(),
            email: "news@zapchat.com".to_string(),
            avatar_url: "https://picsum.photos/id/60/200/200".to_string(),
            status_message: Some("Official Channel".to_string()),
            is_online: true,
            last_seen: now,
            is_premium: false,
        },
    ]
}

fn demo_chats() -> Vec<Chat> {
    vec![
        Chat {
            id: ChatId::from("c1"),
            chat_type: ChatType::Direct,
            name: None,
            avatar_url: None,
            members: vec![UserId::from("u1"), UserId::from("u2")],
            created_by: UserId::from("system"),
            last_message: None,
            unread_count: 0,
            is_pinned: false,
            is_archived: false,
            folder_id: None,
        },
        Chat {
            id: ChatId::from("c2"),
            chat_type: ChatType::Channel,
            name: Some("ZapChat Official".to_string()),
            avatar_url: Some("https://picsum.photos/id/60/200/200".to_string()),
            members: vec![
                UserId::from("u1"),
                UserId::from("u2"),
                UserId::from("u3"),
                UserId::from("u4"),
            ],
            created_by: UserId::from("u4"),
            last_message: None,
            unread_count: 5,
            is_pinned: false,
            is_archived: false,
            folder_id: None,
        },
    ]
}
