//! # zapchat-shared
//!
//! Identifiers, closed enums and application constants shared by every
//! ZapChat crate.  Nothing here touches the filesystem or the event bus;
//! the crate exists so the store and the backend agree on ids and
//! discriminators without depending on each other.

pub mod constants;
pub mod types;

pub use types::{ChatId, ChatType, MessageId, MessageType, StoryId, StoryMediaType, UserId};
