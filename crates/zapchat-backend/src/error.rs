use thiserror::Error;
use zapchat_shared::types::{ChatId, MessageId, StoryId};
use zapchat_store::StoreError;

/// Errors produced by the backend facade.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Login with an email no account matches.
    #[error("No user found for {0}")]
    UserNotFound(String),

    /// A mutating operation was attempted with no signed-in user.
    #[error("Operation requires a signed-in user")]
    Unauthorized,

    /// The referenced chat does not exist.
    #[error("Unknown chat {0}")]
    ChatNotFound(ChatId),

    /// The referenced message does not exist.
    #[error("Unknown message {0}")]
    MessageNotFound(MessageId),

    /// The referenced story does not exist.
    #[error("Unknown story {0}")]
    StoryNotFound(StoryId),

    /// Only the sender may edit or delete a message.
    #[error("Only the sender can modify a message")]
    NotMessageSender,

    /// Group creation precondition failed.
    #[error("Invalid group: {0}")]
    InvalidGroup(&'static str),

    /// Store layer failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BackendError>;
