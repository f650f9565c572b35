//! # zapchat-store
//!
//! Durable collection store for the ZapChat application.
//!
//! State lives in a handful of named collections (users, chats, messages,
//! stories, ...), each serialized as one JSON text file in a data
//! directory.  The only mutation primitive is a whole-collection replace:
//! callers read the full collection, modify it in memory and write it
//! back.  The crate exposes a [`Storage`] handle per "tab"; every write
//! through one handle synchronously notifies watchers registered on every
//! other handle open on the same directory.

pub mod models;
pub mod seed;
pub mod storage;

mod error;

pub use error::StoreError;
pub use models::*;
pub use storage::{Collection, Storage, WatchGuard};
