//! # zapchat-backend
//!
//! The ZapChat backend facade: every UI action goes through [`Backend`],
//! which mutates the collection store and then publishes a typed event on
//! its [`EventBus`] so live views can react.  Independent facade instances
//! sharing one store directory behave like browser tabs: a mutation in one
//! republishes a coarse `Refresh` in all the others through the store's
//! change notification.
//!
//! Everything runs to completion on the calling thread; no operation
//! suspends mid-mutation, and events are only published after the
//! corresponding write has landed.

pub mod backend;
pub mod bus;
pub mod events;

mod error;

pub use backend::{Backend, ProfileUpdate};
pub use bus::{EventBus, Subscription};
pub use error::BackendError;
pub use events::{ChatEvent, EventKind};
