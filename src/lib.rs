//! chat-kv - a key-value store kept in a conversational backend's memory
//!
//! The store holds no data of its own. One dialogue is taught to behave like
//! a small interpreter over a key/value map; a second dialogue is taught to
//! remember every mutating command, which makes undo possible by wiping the
//! first dialogue and replaying what the second one remembers.

pub mod action_log;
pub mod command;
pub mod config;
pub mod credentials;
pub mod dialogue;
pub mod error;
pub mod normalize;
pub mod prompts;
pub mod store;
pub mod transport;

pub use command::Command;
pub use config::Config;
pub use credentials::{SessionCredentials, SharedCredentials};
pub use dialogue::{ContinuationTokens, DialogueClient, RetryPolicy};
pub use error::{StoreError, StoreResult};
pub use normalize::NormalizeError;
pub use store::{ConversationIds, KeyValueStore, SharedStore, StoreOptions};
pub use transport::{ChatBackend, LoggingSession, RemoteSession};
