// Public modules
pub mod backend;
pub mod chat;
pub mod client;
pub mod error;
pub mod live;
pub mod observability;
pub mod render;
pub mod types;

// Re-exports
pub use backend::{ChatBackend, LiveEvent, LiveFeed, LiveHandle};
pub use client::ChatService;
pub use error::{Error, Result};
pub use types::*;
