// Public modules
pub mod chat;
pub mod message;
pub mod token;
pub mod user;

// Re-exports
pub use chat::{Chat, ChatCreateParams};
pub use message::{Message, MessageCreateParams};
pub use token::TokenResponse;
pub use user::{
    Credentials, PASSWORD_MAX_LEN, PASSWORD_MIN_LEN, USERNAME_MAX_LEN, USERNAME_MIN_LEN, User,
};
