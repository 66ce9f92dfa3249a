//! Dialog/LLM Session (spec §4.5): a bounded-history conversation wrapper around the
//! [`crate::vendor::LlmChatClient`] vendor interface.

mod message;
mod session;

pub use message::{Message, Role};
pub use session::LlmSession;
