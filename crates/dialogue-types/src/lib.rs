//! Shared message shapes: the viewer wire protocol, persona identifiers and
//! the chat-completion request the generation service consumes.
pub mod chat;
pub mod events;
pub mod persona;

pub use chat::{ChatMessage, ChatRequest, ChatRole};
pub use events::{ServerMessage, ViewerMessage};
pub use persona::Persona;
