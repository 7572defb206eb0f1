//! Application services: the chat turn entry point and session/token
//! lifecycle.

pub mod chat;
pub mod session;

pub use chat::{ChatMessage, ChatService, ChatTurnRequest, ChatTurnResponse, DEFAULT_APOLOGY};
pub use session::SessionService;
