mod action;
mod author;
mod backend;
mod chat_state;
mod conversation;
mod directive;
mod event;
mod fragment;
mod message;
mod session;
mod slash_commands;

pub use action::*;
pub use author::*;
pub use backend::*;
pub use chat_state::*;
pub use conversation::*;
pub use directive::*;
pub use event::*;
pub use fragment::*;
pub use message::*;
pub use session::*;
pub use slash_commands::*;
