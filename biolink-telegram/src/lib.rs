//! Telegram Bot API adapter: the `MessagingGateway` implementation and the
//! long-polling update feed.

mod client;
mod errors;
pub mod updates;

pub use client::{BotIdentity, TelegramGateway};
pub use updates::{InboundEvent, Update, UpdatePoller};
