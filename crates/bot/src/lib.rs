//! Chat-facing side of chatdigest: command parsing, reply formatting, and the
//! controller that connects a channel to the cache and the summarizer.

pub mod command;
pub mod controller;
pub mod reply;

pub use command::{Command, CommandError};
pub use controller::BotController;
pub use reply::Reply;
