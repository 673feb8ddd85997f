//! Chat channel implementations for chatdigest.
//!
//! Each channel connects to a chat platform, relays observed messages to the
//! bot controller, and delivers its replies.
//!
//! Available channels:
//! - **Discord** — Discord Gateway WebSocket plus REST replies and history
//! - **CLI** — Interactive terminal chat (stdin/stdout)

pub mod cli;
pub mod discord;

pub use cli::CliChannel;
pub use discord::{DiscordChannel, DiscordConfig};
