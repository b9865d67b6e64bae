//! typechat - typewriter-style rendering of chat messages with think and code blocks

pub mod cli;
pub mod config;
pub mod id;
pub mod message;
pub mod progress;
pub mod render;
pub mod reveal;
