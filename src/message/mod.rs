//! Chat messages and the conversation that owns them.
//!
//! A [`Message`] is only ever mutated through its owning [`Conversation`]:
//! the reveal scheduler reports completion as a [`RevealTransition`] and the
//! conversation applies it, instead of anyone flipping flags on a shared
//! message object.

pub mod blocks;
pub mod transcript;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tokio::fs;

use crate::id::{self, IdPrefix};

pub use blocks::{extract, CodeBlock, ExtractOptions, Extracted, ThinkBlock, PLACEHOLDER};

/// Identifier of a message within a conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new() -> Self {
        Self(id::ascending(IdPrefix::Message))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub id: MessageId,
    pub content: String,
    #[serde(default)]
    pub is_from_bot: bool,
    /// The reveal animation already ran to completion
    #[serde(default, alias = "alreadyRevealed")]
    pub revealed: bool,
    /// Creation time in milliseconds since the epoch
    #[serde(default = "now_millis")]
    pub created: i64,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, false)
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self::new(content, true)
    }

    fn new(content: impl Into<String>, is_from_bot: bool) -> Self {
        Self {
            id: MessageId::new(),
            content: content.into(),
            is_from_bot,
            revealed: false,
            created: now_millis(),
        }
    }

    /// Mark as already revealed (history replay)
    pub fn with_revealed(mut self, revealed: bool) -> Self {
        self.revealed = revealed;
        self
    }

    /// Whether showing this message should run the reveal animation
    pub fn needs_reveal(&self) -> bool {
        self.is_from_bot && !self.revealed
    }

    pub fn extract(&self, options: &ExtractOptions) -> Extracted {
        blocks::extract(&self.content, options)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// State change reported by the reveal scheduler back to the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealTransition {
    /// The message finished its reveal animation
    Revealed(MessageId),
}

impl RevealTransition {
    pub fn message_id(&self) -> &MessageId {
        match self {
            RevealTransition::Revealed(id) => id,
        }
    }
}

/// Errors raised when mutating a conversation
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("message not found: {0}")]
    NotFound(MessageId),
}

/// Ordered list of messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) -> MessageId {
        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Apply a transition. Returns `Ok(false)` when it changed nothing.
    pub fn apply(&mut self, transition: &RevealTransition) -> Result<bool, ConversationError> {
        match transition {
            RevealTransition::Revealed(id) => {
                let message = self.get_mut(id)?;
                if message.revealed {
                    return Ok(false);
                }
                message.revealed = true;
                Ok(true)
            }
        }
    }

    /// Swap the content of a message, e.g. a status line replaced by a result.
    ///
    /// The message is treated as new content and will be revealed again.
    pub fn replace_content(
        &mut self,
        id: &MessageId,
        content: impl Into<String>,
    ) -> Result<(), ConversationError> {
        let message = self.get_mut(id)?;
        message.content = content.into();
        message.revealed = false;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    fn get_mut(&mut self, id: &MessageId) -> Result<&mut Message, ConversationError> {
        self.messages
            .iter_mut()
            .find(|m| &m.id == id)
            .ok_or_else(|| ConversationError::NotFound(id.clone()))
    }

    /// Load a conversation from a JSON file.
    ///
    /// Accepts either `{"messages": [...]}` or a bare array of messages.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read conversation file: {:?}", path))?;

        if content.trim_start().starts_with('[') {
            let messages: Vec<Message> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse conversation file: {:?}", path))?;
            return Ok(Self { messages });
        }

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse conversation file: {:?}", path))
    }

    /// Write the conversation back as pretty JSON
    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize conversation")?;
        fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write conversation file: {:?}", path))?;
        Ok(())
    }
}
