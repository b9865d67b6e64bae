//! Registry of active reveals, one chain per message.
//!
//! Showing a message again with unchanged content hands back the running (or
//! finished) reveal, so a redraw never restarts the animation or re-fires the
//! completion. Changed content cancels the old chain before a new one starts.

use std::collections::HashMap;
use tokio::sync::watch;
use tracing::debug;

use super::{DelayPolicy, RevealHandle, RevealState};
use crate::id::{self, IdPrefix};
use crate::message::{CodeBlock, ExtractOptions, Extracted, Message, MessageId, RevealTransition};

struct Entry {
    content: String,
    extracted: Extracted,
    handle: RevealHandle,
}

/// Owns the reveal handles of every message currently on screen
pub struct Revealer {
    policy: DelayPolicy,
    options: ExtractOptions,
    active: HashMap<MessageId, Entry>,
}

impl Default for Revealer {
    fn default() -> Self {
        Self::new(DelayPolicy::default(), ExtractOptions::default())
    }
}

impl Revealer {
    pub fn new(policy: DelayPolicy, options: ExtractOptions) -> Self {
        Self {
            policy,
            options,
            active: HashMap::new(),
        }
    }

    /// Show a message, starting its reveal if needed.
    ///
    /// `on_complete` is dropped unused when the existing reveal is reused or
    /// when the message does not animate.
    pub fn show<F>(&mut self, message: &Message, on_complete: F) -> watch::Receiver<RevealState>
    where
        F: FnOnce(RevealTransition) + Send + 'static,
    {
        if let Some(entry) = self.active.get(&message.id) {
            if entry.content == message.content {
                return entry.handle.subscribe();
            }
        }

        if self.active.remove(&message.id).is_some() {
            debug!(message = %message.id, "content changed, restarting reveal");
        }

        let extracted = message.extract(&self.options);
        let handle = RevealHandle::start(
            message.id.clone(),
            &extracted,
            !message.needs_reveal(),
            self.policy,
            on_complete,
        );
        let rx = handle.subscribe();

        self.active.insert(
            message.id.clone(),
            Entry {
                content: message.content.clone(),
                extracted,
                handle,
            },
        );

        rx
    }

    pub fn handle(&self, id: &MessageId) -> Option<&RevealHandle> {
        self.active.get(id).map(|e| &e.handle)
    }

    pub fn extracted(&self, id: &MessageId) -> Option<&Extracted> {
        self.active.get(id).map(|e| &e.extracted)
    }

    /// Code blocks of a shown message, for the code view
    pub fn code_blocks(&self, id: &MessageId) -> &[CodeBlock] {
        self.active
            .get(id)
            .map(|e| e.extracted.code_blocks.as_slice())
            .unwrap_or_default()
    }

    /// Find a code block of a shown message by its id
    pub fn find_code_block(&self, id: &MessageId, block_id: &str) -> Option<&CodeBlock> {
        if !id::has_prefix(block_id, IdPrefix::Code) {
            debug!(block_id, "not a code block id");
            return None;
        }
        self.code_blocks(id).iter().find(|b| b.id == block_id)
    }

    /// Tear down a message's reveal. Returns whether one was active.
    pub fn remove(&mut self, id: &MessageId) -> bool {
        self.active.remove(id).is_some()
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
