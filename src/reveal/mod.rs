//! Typewriter-style reveal of a message.
//!
//! [`RevealHandle::start`] spawns one task per message that discloses the
//! think segment character by character, then the main text, sleeping a
//! randomized delay before every character. Observers read the growing
//! [`RevealState`] through a `watch` channel.
//!
//! The handle owns the task: cancelling or dropping it stops the chain, and
//! every mutation re-checks the phase under the channel lock, so nothing is
//! written and no completion fires after cancellation.

pub mod assemble;
pub mod registry;

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::message::{CodeBlock, Extracted, MessageId, RevealTransition};

pub use assemble::{assemble, split_segments, Fragment};
pub use registry::Revealer;

/// Per-character delay, sampled uniformly from `[min, max)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayPolicy {
    pub min: Duration,
    pub max: Duration,
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self::from_millis(10, 30)
    }
}

impl DelayPolicy {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub fn from_millis(min: u64, max: u64) -> Self {
        Self::new(Duration::from_millis(min), Duration::from_millis(max))
    }

    /// Sample the delay before the next character.
    ///
    /// An empty range (`max <= min`) always yields `min`.
    pub fn next_delay(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }

        let min = self.min.as_micros() as u64;
        let max = self.max.as_micros() as u64;
        Duration::from_micros(rand::rng().random_range(min..max))
    }
}

/// Where a reveal currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevealPhase {
    /// Disclosing the think segment
    Thinking,
    /// Disclosing the main text
    #[default]
    Writing,
    Complete,
    Cancelled,
}

/// Text disclosed so far
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RevealState {
    pub think: String,
    /// Main text, code blocks still as placeholders
    pub text: String,
    /// The think segment has been fully disclosed
    pub think_done: bool,
    pub phase: RevealPhase,
}

impl RevealState {
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, RevealPhase::Complete | RevealPhase::Cancelled)
    }

    /// Interleave the disclosed text with the code blocks it has reached
    pub fn fragments<'a>(&'a self, code_blocks: &'a [CodeBlock]) -> Vec<Fragment<'a>> {
        assemble(&self.text, code_blocks)
    }
}

/// Owner of one message's reveal chain
pub struct RevealHandle {
    id: MessageId,
    state: Arc<watch::Sender<RevealState>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RevealHandle {
    /// Begin revealing `extracted`.
    ///
    /// With `revealed` set the full text is shown at once: no task is spawned
    /// and `on_complete` is never called. Otherwise this must run inside a
    /// tokio runtime, and `on_complete` fires once after the last character.
    pub fn start<F>(
        id: MessageId,
        extracted: &Extracted,
        revealed: bool,
        policy: DelayPolicy,
        on_complete: F,
    ) -> Self
    where
        F: FnOnce(RevealTransition) + Send + 'static,
    {
        let think = extracted.think_content().unwrap_or_default().to_string();
        let text = extracted.text.clone();

        if revealed {
            return Self::instant(id, think, text);
        }

        let initial = RevealState {
            think_done: think.is_empty(),
            phase: if think.is_empty() {
                RevealPhase::Writing
            } else {
                RevealPhase::Thinking
            },
            ..Default::default()
        };
        let (tx, _) = watch::channel(initial);
        let state = Arc::new(tx);
        let cancel = CancellationToken::new();

        debug!(
            message = %id,
            think_chars = think.chars().count(),
            text_chars = text.chars().count(),
            "starting reveal"
        );

        let task = tokio::spawn(run_reveal(
            id.clone(),
            think,
            text,
            policy,
            state.clone(),
            cancel.clone(),
            on_complete,
        ));

        Self {
            id,
            state,
            cancel,
            task: Some(task),
        }
    }

    fn instant(id: MessageId, think: String, text: String) -> Self {
        let (tx, _) = watch::channel(RevealState {
            think,
            text,
            think_done: true,
            phase: RevealPhase::Complete,
        });

        Self {
            id,
            state: Arc::new(tx),
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn subscribe(&self) -> watch::Receiver<RevealState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> RevealState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> RevealPhase {
        self.state.borrow().phase
    }

    /// Whether a timer chain was ever scheduled for this message
    pub fn is_scheduled(&self) -> bool {
        self.task.is_some()
    }

    /// Wait until the reveal completes or is cancelled
    pub async fn finished(&self) -> RevealState {
        let mut rx = self.subscribe();
        let state = match rx.wait_for(RevealState::is_finished).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        };
        state
    }

    /// Stop the chain. A completed reveal keeps its `Complete` phase.
    pub fn cancel(&self) {
        self.cancel.cancel();

        let cancelled = self.state.send_if_modified(|s| {
            if s.is_finished() {
                return false;
            }
            s.phase = RevealPhase::Cancelled;
            true
        });

        if let Some(task) = &self.task {
            task.abort();
        }

        if cancelled {
            debug!(message = %self.id, "reveal cancelled");
        }
    }
}

impl Drop for RevealHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_reveal<F>(
    id: MessageId,
    think: String,
    text: String,
    policy: DelayPolicy,
    state: Arc<watch::Sender<RevealState>>,
    cancel: CancellationToken,
    on_complete: F,
) where
    F: FnOnce(RevealTransition) + Send + 'static,
{
    for ch in think.chars() {
        if !pause(&policy, &cancel).await || !update(&state, |s| s.think.push(ch)) {
            return;
        }
    }

    let started_writing = update(&state, |s| {
        s.think_done = true;
        s.phase = RevealPhase::Writing;
    });
    if !started_writing {
        return;
    }

    for ch in text.chars() {
        if !pause(&policy, &cancel).await || !update(&state, |s| s.text.push(ch)) {
            return;
        }
    }

    if update(&state, |s| s.phase = RevealPhase::Complete) {
        debug!(message = %id, "reveal complete");
        on_complete(RevealTransition::Revealed(id));
    }
}

/// Sleep one sampled delay. Returns false when cancelled first.
async fn pause(policy: &DelayPolicy, cancel: &CancellationToken) -> bool {
    let delay = policy.next_delay();
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Apply `f` unless the reveal was cancelled. Returns whether it was applied.
fn update(state: &watch::Sender<RevealState>, f: impl FnOnce(&mut RevealState)) -> bool {
    state.send_if_modified(|s| {
        if s.phase == RevealPhase::Cancelled {
            return false;
        }
        f(s);
        true
    })
}
