//! Status line cycler for long-running generation requests.
//!
//! While an image (or any slow result) is being produced, the chat shows a
//! fixed prefix followed by a rotating suffix, e.g. `Generating image.`,
//! `Generating image..`. The cycler moves `Idle -> Cycling -> Replaced`; once
//! replaced by the real result its interval is cancelled for good.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const DEFAULT_PREFIX: &str = "Generating image";
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

pub fn default_suffixes() -> Vec<String> {
    vec![".".to_string(), "..".to_string(), "...".to_string()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Idle,
    Cycling,
    Replaced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressState {
    pub phase: ProgressPhase,
    pub text: String,
    /// Interval ticks observed while cycling
    pub ticks: u64,
}

pub struct ProgressCycler {
    prefix: String,
    suffixes: Arc<[String]>,
    interval: Duration,
    state: Arc<watch::Sender<ProgressState>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Default for ProgressCycler {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX, default_suffixes(), DEFAULT_INTERVAL)
    }
}

impl ProgressCycler {
    /// Create an idle cycler. An empty suffix list cycles nothing; a zero
    /// interval is raised to one millisecond.
    pub fn new(prefix: impl Into<String>, suffixes: Vec<String>, interval: Duration) -> Self {
        let prefix = prefix.into();
        let suffixes: Arc<[String]> = if suffixes.is_empty() {
            Arc::from(vec![String::new()])
        } else {
            Arc::from(suffixes)
        };

        let (tx, _) = watch::channel(ProgressState {
            phase: ProgressPhase::Idle,
            text: prefix.clone(),
            ticks: 0,
        });

        Self {
            prefix,
            suffixes,
            interval: interval.max(Duration::from_millis(1)),
            state: Arc::new(tx),
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    /// Begin cycling. Does nothing unless the cycler is idle.
    pub fn start(&mut self) {
        let started = self.state.send_if_modified(|s| {
            if s.phase != ProgressPhase::Idle {
                return false;
            }
            s.phase = ProgressPhase::Cycling;
            s.text = format!("{}{}", self.prefix, self.suffixes[0]);
            true
        });
        if !started {
            return;
        }

        debug!(prefix = %self.prefix, interval = ?self.interval, "progress cycling");

        let prefix = self.prefix.clone();
        let suffixes = self.suffixes.clone();
        let period = self.interval;
        let state = self.state.clone();
        let cancel = self.cancel.clone();

        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            let mut index = 0;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                index = (index + 1) % suffixes.len();
                let still_cycling = state.send_if_modified(|s| {
                    if s.phase != ProgressPhase::Cycling {
                        return false;
                    }
                    s.text = format!("{}{}", prefix, suffixes[index]);
                    s.ticks += 1;
                    true
                });
                if !still_cycling {
                    break;
                }
            }
        }));
    }

    /// Swap the status line for the real result and stop cycling
    pub fn replace(&mut self, result: impl Into<String>) {
        self.stop();
        let result = result.into();
        self.state.send_modify(|s| {
            s.phase = ProgressPhase::Replaced;
            s.text = result;
        });
        debug!("progress replaced");
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ProgressState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> ProgressPhase {
        self.state.borrow().phase
    }

    pub fn text(&self) -> String {
        self.state.borrow().text.clone()
    }

    fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ProgressCycler {
    fn drop(&mut self) {
        self.stop();
    }
}
