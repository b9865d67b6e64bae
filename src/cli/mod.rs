//! Subcommands of the `typechat` binary.

pub mod config;
pub mod export;
pub mod extract;
pub mod progress;
pub mod replay;
pub mod reveal;

use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::AsyncReadExt;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;
use tracing::info;

use crate::message::Extracted;
use crate::render::{self, LivePrinter, RenderOptions};
use crate::reveal::{RevealHandle, RevealState};

/// Read message text from a file, or stdin when no file is given
pub async fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read message file: {:?}", path)),
        None => {
            let mut content = String::new();
            tokio::io::stdin()
                .read_to_string(&mut content)
                .await
                .context("Failed to read message from stdin")?;
            Ok(content)
        }
    }
}

/// Show one reveal on stdout until it completes or Ctrl-C cancels it.
///
/// A reveal with no timer chain is drawn at once with full Markdown
/// rendering; a running one is followed character by character.
pub async fn present(
    handle: &RevealHandle,
    extracted: &Extracted,
    options: &RenderOptions,
) -> Result<RevealState> {
    if !handle.is_scheduled() {
        let state = handle.snapshot();
        println!("{}", render::render_state(&state, extracted, options));
        return Ok(state);
    }

    let mut printer = LivePrinter::new(std::io::stdout(), extracted, options);
    let mut states = WatchStream::new(handle.subscribe());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            next = states.next() => {
                let Some(state) = next else { break };
                printer.update(&state)?;
                if state.is_finished() {
                    return Ok(state);
                }
            }
            _ = &mut ctrl_c => {
                handle.cancel();
                let state = handle.snapshot();
                printer.update(&state)?;
                info!(message = %handle.id(), "reveal interrupted");
                return Ok(state);
            }
        }
    }

    Ok(handle.snapshot())
}
