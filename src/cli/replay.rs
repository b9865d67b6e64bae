//! Replay command - shows a stored conversation message by message.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::Config;
use crate::message::{Conversation, MessageId, RevealTransition};
use crate::render::RenderOptions;
use crate::reveal::{RevealPhase, Revealer};

/// Replay `path`. Completed reveals are applied to the conversation and,
/// with `save`, written back so the next replay shows them instantly.
pub async fn execute(
    path: &Path,
    save: bool,
    config: &Config,
    options: &RenderOptions,
) -> Result<()> {
    let mut conversation = Conversation::load(path).await?;
    let mut revealer = Revealer::new(config.delay_policy(), config.extract_options());
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<RevealTransition>();

    let ids: Vec<MessageId> = conversation.iter().map(|m| m.id.clone()).collect();
    let mut applied = 0;

    for id in ids {
        let Some(message) = conversation.get(&id).cloned() else {
            continue;
        };

        let label = if message.is_from_bot { "Bot" } else { "You" };
        if options.color {
            println!("{}", label.bold());
        } else {
            println!("{}:", label);
        }

        let tx = done_tx.clone();
        revealer.show(&message, move |transition| {
            let _ = tx.send(transition);
        });

        let handle = revealer
            .handle(&id)
            .with_context(|| format!("No reveal for message {}", id))?;
        let extracted = revealer
            .extracted(&id)
            .with_context(|| format!("No extraction for message {}", id))?;

        let state = super::present(handle, extracted, options).await?;
        println!();

        while let Ok(transition) = done_rx.try_recv() {
            if conversation.apply(&transition)? {
                applied += 1;
            }
        }

        if state.phase == RevealPhase::Cancelled {
            info!("replay interrupted");
            break;
        }
    }

    revealer.clear();

    if save && applied > 0 {
        conversation.save(path).await?;
        info!(applied, path = %path.display(), "saved revealed messages");
    }

    Ok(())
}
