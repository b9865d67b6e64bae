//! Reveal command - types out a single bot message.

use anyhow::Result;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::Config;
use crate::message::Message;
use crate::render::RenderOptions;
use crate::reveal::{RevealHandle, RevealPhase};

/// Animate one message read from `file` (or stdin)
pub async fn execute(
    file: Option<&Path>,
    instant: bool,
    config: &Config,
    options: &RenderOptions,
) -> Result<()> {
    let content = super::read_input(file).await?;
    let message = Message::bot(content).with_revealed(instant);
    let extracted = message.extract(&config.extract_options());

    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let handle = RevealHandle::start(
        message.id.clone(),
        &extracted,
        message.revealed,
        config.delay_policy(),
        move |transition| {
            let _ = done_tx.send(transition);
        },
    );

    let state = super::present(&handle, &extracted, options).await?;

    if let Ok(transition) = done_rx.try_recv() {
        debug!(message = %transition.message_id(), "typing complete");
    }
    if state.phase == RevealPhase::Cancelled {
        anyhow::bail!("Reveal cancelled");
    }

    Ok(())
}
