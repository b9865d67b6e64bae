//! Export command - writes a conversation as a Markdown transcript.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

use crate::config::Config;
use crate::message::transcript::{format_transcript, TranscriptOptions};
use crate::message::Conversation;

/// Export `path` to `output`, or stdout when no output is given
pub async fn execute(
    path: &Path,
    output: Option<&Path>,
    title: Option<&str>,
    include_thinking: bool,
    config: &Config,
) -> Result<()> {
    let conversation = Conversation::load(path).await?;

    let title = title.map(str::to_string).unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Conversation".to_string())
    });

    let options = TranscriptOptions {
        include_thinking,
        extract: config.extract_options(),
    };
    let transcript = format_transcript(&title, &conversation, &options);

    match output {
        Some(out) => {
            fs::write(out, &transcript)
                .await
                .with_context(|| format!("Failed to write transcript: {:?}", out))?;
            println!("Transcript written to {}", out.display());
        }
        None => print!("{}", transcript),
    }

    Ok(())
}
