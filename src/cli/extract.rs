//! Extract command - shows how a message splits into think, text and code.

use anyhow::{bail, Result};
use std::path::Path;

use crate::config::Config;
use crate::message::{extract, Extracted};

/// Print the extraction of a message in `format` ("text" or "json")
pub async fn execute(file: Option<&Path>, format: &str, config: &Config) -> Result<()> {
    let content = super::read_input(file).await?;
    let extracted = extract(&content, &config.extract_options());

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&extracted)?),
        "text" => print!("{}", format_text(&extracted)),
        other => bail!("Unknown format: {} (expected text or json)", other),
    }

    Ok(())
}

/// Human-readable summary of an extraction
pub fn format_text(extracted: &Extracted) -> String {
    let mut out = String::new();

    match extracted.think_content() {
        Some(think) => out.push_str(&format!("Think:\n{}\n\n", think)),
        None => out.push_str("Think: (none)\n\n"),
    }

    let text = extracted.substitute(|index, _| format!("[code #{}]", index + 1));
    out.push_str(&format!("Text:\n{}\n\n", text));

    out.push_str(&format!("Code blocks: {}\n", extracted.code_blocks.len()));
    for (i, block) in extracted.code_blocks.iter().enumerate() {
        out.push_str(&format!(
            "\n#{} {} ({})\n{}\n",
            i + 1,
            block.language,
            block.id,
            block.code
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ExtractOptions;

    #[test]
    fn test_format_text() {
        let extracted = extract(
            "<think>plan</think>see ```sh\nls\n```",
            &ExtractOptions::default(),
        );
        let id = extracted.code_blocks[0].id.clone();

        let text = format_text(&extracted);
        assert_eq!(
            text,
            format!(
                "Think:\nplan\n\nText:\nsee [code #1]\n\nCode blocks: 1\n\n#1 sh ({})\nls\n",
                id
            )
        );
    }

    #[test]
    fn test_format_text_without_think() {
        let text = format_text(&extract("hello", &ExtractOptions::default()));
        assert!(text.starts_with("Think: (none)\n\nText:\nhello\n\nCode blocks: 0\n"));
    }
}
