//! Conversation transcript formatting utilities.

use super::blocks::{ExtractOptions, Extracted};
use super::{Conversation, Message};

/// Options for formatting transcripts
pub struct TranscriptOptions {
    pub include_thinking: bool,
    pub extract: ExtractOptions,
}

impl Default for TranscriptOptions {
    fn default() -> Self {
        Self {
            include_thinking: true,
            extract: ExtractOptions::default(),
        }
    }
}

/// Format a conversation as a markdown transcript
pub fn format_transcript(
    title: &str,
    conversation: &Conversation,
    options: &TranscriptOptions,
) -> String {
    let mut output = String::new();

    // Header
    output.push_str(&format!("# {}\n\n", title));
    output.push_str(&format!("Messages: {}\n", conversation.len()));
    output.push_str(&format!(
        "Exported: {}\n\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    output.push_str("---\n\n");

    for message in conversation.iter() {
        let role = if message.is_from_bot {
            "Assistant"
        } else {
            "User"
        };
        output.push_str(&format!("## {}\n\n", role));
        output.push_str(&format_message_content(message, options));
        output.push_str("\n\n");
    }

    output
}

/// Format one message, thinking first as a blockquote, code re-fenced
fn format_message_content(message: &Message, options: &TranscriptOptions) -> String {
    if !message.is_from_bot {
        return message.content.trim().to_string();
    }

    let extracted = message.extract(&options.extract);
    let mut content = String::new();

    if options.include_thinking {
        if let Some(think) = extracted.think_content().filter(|t| !t.is_empty()) {
            content.push_str("> **Thinking**\n>\n");
            for line in think.lines() {
                if line.is_empty() {
                    content.push_str(">\n");
                } else {
                    content.push_str(&format!("> {}\n", line));
                }
            }
            content.push('\n');
        }
    }

    content.push_str(refence(&extracted).trim());
    content
}

/// Re-emit code blocks as normalized fences with their resolved language
fn refence(extracted: &Extracted) -> String {
    extracted.substitute(|_, block| format!("```{}\n{}\n```", block.language, block.code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_roles_and_code() {
        let mut conversation = Conversation::new();
        conversation.push(Message::user("  show me  "));
        conversation.push(Message::bot(
            "<think>user wants code</think>Here:\n```\nlet x = 1;\n```",
        ));

        let output = format_transcript("Demo", &conversation, &TranscriptOptions::default());

        assert!(output.starts_with("# Demo\n\n"));
        assert!(output.contains("Messages: 2"));
        assert!(output.contains("## User\n\nshow me\n\n"));
        assert!(output.contains("## Assistant\n\n> **Thinking**\n>\n> user wants code\n"));
        assert!(output.contains("Here:\n```plaintext\nlet x = 1;\n```"));
        assert!(!output.contains("<think>"));
    }

    #[test]
    fn test_transcript_without_thinking() {
        let mut conversation = Conversation::new();
        conversation.push(Message::bot("<think>hidden</think>visible"));

        let options = TranscriptOptions {
            include_thinking: false,
            ..Default::default()
        };
        let output = format_transcript("T", &conversation, &options);

        assert!(!output.contains("hidden"));
        assert!(output.contains("## Assistant\n\nvisible"));
    }
}
