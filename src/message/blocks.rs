//! Think-segment and code-fence extraction.
//!
//! A bot reply may carry one `<think>...</think>` segment and any number of
//! fenced code blocks. [`extract`] pulls them out with two linear scanners and
//! leaves a single [`PLACEHOLDER`] character where each fence used to be, so
//! the reveal cursor can never stop half-way through a token.
//!
//! Malformed input is never an error: an unterminated delimiter simply does
//! not match and stays in the text as literal characters.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::id::{self, IdPrefix};

/// Stand-in for an extracted code block inside the remaining text
pub const PLACEHOLDER: char = '\u{FFFC}';

const FENCE: &str = "```";

/// Knobs for the extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub think_open: String,
    pub think_close: String,
    /// Language label used when a fence carries no tag
    pub fallback_language: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            think_open: "<think>".to_string(),
            think_close: "</think>".to_string(),
            fallback_language: "plaintext".to_string(),
        }
    }
}

/// The reasoning segment of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinkBlock {
    /// Trimmed inner text
    pub content: String,
    /// Delimited source, delimiters included
    pub raw: String,
    /// Byte offset in the think-less text where `raw` was removed
    pub offset: usize,
}

/// A fenced code segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub id: String,
    pub language: String,
    /// Trimmed body
    pub code: String,
    /// Fenced source, fences included
    pub raw: String,
    /// Byte offset of this block's placeholder in [`Extracted::text`]
    pub offset: usize,
}

impl CodeBlock {
    /// Whether this block's placeholder lies inside `text`, a prefix of the
    /// extracted text.
    pub fn reached_in(&self, text: &str) -> bool {
        text.get(self.offset..).is_some_and(|rest| rest.starts_with(PLACEHOLDER))
    }
}

/// Result of running the extractor over one message
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Extracted {
    pub think: Option<ThinkBlock>,
    /// Message text without the think segment, code fences replaced by [`PLACEHOLDER`]
    pub text: String,
    pub code_blocks: Vec<CodeBlock>,
}

impl Extracted {
    pub fn has_think(&self) -> bool {
        self.think.is_some()
    }

    pub fn think_content(&self) -> Option<&str> {
        self.think.as_ref().map(|t| t.content.as_str())
    }

    pub fn code_block(&self, index: usize) -> Option<&CodeBlock> {
        self.code_blocks.get(index)
    }

    /// Rebuild the text with each block's placeholder replaced by `f(index, block)`.
    ///
    /// Blocks are matched by offset, so a U+FFFC that was already part of the
    /// message stays as it is.
    pub fn substitute(&self, mut f: impl FnMut(usize, &CodeBlock) -> String) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut cursor = 0;

        for (index, block) in self.code_blocks.iter().enumerate() {
            let Some(before) = self.text.get(cursor..block.offset) else {
                break;
            };
            if !block.reached_in(&self.text) {
                break;
            }
            out.push_str(before);
            out.push_str(&f(index, block));
            cursor = block.offset + PLACEHOLDER.len_utf8();
        }

        out.push_str(&self.text[cursor..]);
        out
    }

    /// Rebuild the exact text the extraction was produced from.
    pub fn restore(&self) -> String {
        let mut restored = self.substitute(|_, block| block.raw.clone());

        if let Some(think) = &self.think {
            let offset = think.offset.min(restored.len());
            restored.insert_str(offset, &think.raw);
        }

        restored
    }
}

/// Split a raw message into its think segment, code blocks and remaining text.
pub fn extract(text: &str, options: &ExtractOptions) -> Extracted {
    let (think, rest) = match find_think(text, &options.think_open, &options.think_close) {
        Some((think, rest)) => (Some(think), rest),
        None => (None, text.to_string()),
    };

    let (text, code_blocks) = replace_code_fences(&rest, &options.fallback_language);

    debug!(
        think = think.is_some(),
        code_blocks = code_blocks.len(),
        "extracted message blocks"
    );

    Extracted {
        think,
        text,
        code_blocks,
    }
}

/// Locate the first complete think segment.
///
/// Only the first opener is considered: if it has no closer after it, no later
/// opener can have one either.
fn find_think(text: &str, open: &str, close: &str) -> Option<(ThinkBlock, String)> {
    if open.is_empty() || close.is_empty() {
        return None;
    }

    let start = text.find(open)?;
    let inner_start = start + open.len();
    let inner_len = text[inner_start..].find(close)?;
    let inner_end = inner_start + inner_len;
    let end = inner_end + close.len();

    let think = ThinkBlock {
        content: text[inner_start..inner_end].trim().to_string(),
        raw: text[start..end].to_string(),
        offset: start,
    };

    let mut rest = String::with_capacity(text.len() - think.raw.len());
    rest.push_str(&text[..start]);
    rest.push_str(&text[end..]);

    Some((think, rest))
}

/// Replace every well-formed fence with [`PLACEHOLDER`], left to right.
fn replace_code_fences(text: &str, fallback_language: &str) -> (String, Vec<CodeBlock>) {
    let mut output = String::with_capacity(text.len());
    let mut blocks = Vec::new();
    let mut copied = 0;
    let mut cursor = 0;

    while let Some(found) = text[cursor..].find(FENCE) {
        let open = cursor + found;

        match match_fence(text, open) {
            FenceMatch::Block {
                language,
                body,
                end,
            } => {
                output.push_str(&text[copied..open]);
                let offset = output.len();
                output.push(PLACEHOLDER);
                blocks.push(CodeBlock {
                    id: id::ascending(IdPrefix::Code),
                    language: language
                        .filter(|l| !l.is_empty())
                        .unwrap_or(fallback_language)
                        .to_string(),
                    code: body.trim().to_string(),
                    raw: text[open..end].to_string(),
                    offset,
                });
                copied = end;
                cursor = end;
            }
            // Retry one character later, like an unanchored pattern would.
            FenceMatch::NoHeader => cursor = open + 1,
            FenceMatch::Unterminated => break,
        }
    }

    output.push_str(&text[copied..]);
    (output, blocks)
}

enum FenceMatch<'a> {
    Block {
        language: Option<&'a str>,
        body: &'a str,
        end: usize,
    },
    /// The opening run is not followed by `tag? newline`
    NoHeader,
    /// Header is fine but no closing run follows
    Unterminated,
}

fn match_fence(text: &str, open: usize) -> FenceMatch<'_> {
    let after_open = open + FENCE.len();
    let header = &text[after_open..];

    let tag_len = header
        .find(|c: char| !is_language_char(c))
        .unwrap_or(header.len());
    let language = &header[..tag_len];

    let padding = header[tag_len..]
        .find(|c: char| !matches!(c, ' ' | '\t' | '\r'))
        .unwrap_or(header.len() - tag_len);
    let newline_at = tag_len + padding;
    if !header[newline_at..].starts_with('\n') {
        return FenceMatch::NoHeader;
    }

    let body_start = after_open + newline_at + 1;
    match text[body_start..].find(FENCE) {
        Some(len) => FenceMatch::Block {
            language: (!language.is_empty()).then_some(language),
            body: &text[body_start..body_start + len],
            end: body_start + len + FENCE.len(),
        },
        None => FenceMatch::Unterminated,
    }
}

fn is_language_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '+' | '-' | '#' | '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(text: &str) -> Extracted {
        extract(text, &ExtractOptions::default())
    }

    #[test]
    fn test_extract_think_segment() {
        let extracted = run("<think>  plan it  </think>Answer");

        let think = extracted.think.as_ref().unwrap();
        assert_eq!(think.content, "plan it");
        assert_eq!(think.offset, 0);
        assert_eq!(extracted.text, "Answer");
        assert!(extracted.code_blocks.is_empty());
    }

    #[test]
    fn test_no_think_segment() {
        let extracted = run("just text");
        assert!(!extracted.has_think());
        assert_eq!(extracted.text, "just text");
    }

    #[test]
    fn test_unterminated_think_is_literal() {
        let extracted = run("<think>never closed");
        assert!(extracted.think.is_none());
        assert_eq!(extracted.text, "<think>never closed");
    }

    #[test]
    fn test_only_first_think_segment_is_taken() {
        let extracted = run("<think>a</think>mid<think>b</think>end");

        assert_eq!(extracted.think_content(), Some("a"));
        assert_eq!(extracted.text, "mid<think>b</think>end");
    }

    #[test]
    fn test_code_fence_split() {
        let extracted = run("before ```js\ncode\n``` after");

        assert_eq!(extracted.text, format!("before {} after", PLACEHOLDER));
        assert_eq!(extracted.code_blocks.len(), 1);
        assert_eq!(extracted.code_blocks[0].language, "js");
        assert_eq!(extracted.code_blocks[0].code, "code");
        assert!(extracted.code_blocks[0].id.starts_with("cod_"));
    }

    #[test]
    fn test_code_fences_in_order_with_fallback_language() {
        let extracted = run("a\n```\nplain\n```\nb\n```rust\nfn main() {}\n```\nc");

        let langs: Vec<_> = extracted
            .code_blocks
            .iter()
            .map(|b| (b.language.as_str(), b.code.as_str()))
            .collect();
        assert_eq!(langs, vec![("plaintext", "plain"), ("rust", "fn main() {}")]);
        assert_eq!(
            extracted.text,
            format!("a\n{}\nb\n{}\nc", PLACEHOLDER, PLACEHOLDER)
        );
    }

    #[test]
    fn test_custom_fallback_language() {
        let options = ExtractOptions {
            fallback_language: "javascript".to_string(),
            ..Default::default()
        };
        let extracted = extract("```\nx\n```", &options);
        assert_eq!(extracted.code_blocks[0].language, "javascript");
    }

    #[test]
    fn test_empty_code_body_is_kept() {
        let extracted = run("```python\n```");
        assert_eq!(extracted.code_blocks.len(), 1);
        assert_eq!(extracted.code_blocks[0].code, "");
        assert_eq!(extracted.code_blocks[0].language, "python");
    }

    #[test]
    fn test_fence_without_newline_is_literal() {
        let extracted = run("inline ```code``` here");
        assert!(extracted.code_blocks.is_empty());
        assert_eq!(extracted.text, "inline ```code``` here");
    }

    #[test]
    fn test_unterminated_fence_is_literal() {
        let extracted = run("x ```js\nnever closed");
        assert!(extracted.code_blocks.is_empty());
        assert_eq!(extracted.text, "x ```js\nnever closed");
    }

    #[test]
    fn test_longer_fence_closes_at_first_run() {
        let extracted = run("````\ncode\n````");

        assert_eq!(extracted.code_blocks.len(), 1);
        assert_eq!(extracted.code_blocks[0].code, "code");
        assert_eq!(extracted.text, format!("`{}`", PLACEHOLDER));
    }

    #[test]
    fn test_language_tag_with_symbols_and_crlf() {
        let extracted = run("```c++ \r\nint x;\r\n```");
        assert_eq!(extracted.code_blocks[0].language, "c++");
        assert_eq!(extracted.code_blocks[0].code, "int x;");
    }

    #[test]
    fn test_code_inside_think_stays_in_think() {
        let extracted = run("<think>```js\nx\n```</think>done");
        assert!(extracted.code_blocks.is_empty());
        assert_eq!(extracted.think_content(), Some("```js\nx\n```"));
    }

    #[test]
    fn test_restore_is_lossless() {
        let inputs = [
            "",
            "plain",
            "<think>X</think>YZ",
            "lead <think> a </think> tail ```rs\nfn a() {}\n``` and ```\n```",
            "<think>open only",
            "```js no newline```",
            "<think>a</think>b<think>c</think>",
            "héllo <think>ünï</think> ```py\nprint('ß')\n```",
            "obj \u{FFFC} then ```js\ncode\n``` end",
            "\u{FFFC}```\na\n```\u{FFFC}```\nb\n```\u{FFFC}",
        ];

        for input in inputs {
            assert_eq!(run(input).restore(), input, "input: {:?}", input);
        }
    }

    #[test]
    fn test_literal_placeholder_keeps_block_offsets() {
        let extracted = run("obj \u{FFFC} then ```js\ncode\n``` end");

        assert_eq!(extracted.code_blocks.len(), 1);
        let block = &extracted.code_blocks[0];
        assert_eq!(block.offset, "obj \u{FFFC} then ".len());
        assert!(block.reached_in(&extracted.text));
        assert!(!block.reached_in("obj \u{FFFC} then "));

        let labelled = extracted.substitute(|i, b| format!("[{} {}]", i, b.language));
        assert_eq!(labelled, "obj \u{FFFC} then [0 js] end");
    }

    #[test]
    fn test_custom_think_delimiters() {
        let options = ExtractOptions {
            think_open: "[[".to_string(),
            think_close: "]]".to_string(),
            ..Default::default()
        };
        let extracted = extract("[[idea]]rest", &options);
        assert_eq!(extracted.think_content(), Some("idea"));
        assert_eq!(extracted.text, "rest");
    }
}
