//! Re-assembly of revealed text with the code blocks it refers to.

use crate::message::{CodeBlock, PLACEHOLDER};

/// A piece of presentable message content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment<'a> {
    /// Plain text, to be rendered as Markdown
    Markdown(&'a str),
    /// An extracted code block, shown through a code view
    Code(&'a CodeBlock),
}

/// Split revealed text on the placeholders of `code_blocks`.
///
/// Only placeholders the extractor put in are split points; a U+FFFC that was
/// part of the message stays inside its segment. The number of segments minus
/// one is the number of code blocks the reveal cursor has passed.
pub fn split_segments<'a>(revealed: &'a str, code_blocks: &[CodeBlock]) -> Vec<&'a str> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for block in code_blocks {
        let Some(segment) = revealed.get(cursor..block.offset) else {
            break;
        };
        if !block.reached_in(revealed) {
            break;
        }
        segments.push(segment);
        cursor = block.offset + PLACEHOLDER.len_utf8();
    }

    segments.push(&revealed[cursor..]);
    segments
}

/// Number of code blocks reached by the reveal cursor
pub fn code_blocks_reached(revealed: &str, code_blocks: &[CodeBlock]) -> usize {
    split_segments(revealed, code_blocks).len() - 1
}

/// Interleave text segments and code blocks in source order.
///
/// Empty text segments are skipped. Blocks beyond the reveal cursor are left
/// out.
pub fn assemble<'a>(revealed: &'a str, code_blocks: &'a [CodeBlock]) -> Vec<Fragment<'a>> {
    let mut fragments = Vec::new();

    for (index, segment) in split_segments(revealed, code_blocks).into_iter().enumerate() {
        if let Some(block) = index.checked_sub(1).and_then(|i| code_blocks.get(i)) {
            fragments.push(Fragment::Code(block));
        }
        if !segment.is_empty() {
            fragments.push(Fragment::Markdown(segment));
        }
    }

    fragments
}
