//! Terminal presentation of revealed messages.
//!
//! [`render_state`] draws a finished (or partial) reveal in one go: thinking
//! dimmed, text through the Markdown renderer, code blocks through the code
//! view. [`LivePrinter`] follows a running reveal and writes only what is new.

pub mod code_view;
pub mod markdown;

use owo_colors::OwoColorize;
use std::io::{self, Write};

use crate::message::{Extracted, PLACEHOLDER};
use crate::reveal::{Fragment, RevealState};

pub use code_view::{render_code_block, DEFAULT_THEME};
pub use markdown::render_markdown;

/// How to draw to the terminal
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub color: bool,
    /// syntect theme used by the code view
    pub theme: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            color: false,
            theme: DEFAULT_THEME.to_string(),
        }
    }
}

impl RenderOptions {
    /// Color only when stdout is a terminal and the user did not opt out
    pub fn detect(no_color: bool, theme: impl Into<String>) -> Self {
        Self {
            color: !no_color && atty::is(atty::Stream::Stdout),
            theme: theme.into(),
        }
    }
}

const THINK_LABEL: &str = "Thinking…";

fn dim(text: &str, color: bool) -> String {
    if color {
        text.dimmed().italic().to_string()
    } else {
        text.to_string()
    }
}

/// Render a list of fragments, one block per fragment
pub fn render_fragments(fragments: &[Fragment<'_>], options: &RenderOptions) -> String {
    fragments
        .iter()
        .filter_map(|fragment| {
            let rendered = match fragment {
                Fragment::Markdown(text) => render_markdown(text, options.color),
                Fragment::Code(block) => render_code_block(block, &options.theme, options.color),
            };
            (!rendered.is_empty()).then_some(rendered)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render everything disclosed so far
pub fn render_state(state: &RevealState, extracted: &Extracted, options: &RenderOptions) -> String {
    let mut out = String::new();

    if !state.think.is_empty() {
        out.push_str(&dim(THINK_LABEL, options.color));
        out.push('\n');
        out.push_str(&dim(&state.think, options.color));
        out.push_str("\n\n");
    }

    out.push_str(&render_fragments(
        &state.fragments(&extracted.code_blocks),
        options,
    ));
    out
}

/// Incremental writer for a running reveal.
///
/// Text is written raw as it arrives; a placeholder is expanded into the code
/// view of the block it stands for.
pub struct LivePrinter<'a, W: Write> {
    out: W,
    extracted: &'a Extracted,
    options: &'a RenderOptions,
    think_written: usize,
    think_closed: bool,
    text_written: usize,
    blocks_written: usize,
    finished: bool,
}

impl<'a, W: Write> LivePrinter<'a, W> {
    pub fn new(out: W, extracted: &'a Extracted, options: &'a RenderOptions) -> Self {
        Self {
            out,
            extracted,
            options,
            think_written: 0,
            think_closed: false,
            text_written: 0,
            blocks_written: 0,
            finished: false,
        }
    }

    /// Write whatever `state` holds beyond what was written before
    pub fn update(&mut self, state: &RevealState) -> io::Result<()> {
        if state.think.len() > self.think_written {
            if self.think_written == 0 {
                writeln!(self.out, "{}", dim(THINK_LABEL, self.options.color))?;
            }
            let delta = &state.think[self.think_written..];
            write!(self.out, "{}", dim(delta, self.options.color))?;
            self.think_written = state.think.len();
        }

        if state.think_done && self.think_written > 0 && !self.think_closed {
            write!(self.out, "\n\n")?;
            self.think_closed = true;
        }

        if state.text.len() > self.text_written {
            let extracted = self.extracted;
            let delta = &state.text[self.text_written..];
            for (i, ch) in delta.char_indices() {
                let offset = self.text_written + i;
                let block = extracted
                    .code_block(self.blocks_written)
                    .filter(|b| b.offset == offset && ch == PLACEHOLDER);
                match block {
                    Some(block) => {
                        let view =
                            render_code_block(block, &self.options.theme, self.options.color);
                        write!(self.out, "\n{}\n", view)?;
                        self.blocks_written += 1;
                    }
                    None => write!(self.out, "{}", ch)?,
                }
            }
            self.text_written = state.text.len();
        }

        if state.is_finished() && !self.finished {
            writeln!(self.out)?;
            self.finished = true;
        }

        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{extract, ExtractOptions};
    use crate::reveal::RevealPhase;

    fn state(think: &str, text: &str, think_done: bool, phase: RevealPhase) -> RevealState {
        RevealState {
            think: think.to_string(),
            text: text.to_string(),
            think_done,
            phase,
        }
    }

    #[test]
    fn test_render_state_plain() {
        let extracted = extract(
            "<think>hmm</think>**Hi** ```py\nx = 1\n``` bye",
            &ExtractOptions::default(),
        );
        let full = state("hmm", &extracted.text, true, RevealPhase::Complete);

        let rendered = render_state(&full, &extracted, &RenderOptions::default());
        assert_eq!(rendered, "Thinking…\nhmm\n\nHi\n┌─ py ─\n│ x = 1\n└─\nbye");
    }

    #[test]
    fn test_live_printer_writes_deltas() {
        let extracted = extract("<think>ab</think>x ```\nc\n``` y", &ExtractOptions::default());
        let options = RenderOptions::default();
        let mut printer = LivePrinter::new(Vec::new(), &extracted, &options);

        printer.update(&state("a", "", false, RevealPhase::Thinking)).unwrap();
        printer.update(&state("ab", "", false, RevealPhase::Thinking)).unwrap();
        printer.update(&state("ab", "", true, RevealPhase::Writing)).unwrap();
        printer.update(&state("ab", "x ", true, RevealPhase::Writing)).unwrap();
        printer.update(&state("ab", &extracted.text, true, RevealPhase::Writing)).unwrap();
        printer.update(&state("ab", &extracted.text, true, RevealPhase::Complete)).unwrap();
        // A repeated final state writes nothing more.
        printer.update(&state("ab", &extracted.text, true, RevealPhase::Complete)).unwrap();

        let written = String::from_utf8(printer.into_inner()).unwrap();
        assert_eq!(written, "Thinking…\nab\n\nx \n┌─ plaintext ─\n│ c\n└─\n y\n");
    }

    #[test]
    fn test_live_printer_keeps_literal_placeholder() {
        let extracted = extract("a \u{FFFC} b ```\nc\n```", &ExtractOptions::default());
        let options = RenderOptions::default();
        let mut printer = LivePrinter::new(Vec::new(), &extracted, &options);

        let literal_end = "a \u{FFFC}".len();
        printer
            .update(&state("", &extracted.text[..literal_end], true, RevealPhase::Writing))
            .unwrap();
        printer.update(&state("", &extracted.text, true, RevealPhase::Complete)).unwrap();

        let written = String::from_utf8(printer.into_inner()).unwrap();
        assert_eq!(written, "a \u{FFFC} b \n┌─ plaintext ─\n│ c\n└─\n\n");
    }
}
