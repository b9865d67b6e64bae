//! Markdown to terminal text.

use owo_colors::{OwoColorize, Style};
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Inline {
    bold: bool,
    italic: bool,
    strike: bool,
    heading: bool,
    link: bool,
    quote: bool,
}

impl Inline {
    fn style(&self) -> Style {
        let mut style = Style::new();
        if self.bold || self.heading {
            style = style.bold();
        }
        if self.italic {
            style = style.italic();
        }
        if self.strike {
            style = style.strikethrough();
        }
        if self.heading {
            style = style.cyan();
        }
        if self.link {
            style = style.underline().blue();
        }
        if self.quote {
            style = style.dimmed();
        }
        style
    }
}

/// Render a Markdown segment for the terminal.
///
/// Without color the text keeps only the structure: list bullets, headings
/// on their own line, inline code in backticks.
pub fn render_markdown(text: &str, color: bool) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut out = String::new();
    let mut inline = Inline::default();
    // One entry per open list: the next ordinal for ordered lists
    let mut lists: Vec<Option<u64>> = Vec::new();
    let mut link_target: Option<String> = None;

    for event in Parser::new_ext(text, options) {
        match event {
            Event::Start(Tag::Heading { .. }) => inline.heading = true,
            Event::End(TagEnd::Heading(_)) => {
                inline.heading = false;
                out.push_str("\n\n");
            }
            Event::End(TagEnd::Paragraph) => {
                if lists.is_empty() {
                    out.push_str("\n\n");
                }
            }
            Event::Start(Tag::Strong) => inline.bold = true,
            Event::End(TagEnd::Strong) => inline.bold = false,
            Event::Start(Tag::Emphasis) => inline.italic = true,
            Event::End(TagEnd::Emphasis) => inline.italic = false,
            Event::Start(Tag::Strikethrough) => inline.strike = true,
            Event::End(TagEnd::Strikethrough) => inline.strike = false,
            Event::Start(Tag::BlockQuote(_)) => inline.quote = true,
            Event::End(TagEnd::BlockQuote(_)) => inline.quote = false,
            Event::Start(Tag::Link { dest_url, .. }) => {
                inline.link = true;
                link_target = Some(dest_url.to_string());
            }
            Event::End(TagEnd::Link) => {
                inline.link = false;
                if let Some(target) = link_target.take() {
                    if !color {
                        out.push_str(&format!(" ({})", target));
                    }
                }
            }
            Event::Start(Tag::List(start)) => {
                if !lists.is_empty() {
                    out.push('\n');
                }
                lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
                if lists.is_empty() {
                    out.push('\n');
                }
            }
            Event::Start(Tag::Item) => {
                let depth = lists.len().saturating_sub(1);
                out.push_str(&"  ".repeat(depth));
                match lists.last_mut() {
                    Some(Some(n)) => {
                        out.push_str(&format!("{}. ", n));
                        *n += 1;
                    }
                    _ => out.push_str("• "),
                }
            }
            Event::End(TagEnd::Item) => {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Event::TaskListMarker(done) => out.push_str(if done { "[x] " } else { "[ ] " }),
            Event::Code(code) => {
                let code: &str = &code;
                if color {
                    out.push_str(&code.yellow().to_string());
                } else {
                    out.push_str(&format!("`{}`", code));
                }
            }
            Event::Text(text) => push_styled(&mut out, &text, inline, color),
            Event::Html(html) | Event::InlineHtml(html) => out.push_str(&html),
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => out.push_str("────────\n\n"),
            _ => {}
        }
    }

    out.trim_end().to_string()
}

fn push_styled(out: &mut String, text: &str, inline: Inline, color: bool) {
    if color && inline != Inline::default() {
        out.push_str(&text.style(inline.style()).to_string());
    } else {
        out.push_str(text);
    }
}
