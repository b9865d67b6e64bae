//! Code block view with syntax highlighting.

use std::sync::LazyLock;
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

use crate::message::CodeBlock;

pub const DEFAULT_THEME: &str = "base16-ocean.dark";

// Syntax highlighting resources (loaded once)
static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Whether `name` is one of the bundled highlighting themes
pub fn is_known_theme(name: &str) -> bool {
    THEME_SET.themes.contains_key(name)
}

/// Render a code block as a framed view, highlighted when `color` is set
pub fn render_code_block(block: &CodeBlock, theme: &str, color: bool) -> String {
    let mut out = format!("┌─ {} ─\n", block.language);

    let highlighted = if color {
        highlight(&block.code, &block.language, theme)
    } else {
        None
    };

    match highlighted {
        Some(text) => out.push_str(&text),
        None => {
            for line in block.code.lines() {
                out.push_str("│ ");
                out.push_str(line);
                out.push('\n');
            }
        }
    }

    out.push_str("└─");
    out
}

fn highlight(code: &str, language: &str, theme: &str) -> Option<String> {
    let syntax = SYNTAX_SET
        .find_syntax_by_token(language)
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());
    let theme = THEME_SET
        .themes
        .get(theme)
        .or_else(|| THEME_SET.themes.get(DEFAULT_THEME))?;

    let mut highlighter = HighlightLines::new(syntax, theme);
    let mut out = String::new();

    for line in LinesWithEndings::from(code) {
        let ranges = highlighter.highlight_line(line, &SYNTAX_SET).ok()?;
        out.push_str("│ ");
        out.push_str(&as_24_bit_terminal_escaped(&ranges[..], false));
        out.push_str("\x1b[0m");
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(language: &str, code: &str) -> CodeBlock {
        CodeBlock {
            id: "cod_test".to_string(),
            language: language.to_string(),
            code: code.to_string(),
            raw: String::new(),
            offset: 0,
        }
    }

    #[test]
    fn test_plain_view() {
        let code = block("rust", "fn a() {}\nfn b() {}");
        let rendered = render_code_block(&code, DEFAULT_THEME, false);
        assert_eq!(rendered, "┌─ rust ─\n│ fn a() {}\n│ fn b() {}\n└─");
    }

    #[test]
    fn test_highlighted_view() {
        let rendered = render_code_block(&block("rs", "let x = 1;"), DEFAULT_THEME, true);
        assert!(rendered.starts_with("┌─ rs ─\n│ "));
        assert!(rendered.contains("\x1b[38;2;"));
        assert!(rendered.ends_with("\n└─"));
    }

    #[test]
    fn test_unknown_language_and_theme_fall_back() {
        let rendered = render_code_block(&block("nosuchlang", "text"), "no-such-theme", true);
        assert!(rendered.contains("text"));
        assert!(is_known_theme(DEFAULT_THEME));
        assert!(!is_known_theme("no-such-theme"));
    }

    #[test]
    fn test_empty_block() {
        assert_eq!(
            render_code_block(&block("js", ""), DEFAULT_THEME, false),
            "┌─ js ─\n└─"
        );
    }
}
