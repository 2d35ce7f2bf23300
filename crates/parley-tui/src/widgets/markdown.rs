//! Markdown rendering for assistant replies

use crate::theme::Theme;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Render markdown into lines no wider than `width` columns.
///
/// Text is word-wrapped; code blocks are not, and their long lines end in `…`.
pub fn render_markdown(text: &str, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut out = Renderer {
        lines: Vec::new(),
        current: Vec::new(),
        width,
    };
    let mut style = theme.base_style();
    let mut code_block: Option<String> = None;
    let mut list_depth: usize = 0;

    for event in Parser::new(text) {
        match event {
            Event::Start(tag) => match tag {
                Tag::Heading { level, .. } => {
                    out.flush();
                    style = match level {
                        HeadingLevel::H1 => theme
                            .accent_style()
                            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                        HeadingLevel::H2 => theme.accent_bold(),
                        _ => theme.accent_style(),
                    };
                }
                Tag::Paragraph => out.flush(),
                Tag::CodeBlock(_) => {
                    out.flush();
                    code_block = Some(String::new());
                }
                Tag::List(_) => list_depth += 1,
                Tag::Item => {
                    out.flush();
                    let indent = "  ".repeat(list_depth.saturating_sub(1));
                    out.current
                        .push(Span::styled(format!("{indent}• "), theme.dim_style()));
                }
                Tag::Emphasis => style = style.add_modifier(Modifier::ITALIC),
                Tag::Strong => style = style.add_modifier(Modifier::BOLD),
                Tag::Strikethrough => style = style.add_modifier(Modifier::CROSSED_OUT),
                Tag::Link { .. } => style = Style::default().fg(theme.link),
                _ => {}
            },
            Event::End(tag) => match tag {
                TagEnd::Heading(_) => {
                    out.flush();
                    style = theme.base_style();
                }
                TagEnd::Paragraph => {
                    out.flush();
                    out.blank();
                }
                TagEnd::CodeBlock => {
                    let code = code_block.take().unwrap_or_default();
                    let code_style = theme.code_style().add_modifier(Modifier::DIM);
                    for line in code.lines() {
                        let line = truncate(line, width.saturating_sub(2));
                        out.lines
                            .push(Line::from(Span::styled(format!("  {line}"), code_style)));
                    }
                    out.blank();
                }
                TagEnd::List(_) => {
                    list_depth = list_depth.saturating_sub(1);
                    if list_depth == 0 {
                        out.blank();
                    }
                }
                TagEnd::Item => out.flush(),
                TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                    style = theme.base_style();
                }
                _ => {}
            },
            Event::Text(text) => match code_block.as_mut() {
                Some(code) => code.push_str(&text),
                None => out.current.push(Span::styled(text.into_string(), style)),
            },
            Event::Code(code) => {
                out.current.push(Span::styled(
                    format!("`{code}`"),
                    theme.code_style().add_modifier(Modifier::BOLD),
                ));
            }
            Event::SoftBreak => out.current.push(Span::styled(" ", style)),
            Event::HardBreak => out.flush(),
            _ => {}
        }
    }
    out.flush();

    let mut lines = out.lines;
    while lines.last().is_some_and(|l| l.width() == 0) {
        lines.pop();
    }
    lines
}

struct Renderer {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    width: usize,
}

impl Renderer {
    fn flush(&mut self) {
        if !self.current.is_empty() {
            let spans = std::mem::take(&mut self.current);
            self.lines.extend(wrap_spans(spans, self.width));
        }
    }

    fn blank(&mut self) {
        self.lines.push(Line::from(""));
    }
}

/// Word-wrap styled spans to `width` columns, splitting overlong words
pub fn wrap_spans(spans: Vec<Span<'static>>, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut line: Vec<Span<'static>> = Vec::new();
    let mut used = 0;

    for span in spans {
        let style = span.style;
        for word in span.content.split_inclusive(' ') {
            let mut word = word;
            if used > 0 && used + word.trim_end().width() > width {
                lines.push(Line::from(std::mem::take(&mut line)));
                used = 0;
                word = word.trim_start();
            }
            // Hard-break words that cannot fit on any line
            while word.trim_end().width() > width {
                let (head, tail) = match split_at_width(word, width) {
                    ("", _) => split_first_char(word),
                    split => split,
                };
                line.push(Span::styled(head.to_string(), style));
                lines.push(Line::from(std::mem::take(&mut line)));
                used = 0;
                word = tail;
            }
            if !word.is_empty() {
                used += word.width();
                line.push(Span::styled(word.to_string(), style));
            }
        }
    }
    if !line.is_empty() {
        lines.push(Line::from(line));
    }
    lines
}

fn split_at_width(s: &str, width: usize) -> (&str, &str) {
    let mut used = 0;
    for (i, c) in s.char_indices() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            return s.split_at(i);
        }
        used += w;
    }
    (s, "")
}

fn split_first_char(s: &str) -> (&str, &str) {
    match s.char_indices().nth(1) {
        Some((i, _)) => s.split_at(i),
        None => (s, ""),
    }
}

fn truncate(line: &str, width: usize) -> String {
    if line.width() <= width {
        return line.to_string();
    }
    let (head, _) = split_at_width(line, width.saturating_sub(1));
    format!("{head}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_simple_text() {
        let lines = render_markdown("Hello, world!", &Theme::dark(), 80);
        assert_eq!(plain(&lines), vec!["Hello, world!"]);
    }

    #[test]
    fn test_paragraph_wraps_to_width() {
        let lines = render_markdown("one two three four", &Theme::dark(), 9);
        assert_eq!(plain(&lines), vec!["one two ", "three ", "four"]);
        assert!(lines.iter().all(|l| l.width() <= 9));
    }

    #[test]
    fn test_code_block_truncated_not_wrapped() {
        let md = "```\nlet café = \"a very long line of code\";\n```";
        let lines = render_markdown(md, &Theme::dark(), 12);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].width() <= 12);
        assert!(plain(&lines)[0].ends_with('…'));
    }

    #[test]
    fn test_long_word_hard_breaks() {
        let lines = wrap_spans(vec![Span::raw("abcdefghij")], 4);
        assert_eq!(plain(&lines), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_list_items() {
        let lines = render_markdown("- a\n- b", &Theme::dark(), 80);
        assert_eq!(plain(&lines), vec!["• a", "• b"]);
    }
}
