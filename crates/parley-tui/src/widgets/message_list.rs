//! Conversation transcript widget

use crate::theme::Theme;
use crate::widgets::markdown::render_markdown;
use parley_chat::{Message, MessageId, Role};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

/// Renders the conversation, newest message last
pub struct MessageList<'a> {
    messages: &'a [Message],
    theme: &'a Theme,
    /// Placeholder currently being streamed into
    streaming: Option<MessageId>,
    scroll: usize,
}

impl<'a> MessageList<'a> {
    pub fn new(messages: &'a [Message], theme: &'a Theme) -> Self {
        Self {
            messages,
            theme,
            streaming: None,
            scroll: 0,
        }
    }

    pub fn streaming(mut self, placeholder: Option<MessageId>) -> Self {
        self.streaming = placeholder;
        self
    }

    /// First line to show
    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    /// All lines for the transcript at `width` columns
    pub fn lines(&self, width: usize) -> Vec<Line<'static>> {
        self.messages
            .iter()
            .flat_map(|msg| self.message_lines(msg, width))
            .collect()
    }

    /// Number of lines the transcript takes at `width` columns
    pub fn height(&self, width: usize) -> usize {
        self.lines(width).len()
    }

    fn message_lines(&self, msg: &Message, width: usize) -> Vec<Line<'static>> {
        let streaming = self.streaming == Some(msg.id);
        let failed = msg.is_assistant() && msg.failed;
        let content_width = width.saturating_sub(2);

        let (label, style) = match msg.role {
            Role::User => ("▶ You", self.theme.user_label()),
            Role::Assistant => ("◀ Claude", self.theme.assistant_label()),
        };
        let header = if streaming {
            format!("{label} ▌")
        } else {
            label.to_string()
        };

        let mut lines = vec![Line::from(Span::styled(header, style))];

        let body = match msg.role {
            // Streaming placeholders stay empty until the first fragment;
            // the typing indicator covers that gap.
            Role::Assistant if msg.content.is_empty() => Vec::new(),
            Role::Assistant if failed => plain(&msg.content, self.theme.error_style(), content_width),
            Role::Assistant => render_markdown(&msg.content, self.theme, content_width),
            Role::User => plain(&msg.content, self.theme.base_style(), content_width),
        };
        lines.extend(body.into_iter().map(indent));

        lines.push(Line::from(""));
        lines
    }
}

fn plain(text: &str, style: Style, width: usize) -> Vec<Line<'static>> {
    textwrap::wrap(text, width.max(1))
        .into_iter()
        .map(|line| Line::from(Span::styled(line.into_owned(), style)))
        .collect()
}

fn indent(line: Line<'static>) -> Line<'static> {
    let mut spans = vec![Span::raw("  ")];
    spans.extend(line.spans);
    Line::from(spans)
}

impl Widget for MessageList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let visible: Vec<Line> = self
            .lines(area.width as usize)
            .into_iter()
            .skip(self.scroll)
            .take(area.height as usize)
            .collect();

        Paragraph::new(visible)
            .style(self.theme.base_style())
            .render(area, buf);
    }
}

/// Scroll offset that keeps the last line of the transcript in view
pub fn bottom_scroll(total_lines: usize, viewport: usize) -> usize {
    total_lines.saturating_sub(viewport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_chat::{ChatSession, ERROR_TEXT, Error, TurnUpdate};

    fn reply_style(session: &ChatSession, theme: &Theme) -> Style {
        let lines = MessageList::new(session.messages(), theme).lines(100);
        // greeting and prompt take three lines each, then the reply header
        lines[7].spans[1].style
    }

    #[test]
    fn test_greeting_layout() {
        let session = ChatSession::new("Hi there");
        let theme = Theme::dark();
        let list = MessageList::new(session.messages(), &theme);

        let lines = list.lines(40);
        let text: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        assert_eq!(text, vec!["◀ Claude", "  Hi there", ""]);
        assert_eq!(list.height(40), 3);
    }

    #[test]
    fn test_empty_placeholder_has_no_body() {
        let mut session = ChatSession::new("Hi");
        let turn = session.submit("question").unwrap();
        let theme = Theme::dark();
        let list = MessageList::new(session.messages(), &theme).streaming(Some(turn.placeholder));

        let text: Vec<String> = list.lines(40).iter().map(|l| l.to_string()).collect();
        assert_eq!(
            text,
            vec!["◀ Claude", "  Hi", "", "▶ You", "  question", "", "◀ Claude ▌", ""]
        );
    }

    #[test]
    fn test_height_grows_with_narrow_width() {
        let mut session = ChatSession::new("Hi");
        session.submit("a fairly long question that will need wrapping").unwrap();
        let theme = Theme::dark();
        let list = MessageList::new(session.messages(), &theme);
        assert!(list.height(20) > list.height(200));
    }

    #[test]
    fn test_failed_reply_uses_error_style() {
        let theme = Theme::dark();
        let mut session = ChatSession::new("Hi");
        let turn = session.submit("question").unwrap();
        session.apply(&TurnUpdate::failed(turn.placeholder, &Error::EmptyPrompt));

        assert_eq!(session.messages()[2].content, ERROR_TEXT);
        assert_eq!(reply_style(&session, &theme), theme.error_style());
    }

    #[test]
    fn test_reply_matching_error_text_is_not_error_styled() {
        let theme = Theme::dark();
        let mut session = ChatSession::new("Hi");
        let turn = session.submit("question").unwrap();
        session.apply(&TurnUpdate::fragment(turn.placeholder, ERROR_TEXT));
        session.apply(&TurnUpdate::completed(turn.placeholder));

        assert_eq!(session.messages()[2].content, ERROR_TEXT);
        assert_ne!(reply_style(&session, &theme), theme.error_style());
    }

    #[test]
    fn test_bottom_scroll() {
        assert_eq!(bottom_scroll(50, 20), 30);
        assert_eq!(bottom_scroll(5, 20), 0);
    }
}
