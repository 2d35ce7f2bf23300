//! TUI chat view

use futures::StreamExt;
use parley_chat::{ChatSession, PatchOutcome, Turn, TurnDriver, TurnOutcome, TurnStream, TurnUpdate};
use parley_tui::{
    Action, Screen, Theme,
    widgets::{InputBox, MessageList, TypingIndicator, message_list::bottom_scroll},
};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};
use std::time::{Duration, Instant};

use crate::commands::{CommandResult, execute_command};

/// What the event loop should do after an action
#[derive(Debug, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
    /// Start streaming this turn
    Send(Turn),
    /// Conversation was reset; drop the turn in flight
    Reset,
}

/// State behind the chat screen
pub struct ChatView {
    session: ChatSession,
    input: InputBox,
    /// First visible transcript line
    scroll: usize,
    /// Keep the newest line in view
    follow: bool,
    theme: Theme,
    status: String,
    /// Help or command feedback shown above the input
    notice: Option<String>,
    model_label: String,
    provider: String,
    spinner_start: Instant,
}

impl ChatView {
    pub fn new(session: ChatSession, model: &str, provider: &str) -> Self {
        Self {
            session,
            input: InputBox::new(),
            scroll: 0,
            follow: true,
            theme: Theme::dark(),
            status: "Ready".to_string(),
            notice: None,
            model_label: display_name(model),
            provider: provider.to_string(),
            spinner_start: Instant::now(),
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn input(&self) -> &InputBox {
        &self.input
    }

    pub fn is_typing(&self) -> bool {
        self.session.is_typing()
    }

    /// Reset to a fresh conversation with an empty, enabled input
    pub fn new_chat(&mut self) {
        self.session.new_chat();
        self.input.clear();
        self.input.set_disabled(false);
        self.notice = None;
        self.scroll = 0;
        self.follow = true;
        self.status = "New chat".to_string();
    }

    pub fn handle_action(&mut self, action: Action, width: u16) -> Control {
        match action {
            Action::Quit | Action::Escape => Control::Quit,
            Action::NewChat => {
                self.new_chat();
                Control::Reset
            }
            Action::Submit => self.submit(),
            Action::ScrollUp(lines) => {
                self.follow = false;
                self.scroll = self.scroll.saturating_sub(lines as usize);
                Control::Continue
            }
            Action::ScrollDown(lines) => {
                // Render clamps this and resumes following at the bottom
                self.scroll = self.scroll.saturating_add(lines as usize);
                Control::Continue
            }
            action => {
                self.input.handle_action(&action, width);
                Control::Continue
            }
        }
    }

    fn submit(&mut self) -> Control {
        if self.session.is_typing() || self.input.is_blank() {
            return Control::Continue;
        }

        if let Some(result) = execute_command(self.input.content()) {
            self.input.clear();
            return match result {
                CommandResult::NewChat => {
                    self.new_chat();
                    Control::Reset
                }
                CommandResult::Exit => Control::Quit,
                CommandResult::Message(text) => {
                    self.notice = Some(text);
                    Control::Continue
                }
                CommandResult::Unknown(name) => {
                    self.notice = Some(format!(
                        "Unknown command: /{name}\nType /help for available commands."
                    ));
                    Control::Continue
                }
            };
        }

        let text = self.input.content().to_string();
        match self.session.submit(&text) {
            Some(turn) => {
                self.input.clear();
                self.input.set_disabled(true);
                self.notice = None;
                self.follow = true;
                self.spinner_start = Instant::now();
                self.status = "Claude is typing...".to_string();
                Control::Send(turn)
            }
            None => Control::Continue,
        }
    }

    /// Apply a streamed update. Returns true once the turn is over.
    pub fn apply_update(&mut self, update: &TurnUpdate) -> bool {
        match self.session.apply(update) {
            PatchOutcome::Applied => false,
            PatchOutcome::Orphaned => false,
            PatchOutcome::Finished(outcome) => {
                self.finish_turn(outcome);
                true
            }
        }
    }

    /// The turn stream ended; fail the turn if it never reported how it went
    pub fn stream_ended(&mut self) {
        if let Some(outcome) = self.session.abandon() {
            self.finish_turn(outcome);
        }
    }

    fn finish_turn(&mut self, outcome: TurnOutcome) {
        self.input.set_disabled(false);
        self.status = match outcome {
            TurnOutcome::Completed => "Ready".to_string(),
            TurnOutcome::Failed(reason) => format!("Last reply failed ({reason:?})"),
        };
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let notice_height = self
            .notice
            .as_ref()
            .map(|n| n.lines().count() as u16 + 2)
            .unwrap_or(0);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),             // Header
                Constraint::Min(1),                // Messages
                Constraint::Length(notice_height), // Notice
                Constraint::Length(1),             // Status
                Constraint::Length(3),             // Input
            ])
            .split(frame.area());

        self.render_header(frame, chunks[0]);
        self.render_messages(frame, chunks[1]);
        if let Some(notice) = &self.notice {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(self.theme.border_style(false));
            frame.render_widget(
                Paragraph::new(notice.as_str())
                    .style(self.theme.dim_style())
                    .block(block),
                chunks[2],
            );
        }
        self.render_status(frame, chunks[3]);
        self.input.render(chunks[4], frame.buffer_mut(), &self.theme);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(self.theme.border_style(false));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let hint = "Ctrl+N: new chat";
        let title = format!(" {}", self.model_label);
        let spacing = (inner.width as usize).saturating_sub(title.chars().count() + hint.len() + 1);

        let lines = vec![
            Line::from(vec![
                Span::styled(title, self.theme.accent_bold()),
                Span::raw(" ".repeat(spacing)),
                Span::styled(hint, self.theme.dim_style()),
            ]),
            Line::from(Span::styled(
                format!(" Powered by {}", self.provider),
                self.theme.dim_style(),
            )),
        ];
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn render_messages(&mut self, frame: &mut Frame, area: Rect) {
        if area.height == 0 || area.width < 2 {
            return;
        }
        // Leave the last column for the scrollbar
        let width = area.width.saturating_sub(1) as usize;
        let list = MessageList::new(self.session.messages(), &self.theme)
            .streaming(self.session.active_placeholder());

        let total = list.height(width);
        let viewport = area.height as usize;
        let bottom = bottom_scroll(total, viewport);
        if self.follow || self.scroll >= bottom {
            self.scroll = bottom;
            self.follow = true;
        }

        let list_area = Rect {
            width: width as u16,
            ..area
        };
        frame.render_widget(list.scroll(self.scroll), list_area);

        if !self.session.has_user_messages() && total < viewport {
            let rest = Rect {
                y: area.y + total as u16,
                height: area.height - total as u16,
                ..list_area
            };
            frame.render_widget(
                Paragraph::new(welcome_lines(&self.theme)).wrap(Wrap { trim: false }),
                rest,
            );
        }

        if total > viewport {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .track_symbol(Some("│"))
                .thumb_symbol("█");
            let mut state = ScrollbarState::new(total)
                .position(self.scroll)
                .viewport_content_length(viewport);
            frame.render_stateful_widget(scrollbar, area, &mut state);
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        if self.session.is_typing() {
            frame.render_widget(
                TypingIndicator::new(&self.status, &self.theme, self.spinner_start),
                area,
            );
        } else {
            frame.render_widget(
                Paragraph::new(Span::styled(format!(" {}", self.status), self.theme.dim_style())),
                area,
            );
        }
    }
}

fn welcome_lines(theme: &Theme) -> Vec<Line<'static>> {
    let key = |k: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("    {k:<12}"), theme.accent_style()),
            Span::styled(what, theme.dim_style()),
        ])
    };
    vec![
        Line::from(Span::styled("  Keybindings", theme.accent_bold())),
        Line::from(""),
        key("Enter", "Send message"),
        key("Ctrl+N", "New chat"),
        key("PgUp/PgDn", "Scroll history"),
        key("Ctrl+C", "Quit"),
        Line::from(""),
        Line::from(Span::styled("  Type /help for commands", theme.dim_style())),
    ]
}

/// Human-readable model name, e.g. `claude-sonnet-4-6` becomes `Claude Sonnet 4.6`
pub fn display_name(model: &str) -> String {
    let parts: Vec<&str> = model
        .split('-')
        .filter(|p| !(p.len() == 8 && p.chars().all(|c| c.is_ascii_digit())))
        .collect();

    fn flush_version(words: &mut Vec<String>, version: &mut Vec<&str>) {
        if !version.is_empty() {
            words.push(version.join("."));
            version.clear();
        }
    }

    let mut words: Vec<String> = Vec::new();
    let mut version: Vec<&str> = Vec::new();

    for part in parts {
        if !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()) {
            version.push(part);
            continue;
        }
        flush_version(&mut words, &mut version);
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            words.push(first.to_uppercase().chain(chars).collect());
        }
    }
    flush_version(&mut words, &mut version);

    words.join(" ")
}

async fn next_update(turn: &mut Option<TurnStream>) -> Option<TurnUpdate> {
    match turn {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

/// Run the TUI until the user quits
pub async fn run_tui(mut view: ChatView, driver: TurnDriver) -> anyhow::Result<()> {
    let mut screen = Screen::enter()?;
    let mut actions = parley_tui::actions();
    let mut turn: Option<TurnStream> = None;

    // Tick interval for the typing indicator
    let mut tick = tokio::time::interval(Duration::from_millis(80));
    let mut width = 0u16;

    loop {
        screen.draw(|frame| {
            width = frame.area().width;
            view.render(frame);
        })?;

        tokio::select! {
            update = next_update(&mut turn) => match update {
                Some(update) => {
                    if view.apply_update(&update) {
                        turn = None;
                    }
                }
                None => {
                    view.stream_ended();
                    turn = None;
                }
            },

            action = actions.next() => match action {
                Some(Ok(action)) => match view.handle_action(action, width) {
                    Control::Continue => {}
                    Control::Quit => break,
                    Control::Send(next) => turn = Some(driver.start(next)),
                    Control::Reset => turn = None,
                },
                Some(Err(e)) => return Err(anyhow::anyhow!("Event error: {}", e)),
                None => break,
            },

            _ = tick.tick(), if view.is_typing() => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_chat::{ERROR_TEXT, FailureReason, GREETING, Role};

    fn view() -> ChatView {
        ChatView::new(ChatSession::default(), "claude-sonnet-4-6", "Anthropic")
    }

    fn type_text(view: &mut ChatView, text: &str) {
        view.handle_action(Action::Paste(text.to_string()), 80);
    }

    fn send(view: &mut ChatView, text: &str) -> Turn {
        type_text(view, text);
        match view.handle_action(Action::Submit, 80) {
            Control::Send(turn) => turn,
            other => panic!("expected a turn, got {other:?}"),
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("claude-sonnet-4-6"), "Claude Sonnet 4.6");
        assert_eq!(display_name("claude-3-7-sonnet-20250219"), "Claude 3.7 Sonnet");
        assert_eq!(display_name("custom"), "Custom");
    }

    #[test]
    fn test_submit_disables_input_until_finished() {
        let mut view = view();
        let turn = send(&mut view, "hello");

        assert!(view.is_typing());
        assert!(view.input().is_disabled());
        assert_eq!(view.input().content(), "");

        // Typing and sending are refused mid-turn
        type_text(&mut view, "again");
        assert_eq!(view.handle_action(Action::Submit, 80), Control::Continue);
        assert_eq!(view.session().messages().len(), 3);

        assert!(!view.apply_update(&TurnUpdate::fragment(turn.placeholder, "Hi!")));
        assert!(view.apply_update(&TurnUpdate::completed(turn.placeholder)));
        assert!(!view.is_typing());
        assert!(!view.input().is_disabled());
        assert_eq!(view.session().messages()[2].content, "Hi!");
    }

    #[test]
    fn test_blank_submit_is_noop() {
        let mut view = view();
        type_text(&mut view, "   ");
        assert_eq!(view.handle_action(Action::Submit, 80), Control::Continue);
        assert_eq!(view.session().messages().len(), 1);
    }

    #[test]
    fn test_new_chat_twice_matches_once() {
        let mut view = view();
        send(&mut view, "hello");
        type_text(&mut view, "draft");

        assert_eq!(view.handle_action(Action::NewChat, 80), Control::Reset);
        assert_eq!(view.handle_action(Action::NewChat, 80), Control::Reset);

        let messages = view.session().messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].content, GREETING);
        assert_eq!(view.input().content(), "");
        assert!(!view.input().is_disabled());
        assert!(!view.is_typing());
    }

    #[test]
    fn test_stale_update_after_reset_is_ignored() {
        let mut view = view();
        let turn = send(&mut view, "hello");
        view.handle_action(Action::NewChat, 80);

        assert!(!view.apply_update(&TurnUpdate::fragment(turn.placeholder, "late")));
        assert_eq!(view.session().messages().len(), 1);
        assert_eq!(view.session().messages()[0].content, GREETING);
    }

    #[test]
    fn test_failed_turn_shows_error_text() {
        let mut view = view();
        let turn = send(&mut view, "hello");
        let update = TurnUpdate {
            target: turn.placeholder,
            kind: parley_chat::UpdateKind::Failed {
                reason: FailureReason::ReadinessTimeout,
                detail: "not ready".into(),
            },
        };

        assert!(view.apply_update(&update));
        assert_eq!(view.session().messages()[2].content, ERROR_TEXT);
        assert!(!view.input().is_disabled());
    }

    #[test]
    fn test_stream_ending_early_releases_input() {
        let mut view = view();
        let turn = send(&mut view, "hello");
        view.apply_update(&TurnUpdate::fragment(turn.placeholder, "Hel"));

        view.stream_ended();

        assert!(!view.is_typing());
        assert!(!view.input().is_disabled());
        assert_eq!(view.session().messages()[2].content, ERROR_TEXT);

        // Nothing in flight: a second call changes nothing
        view.stream_ended();
        assert_eq!(view.session().messages()[2].content, ERROR_TEXT);
    }

    #[test]
    fn test_slash_commands() {
        let mut view = view();
        type_text(&mut view, "/help");
        assert_eq!(view.handle_action(Action::Submit, 80), Control::Continue);
        assert_eq!(view.session().messages().len(), 1);
        assert_eq!(view.input().content(), "");

        type_text(&mut view, "/quit");
        assert_eq!(view.handle_action(Action::Submit, 80), Control::Quit);
    }

    #[test]
    fn test_quit_keys() {
        let mut view = view();
        assert_eq!(view.handle_action(Action::Quit, 80), Control::Quit);
        assert_eq!(view.handle_action(Action::Escape, 80), Control::Quit);
    }
}
