//! Color theme

use ratatui::style::{Color, Modifier, Style};

/// Colors used by the chat view
#[derive(Debug, Clone)]
pub struct Theme {
    pub bg: Color,
    pub fg: Color,
    /// Secondary text, hints, placeholders
    pub dim: Color,
    /// Header, focused border, typing indicator
    pub accent: Color,
    /// User message label
    pub user: Color,
    /// Assistant message label
    pub assistant: Color,
    pub error: Color,
    pub border: Color,
    pub code: Color,
    pub link: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    /// Dark theme with a purple to blue accent
    pub fn dark() -> Self {
        Self {
            bg: Color::Reset,
            fg: Color::White,
            dim: Color::DarkGray,
            accent: Color::Rgb(147, 112, 219),
            user: Color::Rgb(99, 102, 241),
            assistant: Color::Rgb(168, 85, 247),
            error: Color::Red,
            border: Color::DarkGray,
            code: Color::Magenta,
            link: Color::Blue,
        }
    }

    pub fn base_style(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.dim)
    }

    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.accent)
    }

    pub fn accent_bold(&self) -> Style {
        self.accent_style().add_modifier(Modifier::BOLD)
    }

    pub fn user_label(&self) -> Style {
        Style::default().fg(self.user).add_modifier(Modifier::BOLD)
    }

    pub fn assistant_label(&self) -> Style {
        Style::default()
            .fg(self.assistant)
            .add_modifier(Modifier::BOLD)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn code_style(&self) -> Style {
        Style::default().fg(self.code)
    }

    /// Border style, highlighted when `focused`
    pub fn border_style(&self, focused: bool) -> Style {
        if focused {
            self.accent_style()
        } else {
            Style::default().fg(self.border)
        }
    }
}
