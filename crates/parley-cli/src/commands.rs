//! Slash commands for interactive mode

/// Result of executing a slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Start a new conversation
    NewChat,
    /// Show a message to the user (not sent to the model)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command. Returns `None` for ordinary input.
pub fn execute_command(input: &str) -> Option<CommandResult> {
    let command = input.trim().strip_prefix('/')?;
    let name = command
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_lowercase();

    Some(match name.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),
        "new" | "clear" | "c" => CommandResult::NewChat,
        "quit" | "exit" | "q" => CommandResult::Exit,
        _ => CommandResult::Unknown(name),
    })
}

pub fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?        Show this help message
  /new, /clear, /c     Start a new conversation
  /quit, /exit, /q     Exit parley

Keys (TUI):
  Enter                Send message
  Ctrl+N               New chat
  PgUp/PgDn, wheel     Scroll history
  Ctrl+C, Ctrl+Q, Esc  Quit"#
        .to_string()
}
