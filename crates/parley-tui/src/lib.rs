//! parley-tui: terminal widgets for the chat view
//!
//! Built on ratatui and crossterm. The widgets read `parley_chat` types
//! directly; the event loop that ties them together lives in the binary.

pub mod app;
pub mod input;
pub mod theme;
pub mod widgets;

pub use app::{Screen, actions};
pub use input::Action;
pub use theme::Theme;
