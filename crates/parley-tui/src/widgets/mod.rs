//! Widgets for the chat view

pub mod input_box;
pub mod markdown;
pub mod message_list;
pub mod typing_indicator;

pub use input_box::InputBox;
pub use message_list::MessageList;
pub use typing_indicator::TypingIndicator;
