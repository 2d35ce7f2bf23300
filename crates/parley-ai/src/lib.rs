//! parley-ai: chat capability abstraction
//!
//! Defines the [`ChatCapability`] seam a hosted chat backend plugs into and
//! ships an Anthropic Messages implementation of it.

pub mod capability;
pub mod error;
pub mod providers;

pub use capability::{ChatCapability, ChatOptions, DEFAULT_MODEL, Fragment, FragmentStream};
pub use error::{Error, Result};
pub use providers::AnthropicCapability;
