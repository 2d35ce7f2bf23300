//! Chat capability implementations

pub mod anthropic;

use crate::{Error, Result};

pub use anthropic::AnthropicCapability;

/// Get an API key from the provided value or an environment variable
pub fn get_api_key(provided: Option<&str>, env_var: &str) -> Result<String> {
    if let Some(key) = provided {
        return Ok(key.to_string());
    }

    std::env::var(env_var).map_err(|_| Error::InvalidApiKey)
}
