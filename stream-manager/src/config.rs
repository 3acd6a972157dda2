//! Configuration for the stream registry and its handles
//!
//! Configuration is plain data with sensible defaults. It can be built with
//! the fluent `with_*` methods or deserialized from JSON, where missing
//! fields fall back to their defaults.

use serde::Deserialize;

use crate::error::{Result, StreamError};

/// What `get_or_create` does when callbacks are supplied for a stream whose
/// handle already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebindPolicy {
    /// Keep the callbacks bound at creation and return the existing handle
    #[default]
    Ignore,
    /// Fail with `StreamError::CallbacksAlreadyBound` when different
    /// callbacks are supplied
    Reject,
}

/// Configuration shared by a registry and every handle it creates
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// MIME type requested from the renderer by `set_src`
    /// Default: "image/jpeg"
    pub frame_mime_type: String,

    /// Behaviour when callbacks are passed for an existing handle
    /// Default: Ignore
    pub rebind_policy: RebindPolicy,

    /// Log a warning when `remove` is called on a handle at refcount zero
    /// Default: true
    pub warn_on_unbalanced_remove: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            frame_mime_type: "image/jpeg".to_string(),
            rebind_policy: RebindPolicy::Ignore,
            warn_on_unbalanced_remove: true,
        }
    }
}

impl ManagerConfig {
    /// Create a new ManagerConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ManagerConfig that rejects callback rebinding
    pub fn strict() -> Self {
        Self {
            rebind_policy: RebindPolicy::Reject,
            ..Default::default()
        }
    }

    /// Parse a configuration from JSON, filling missing fields with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| StreamError::Configuration(format!("Invalid JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        if self.frame_mime_type.trim().is_empty() {
            return Err(StreamError::Configuration(
                "Frame MIME type must not be empty".to_string(),
            ));
        }

        if !self.frame_mime_type.contains('/') {
            return Err(StreamError::Configuration(format!(
                "Frame MIME type '{}' is not of the form type/subtype",
                self.frame_mime_type
            )));
        }

        Ok(())
    }

    pub fn with_frame_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.frame_mime_type = mime_type.into();
        self
    }

    pub fn with_rebind_policy(mut self, policy: RebindPolicy) -> Self {
        self.rebind_policy = policy;
        self
    }

    pub fn with_unbalanced_remove_warning(mut self, enabled: bool) -> Self {
        self.warn_on_unbalanced_remove = enabled;
        self
    }
}
