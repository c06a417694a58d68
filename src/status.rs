//! User-facing messages for errors reported by the FSO user API.
//!
//! The API identifies failures by an `error_description` code; this module
//! maps those codes to the text shown on the originating form. Messages are
//! keyed first by flow (registration vs password reset), then by code, with a
//! per-flow "default" entry. Deployments can override the built-in table by
//! pointing FSOGATE_STATUS_FILE at a status.json with the same two-level
//! shape. Loaded once at startup and handed to the flow controller.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Shown when the table has no entry at all for the flow or code.
pub const FALLBACK_MESSAGE: &str = "Something went wrong";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Registration,
    PasswordReset,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusMessages {
    #[serde(default)]
    pub registration_errors: HashMap<String, String>,
    #[serde(default)]
    pub password_reset_errors: HashMap<String, String>,
}

impl StatusMessages {
    /// Built-in table matching the codes the FSO user API is known to emit.
    pub fn builtin() -> Self {
        let mut registration_errors = HashMap::new();
        registration_errors.insert("user_exists".to_string(), "That username is already registered".to_string());
        registration_errors.insert("email_exists".to_string(), "An account with that email address already exists".to_string());
        registration_errors.insert("invalid_username".to_string(), "Usernames may only contain letters, numbers and underscores".to_string());
        registration_errors.insert("invalid_email".to_string(), "That email address does not look valid".to_string());
        registration_errors.insert("weak_password".to_string(), "That password is too short".to_string());
        registration_errors.insert("invalid_key".to_string(), "Registration is currently closed".to_string());
        registration_errors.insert("default".to_string(), "Something went wrong".to_string());

        let mut password_reset_errors = HashMap::new();
        password_reset_errors.insert("invalid_password".to_string(), "Your current password is incorrect".to_string());
        password_reset_errors.insert("user_not_found".to_string(), "No account with that username exists".to_string());
        password_reset_errors.insert("weak_password".to_string(), "That password is too short".to_string());
        password_reset_errors.insert("default".to_string(), "Something went wrong".to_string());

        Self { registration_errors, password_reset_errors }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read status messages from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Malformed status messages in {}", path.display()))
    }

    /// Resolve an API error code to its user-facing message. Unknown codes
    /// fall back to the flow's "default" entry, then to [`FALLBACK_MESSAGE`].
    pub fn resolve(&self, flow: Flow, code: &str) -> &str {
        let table = match flow {
            Flow::Registration => &self.registration_errors,
            Flow::PasswordReset => &self.password_reset_errors,
        };
        table
            .get(code)
            .or_else(|| table.get("default"))
            .map(|s| s.as_str())
            .unwrap_or(FALLBACK_MESSAGE)
    }
}
