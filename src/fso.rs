//! Client for the FSO user-management API.
//!
//! The gateway never owns credentials; it relays registration and
//! password-change requests as multipart form posts and interprets the
//! API's `{error, error_description}` response shape. API-reported failures
//! and transport failures are distinct variants so the flow controller can
//! map the former through the status tables and show a generic message for
//! the latter. No retries, no timeout beyond the reqwest defaults.

use std::future::Future;

use reqwest::multipart::Form;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FsoError {
    /// The API processed the request and rejected it with an error code.
    #[error("api error: {code}")]
    Api { code: String },

    /// The API could not be reached or returned an unreadable response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    error_description: Option<String>,
}

/// Seam the flow controller is written against; implemented by [`FsoClient`]
/// and by test doubles.
pub trait AccountApi: Send + Sync {
    fn submit_registration(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<(), FsoError>> + Send;

    fn submit_password_change(
        &self,
        username: &str,
        current_password: &str,
        new_password: &str,
    ) -> impl Future<Output = Result<(), FsoError>> + Send;
}

#[derive(Clone)]
pub struct FsoClient {
    http: reqwest::Client,
    base_url: String,
    registration_key: Option<String>,
}

impl FsoClient {
    pub fn new(base_url: impl Into<String>, registration_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            registration_key,
        }
    }

    async fn post_form(&self, path: &str, form: Form) -> Result<(), FsoError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        debug!(target: "fso", "POST {}", url);
        let resp = self.http.post(&url).multipart(form).send().await?;
        let body: ApiResponse = resp.json().await?;
        if body.error {
            let code = body.error_description.unwrap_or_else(|| "default".to_string());
            return Err(FsoError::Api { code });
        }
        Ok(())
    }
}

impl AccountApi for FsoClient {
    fn submit_registration(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<(), FsoError>> + Send {
        let mut form = Form::new()
            .text("username", username.to_string())
            .text("email", email.to_string())
            .text("password", password.to_string());
        if let Some(key) = &self.registration_key {
            form = form.text("key", key.clone());
        }
        async move { self.post_form("userapi/registration", form).await }
    }

    fn submit_password_change(
        &self,
        username: &str,
        current_password: &str,
        new_password: &str,
    ) -> impl Future<Output = Result<(), FsoError>> + Send {
        let form = Form::new()
            .text("username", username.to_string())
            .text("password", current_password.to_string())
            .text("new_password", new_password.to_string());
        async move { self.post_form("userapi/password", form).await }
    }
}
