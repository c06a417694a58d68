//! Process configuration loaded once at startup from the environment and
//! passed explicitly into the server, provider and API client.

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Discord OAuth application client id.
    pub client_id: String,
    /// Discord OAuth application client secret.
    pub client_secret: String,
    /// Redirect URI registered with the OAuth application; must point at /callback.
    pub redirect_uri: String,
    /// Guild the user must be a member of to use the gateway.
    pub guild_id: String,
    /// Base URL of the FSO user-management API.
    pub api_url: String,
    /// Optional registration key forwarded to the FSO API on registration.
    pub registration_key: Option<String>,
    pub http_port: u16,
    /// Path of the SQLite identity-mapping database.
    pub db_path: String,
    /// Optional path of a status.json overriding the built-in error messages.
    pub status_file: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            client_id: required("FSOGATE_CLIENT_ID")?,
            client_secret: required("FSOGATE_CLIENT_SECRET")?,
            redirect_uri: required("FSOGATE_REDIRECT_URI")?,
            guild_id: required("FSOGATE_GUILD_ID")?,
            api_url: required("FSOGATE_API_URL")?,
            registration_key: optional("FSOGATE_REGISTRATION_KEY"),
            http_port: optional("FSOGATE_HTTP_PORT")
                .map(|s| s.parse::<u16>().with_context(|| format!("FSOGATE_HTTP_PORT is not a port number: {}", s)))
                .transpose()?
                .unwrap_or(3000),
            db_path: optional("FSOGATE_DB_PATH").unwrap_or_else(|| "fsogate.db".to_string()),
            status_file: optional("FSOGATE_STATUS_FILE"),
        })
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("missing required environment variable {}", name))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
