//! Discord OAuth2 authorization-code flow: authorize URL construction, code
//! exchange and profile/guild retrieval. Endpoints are overridable so tests
//! can point the provider at a stub server.

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::debug;

use super::principal::Identity;

const DISCORD_AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";
const DISCORD_TOKEN_URL: &str = "https://discord.com/api/oauth2/token";
const DISCORD_API_BASE: &str = "https://discord.com/api";

/// Scopes requested from Discord: profile, email and the guild list used as
/// the authorization gate.
pub const OAUTH_SCOPES: &str = "identify email guilds";

#[derive(Clone)]
pub struct DiscordProvider {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    authorize_url: String,
    token_url: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
    username: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GuildPayload {
    id: String,
}

impl DiscordProvider {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
            redirect_uri,
            authorize_url: DISCORD_AUTHORIZE_URL.to_string(),
            token_url: DISCORD_TOKEN_URL.to_string(),
            api_base: DISCORD_API_BASE.to_string(),
        }
    }

    /// Point the provider at non-default endpoints (stub servers in tests).
    pub fn with_endpoints(mut self, authorize_url: String, token_url: String, api_base: String) -> Self {
        self.authorize_url = authorize_url;
        self.token_url = token_url;
        self.api_base = api_base;
        self
    }

    /// The URL the browser is redirected to so Discord can authenticate the
    /// user. `state` is single-use and verified on the callback.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            self.authorize_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(OAUTH_SCOPES),
            urlencoding::encode(state),
        )
    }

    /// Exchange the authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let resp = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .context("token endpoint unreachable")?;
        if !resp.status().is_success() {
            return Err(anyhow!("token exchange rejected with status {}", resp.status()));
        }
        let tok: TokenResponse = resp.json().await.context("malformed token response")?;
        Ok(tok.access_token)
    }

    /// Fetch the user's profile and guild list with the access token.
    pub async fn fetch_identity(&self, access_token: &str) -> Result<Identity> {
        let me: UserPayload = self.get_json("/users/@me", access_token).await?;
        let guilds: Vec<GuildPayload> = self.get_json("/users/@me/guilds", access_token).await?;
        debug!(target: "auth", "fetched identity discord_id={} guilds={}", me.id, guilds.len());
        Ok(Identity {
            discord_id: me.id,
            username: me.username,
            email: me.email,
            guilds: guilds.into_iter().map(|g| g.id).collect(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str, token: &str) -> Result<T> {
        let url = format!("{}{}", self.api_base.trim_end_matches('/'), path);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("provider request failed: {}", path))?;
        if !resp.status().is_success() {
            return Err(anyhow!("provider returned status {} for {}", resp.status(), path));
        }
        resp.json::<T>()
            .await
            .with_context(|| format!("malformed provider response: {}", path))
    }
}
