//!
//! fsogate HTTP server
//! -------------------
//! This module defines the Axum-based HTTP surface of the gateway.
//!
//! Responsibilities:
//! - Session management with a cookie + single-use OAuth state model.
//! - Discord login/callback/logout endpoints backed by the `identity` module.
//! - Home, registration and password-change routes delegating to the flow
//!   controller in `server::flow`.
//! - Startup wiring: config, status tables and the identity store are loaded
//!   once here and passed into handlers through `AppState`.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Form, Router,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::fso::FsoClient;
use crate::identity::{DiscordProvider, Identity, PendingStates, Sessions};
use crate::status::StatusMessages;
use crate::store::IdentityStore;

pub mod flow;
pub mod views;

use flow::{PasswordChangeForm, PasswordChangeOutcome, RegisterForm, RegistrationOutcome};

const SESSION_COOKIE: &str = "fsogate_session";

/// Shared server state injected into all handlers.
///
/// Everything here is initialized once in `run_with_config` before the first
/// request is served; nothing is module-level mutable state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub status: Arc<StatusMessages>,
    pub provider: Arc<DiscordProvider>,
    pub fso: Arc<FsoClient>,
    pub store: IdentityStore,
    pub sessions: Arc<Sessions>,
    /// Outstanding OAuth `state` tokens awaiting their callback.
    pub login_states: Arc<PendingStates>,
}

/// Convenience entry point: load configuration from the environment and serve.
pub async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    run_with_config(config).await
}

/// Start the gateway with the given configuration: load the status tables,
/// open (and if needed create) the identity store, wire the provider and API
/// client, and mount all routes.
pub async fn run_with_config(config: Config) -> anyhow::Result<()> {
    let status = match &config.status_file {
        Some(path) => StatusMessages::load(Path::new(path))
            .with_context(|| format!("While loading status messages from {}", path))?,
        None => StatusMessages::builtin(),
    };
    let store = IdentityStore::open(&config.db_path)
        .with_context(|| format!("While opening identity store at {}", config.db_path))?;
    let provider = DiscordProvider::new(
        config.client_id.clone(),
        config.client_secret.clone(),
        config.redirect_uri.clone(),
    );
    let fso = FsoClient::new(config.api_url.clone(), config.registration_key.clone());

    let http_port = config.http_port;
    let state = AppState {
        config: Arc::new(config),
        status: Arc::new(status),
        provider: Arc::new(provider),
        fso: Arc::new(fso),
        store,
        sessions: Arc::new(Sessions::default()),
        login_states: Arc::new(PendingStates::default()),
    };

    let app = router(state);
    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/register", post(register))
        .route("/password", get(password_form))
        .route("/password/change", post(password_change))
        .route("/auth/discord", get(auth_discord))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
        .with_state(state)
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name { return Some(v[1..].to_string()); }
        }
    }
    None
}

fn set_session_cookie(sid: &str) -> HeaderValue {
    // SameSite=Lax (not Strict): the OAuth callback is a cross-site top-level
    // navigation and must still carry the cookie set right after it.
    HeaderValue::from_str(&format!("{}={}; HttpOnly; SameSite=Lax; Path=/", SESSION_COOKIE, sid)).unwrap()
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_str(&format!(
        "{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax; Path=/",
        SESSION_COOKIE
    ))
    .unwrap()
}

fn identity_from_headers(state: &AppState, headers: &HeaderMap) -> Option<Identity> {
    let sid = parse_cookie(headers, SESSION_COOKIE)?;
    state.sessions.validate(&sid)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, views::error_page(self.message())).into_response()
    }
}

async fn home(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let identity = identity_from_headers(&state, &headers);
    let view = flow::home_view(identity.as_ref(), &state.config.guild_id, &state.store).map_err(|e| {
        error!("home view failed: {e}");
        AppError::store("mapping_lookup_failed", "Something went wrong")
    })?;
    Ok(views::home(&view, identity.as_ref()).into_response())
}

async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<RegisterForm>,
) -> Response {
    let identity = identity_from_headers(&state, &headers);
    let outcome = flow::register(
        state.fso.as_ref(),
        &state.store,
        &state.status,
        identity.as_ref(),
        &form,
    )
    .await;
    match (&outcome, identity) {
        (RegistrationOutcome::Unauthenticated, _) => Redirect::to("/").into_response(),
        (_, Some(identity)) => views::registration_outcome(&identity, &outcome).into_response(),
        // register() only returns Unauthenticated for a missing identity
        (_, None) => Redirect::to("/").into_response(),
    }
}

async fn password_form(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let Some(identity) = identity_from_headers(&state, &headers) else {
        return Err(AppError::auth("login_required", "You must be logged in to do that"));
    };
    if !identity.is_member_of(&state.config.guild_id) {
        return Err(AppError::forbidden("guild_required", flow::ACCESS_DENIED_MESSAGE));
    }
    Ok(views::password_form(None).into_response())
}

async fn password_change(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<PasswordChangeForm>,
) -> AppResult<Response> {
    let identity = identity_from_headers(&state, &headers);
    let outcome = flow::change_password(
        state.fso.as_ref(),
        &state.store,
        &state.status,
        &state.config.guild_id,
        identity.as_ref(),
        &form,
    )
    .await;
    match outcome {
        PasswordChangeOutcome::Unauthenticated => {
            Err(AppError::auth("login_required", "You must be logged in to do that"))
        }
        PasswordChangeOutcome::AccessDenied => {
            Err(AppError::forbidden("guild_required", flow::ACCESS_DENIED_MESSAGE))
        }
        PasswordChangeOutcome::NotRegistered => Ok(Redirect::to("/").into_response()),
        outcome => Ok(views::password_change_outcome(&outcome).into_response()),
    }
}

async fn auth_discord(State(state): State<AppState>) -> Redirect {
    let login_state = state.login_states.issue();
    Redirect::to(&state.provider.authorize_url(&login_state))
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

async fn callback(State(state): State<AppState>, Query(query): Query<CallbackQuery>) -> Response {
    // Any failure on this path returns the visitor to the anonymous landing
    // state; there is no retry.
    let (Some(code), Some(login_state)) = (query.code, query.state) else {
        return Redirect::to("/").into_response();
    };
    if !state.login_states.consume(&login_state) {
        info!(target: "auth", "callback with unknown or expired state");
        return Redirect::to("/").into_response();
    }
    let identity = match authenticate(&state, &code).await {
        Ok(identity) => identity,
        Err(e) => {
            error!("discord authentication failed: {e:#}");
            return Redirect::to("/").into_response();
        }
    };
    info!(target: "auth", "login discord_id={} username={}", identity.discord_id, identity.username);
    let sid = state.sessions.issue(identity);
    let mut headers = HeaderMap::new();
    headers.insert("Set-Cookie", set_session_cookie(&sid));
    (headers, Redirect::to("/")).into_response()
}

async fn authenticate(state: &AppState, code: &str) -> anyhow::Result<Identity> {
    let token = state.provider.exchange_code(code).await?;
    state.provider.fetch_identity(&token).await
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(sid) = parse_cookie(&headers, SESSION_COOKIE) {
        if state.sessions.revoke(&sid) {
            info!(target: "auth", "logout");
        }
    }
    let mut h = HeaderMap::new();
    h.insert("Set-Cookie", clear_session_cookie());
    (h, Redirect::to("/")).into_response()
}
