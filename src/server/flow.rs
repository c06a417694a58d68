//! Flow controller: the per-request decision logic behind the gateway's
//! routes. Functions here are written against the [`AccountApi`] and
//! [`MappingStore`] seams and return typed view states; the handler layer in
//! `server.rs` turns those states into HTTP responses. Authentication status
//! is an input, so the "anonymous requests never reach the API or the store"
//! rule is enforced (and testable) here rather than in middleware.

use serde::Deserialize;
use tracing::{error, info};

use crate::fso::{AccountApi, FsoError};
use crate::identity::Identity;
use crate::status::{Flow, StatusMessages};
use crate::store::{MappingStore, StoreError};

/// Fixed guild-gate message; deliberately does not distinguish
/// non-membership from a misconfigured guild id.
pub const ACCESS_DENIED_MESSAGE: &str =
    "You must be a member of the Bits & Bytes server to access this page.";
pub const PASSWORD_MISMATCH_MESSAGE: &str = "Passwords do not match";
/// Shown when the external account was created but the local link could not
/// be written. The account exists and is usable; only the dashboard link is
/// missing, and an operator has to restore it by hand.
pub const UNLINKED_ACCOUNT_MESSAGE: &str =
    "Your account was created but could not be linked. Please contact an operator.";
pub const REGISTRATION_TRANSPORT_MESSAGE: &str = "An error occurred during registration";
pub const PASSWORD_TRANSPORT_MESSAGE: &str = "An error occurred while changing your password";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HomeView {
    Landing,
    AccessDenied,
    Dashboard { fso_username: String },
    Registration,
}

/// Decide what `GET /` shows: landing for anonymous visitors, the guild gate
/// for non-members, then dashboard vs registration depending on whether a
/// mapping exists for the subject id.
pub fn home_view<S: MappingStore>(
    identity: Option<&Identity>,
    required_guild: &str,
    store: &S,
) -> Result<HomeView, StoreError> {
    let Some(identity) = identity else {
        return Ok(HomeView::Landing);
    };
    if !identity.is_member_of(required_guild) {
        return Ok(HomeView::AccessDenied);
    }
    match store.find_by_discord_id(&identity.discord_id)? {
        Some(mapping) => Ok(HomeView::Dashboard { fso_username: mapping.fso_username }),
        None => Ok(HomeView::Registration),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Unauthenticated,
    /// Re-render the registration form with this message.
    Rejected { message: String },
    Success,
}

/// Relay a registration to the FSO API and, on success, persist the mapping.
/// The API is only called once the passwords match; the mapping is only
/// written once the API accepts. A store failure after API success is the
/// acknowledged inconsistency window: the remote account exists unlinked and
/// no rollback is attempted.
pub async fn register<A: AccountApi, S: MappingStore>(
    api: &A,
    store: &S,
    status: &StatusMessages,
    identity: Option<&Identity>,
    form: &RegisterForm,
) -> RegistrationOutcome {
    let Some(identity) = identity else {
        return RegistrationOutcome::Unauthenticated;
    };
    if form.password != form.password_confirmation {
        return RegistrationOutcome::Rejected { message: PASSWORD_MISMATCH_MESSAGE.to_string() };
    }

    let email = match form.email.as_deref().map(str::trim) {
        Some(e) if !e.is_empty() => e.to_string(),
        _ => format!("{}@discord.invalid", identity.discord_id),
    };

    if let Err(err) = api.submit_registration(&form.username, &email, &form.password).await {
        return RegistrationOutcome::Rejected {
            message: upstream_message(status, Flow::Registration, &err, REGISTRATION_TRANSPORT_MESSAGE),
        };
    }

    match store.insert(&identity.discord_id, &form.username) {
        Ok(mapping) => {
            info!(target: "flow", "registered discord_id={} fso_username={}", mapping.discord_id, mapping.fso_username);
            RegistrationOutcome::Success
        }
        Err(err) => {
            error!(
                "mapping insert failed after successful registration (discord_id={}): {err}",
                identity.discord_id
            );
            RegistrationOutcome::Rejected { message: UNLINKED_ACCOUNT_MESSAGE.to_string() }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChangeForm {
    pub current_password: String,
    pub new_password: String,
    pub new_password_confirmation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordChangeOutcome {
    Unauthenticated,
    AccessDenied,
    /// No mapping exists for the subject; the handler sends the user back to
    /// `/`, which shows the registration state.
    NotRegistered,
    /// Re-render the password form with this message.
    Rejected { message: String },
    Success,
}

/// Relay a password change for the stored FSO username. Mutates external
/// state only; the mapping row is never touched.
pub async fn change_password<A: AccountApi, S: MappingStore>(
    api: &A,
    store: &S,
    status: &StatusMessages,
    required_guild: &str,
    identity: Option<&Identity>,
    form: &PasswordChangeForm,
) -> PasswordChangeOutcome {
    let Some(identity) = identity else {
        return PasswordChangeOutcome::Unauthenticated;
    };
    if !identity.is_member_of(required_guild) {
        return PasswordChangeOutcome::AccessDenied;
    }
    if form.new_password != form.new_password_confirmation {
        return PasswordChangeOutcome::Rejected { message: PASSWORD_MISMATCH_MESSAGE.to_string() };
    }

    let mapping = match store.find_by_discord_id(&identity.discord_id) {
        Ok(Some(m)) => m,
        Ok(None) => return PasswordChangeOutcome::NotRegistered,
        Err(err) => {
            error!("mapping lookup failed (discord_id={}): {err}", identity.discord_id);
            return PasswordChangeOutcome::Rejected {
                message: crate::status::FALLBACK_MESSAGE.to_string(),
            };
        }
    };

    if let Err(err) = api
        .submit_password_change(&mapping.fso_username, &form.current_password, &form.new_password)
        .await
    {
        return PasswordChangeOutcome::Rejected {
            message: upstream_message(status, Flow::PasswordReset, &err, PASSWORD_TRANSPORT_MESSAGE),
        };
    }
    info!(target: "flow", "password changed fso_username={}", mapping.fso_username);
    PasswordChangeOutcome::Success
}

fn upstream_message(
    status: &StatusMessages,
    flow: Flow,
    err: &FsoError,
    transport_message: &str,
) -> String {
    match err {
        FsoError::Api { code } => status.resolve(flow, code).to_string(),
        FsoError::Transport(e) => {
            error!("account api transport failure: {e}");
            transport_message.to_string()
        }
    }
}
