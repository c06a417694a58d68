//! Flow-controller integration tests: home-view states, registration relay
//! and password change across the API and store seams. These exercise
//! positive and negative paths with a recording API double and the real
//! in-memory identity store.

use std::future::Future;
use std::sync::Mutex;

use fsogate::fso::{AccountApi, FsoError};
use fsogate::identity::Identity;
use fsogate::server::flow::{
    self, HomeView, PasswordChangeForm, PasswordChangeOutcome, RegisterForm, RegistrationOutcome,
};
use fsogate::status::StatusMessages;
use fsogate::store::{IdentityMapping, IdentityStore, MappingStore, StoreError};

const GUILD: &str = "999";

/// Records every call and optionally rejects with a fixed API error code.
#[derive(Default)]
struct MockApi {
    reject_with: Option<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl MockApi {
    fn rejecting(code: &'static str) -> Self {
        Self { reject_with: Some(code), calls: Mutex::new(Vec::new()) }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl AccountApi for MockApi {
    fn submit_registration(
        &self,
        username: &str,
        email: &str,
        _password: &str,
    ) -> impl Future<Output = Result<(), FsoError>> + Send {
        self.calls.lock().unwrap().push(format!("registration {} {}", username, email));
        let outcome = self.reject_with.map(|code| FsoError::Api { code: code.to_string() });
        async move {
            match outcome {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    fn submit_password_change(
        &self,
        username: &str,
        _current_password: &str,
        _new_password: &str,
    ) -> impl Future<Output = Result<(), FsoError>> + Send {
        self.calls.lock().unwrap().push(format!("password {}", username));
        let outcome = self.reject_with.map(|code| FsoError::Api { code: code.to_string() });
        async move {
            match outcome {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }
}

/// Reads pass through to a real store; every insert fails as if the write
/// were rejected by the engine.
struct FailingStore(IdentityStore);

impl MappingStore for FailingStore {
    fn find_by_discord_id(&self, discord_id: &str) -> Result<Option<IdentityMapping>, StoreError> {
        self.0.find_by_discord_id(discord_id)
    }

    fn insert(&self, _discord_id: &str, _fso_username: &str) -> Result<IdentityMapping, StoreError> {
        Err(StoreError::Duplicate)
    }
}

fn member(discord_id: &str) -> Identity {
    Identity {
        discord_id: discord_id.into(),
        username: "alpha".into(),
        email: None,
        guilds: vec![GUILD.into()],
    }
}

fn outsider() -> Identity {
    Identity { guilds: vec!["1000".into()], ..member("42") }
}

fn register_form(username: &str, password: &str, confirmation: &str) -> RegisterForm {
    RegisterForm {
        username: username.into(),
        email: None,
        password: password.into(),
        password_confirmation: confirmation.into(),
    }
}

fn password_form(current: &str, new: &str, confirmation: &str) -> PasswordChangeForm {
    PasswordChangeForm {
        current_password: current.into(),
        new_password: new.into(),
        new_password_confirmation: confirmation.into(),
    }
}

#[test]
fn home_renders_landing_when_anonymous() {
    let store = IdentityStore::in_memory().unwrap();
    let view = flow::home_view(None, GUILD, &store).unwrap();
    assert_eq!(view, HomeView::Landing);
}

#[test]
fn home_denies_non_members_without_detail() {
    let store = IdentityStore::in_memory().unwrap();
    let view = flow::home_view(Some(&outsider()), GUILD, &store).unwrap();
    assert_eq!(view, HomeView::AccessDenied);
}

#[tokio::test]
async fn registration_then_dashboard_worked_example() {
    // Subject "42", guild list ["999"], required guild "999", store empty
    let api = MockApi::default();
    let store = IdentityStore::in_memory().unwrap();
    let status = StatusMessages::builtin();
    let identity = member("42");

    let view = flow::home_view(Some(&identity), GUILD, &store).unwrap();
    assert_eq!(view, HomeView::Registration);

    let outcome = flow::register(
        &api,
        &store,
        &status,
        Some(&identity),
        &register_form("alice", "pw1234", "pw1234"),
    )
    .await;
    assert_eq!(outcome, RegistrationOutcome::Success);

    let mapping = store.find_by_discord_id("42").unwrap().unwrap();
    assert_eq!(mapping.discord_id, "42");
    assert_eq!(mapping.fso_username, "alice");

    let view = flow::home_view(Some(&identity), GUILD, &store).unwrap();
    assert_eq!(view, HomeView::Dashboard { fso_username: "alice".into() });
}

#[tokio::test]
async fn registration_synthesizes_email_from_subject_id() {
    let api = MockApi::default();
    let store = IdentityStore::in_memory().unwrap();
    let status = StatusMessages::builtin();

    flow::register(
        &api,
        &store,
        &status,
        Some(&member("42")),
        &register_form("alice", "pw1234", "pw1234"),
    )
    .await;
    assert_eq!(api.calls(), vec!["registration alice 42@discord.invalid".to_string()]);
}

#[tokio::test]
async fn password_mismatch_never_calls_api() {
    let api = MockApi::default();
    let store = IdentityStore::in_memory().unwrap();
    let status = StatusMessages::builtin();

    let outcome = flow::register(
        &api,
        &store,
        &status,
        Some(&member("42")),
        &register_form("alice", "pw1234", "different"),
    )
    .await;
    assert_eq!(
        outcome,
        RegistrationOutcome::Rejected { message: flow::PASSWORD_MISMATCH_MESSAGE.into() }
    );
    assert!(api.calls().is_empty());
    assert!(store.find_by_discord_id("42").unwrap().is_none());
}

#[tokio::test]
async fn api_error_renders_mapped_message() {
    let store = IdentityStore::in_memory().unwrap();
    let status = StatusMessages::builtin();

    let outcome = flow::register(
        &MockApi::rejecting("user_exists"),
        &store,
        &status,
        Some(&member("42")),
        &register_form("alice", "pw1234", "pw1234"),
    )
    .await;
    assert_eq!(
        outcome,
        RegistrationOutcome::Rejected { message: "That username is already registered".into() }
    );

    // Unrecognized codes fall back to the table's "default" entry
    let outcome = flow::register(
        &MockApi::rejecting("no_such_code"),
        &store,
        &status,
        Some(&member("42")),
        &register_form("alice", "pw1234", "pw1234"),
    )
    .await;
    assert_eq!(outcome, RegistrationOutcome::Rejected { message: "Something went wrong".into() });

    // No mapping row is written on any rejected registration
    assert!(store.find_by_discord_id("42").unwrap().is_none());
}

#[tokio::test]
async fn insert_failure_reports_unlinked_and_leaves_no_row() {
    let api = MockApi::default();
    let store = FailingStore(IdentityStore::in_memory().unwrap());
    let status = StatusMessages::builtin();

    let outcome = flow::register(
        &api,
        &store,
        &status,
        Some(&member("42")),
        &register_form("alice", "pw1234", "pw1234"),
    )
    .await;
    // The external account was created; the user is told to contact an
    // operator and no local row exists.
    assert_eq!(
        outcome,
        RegistrationOutcome::Rejected { message: flow::UNLINKED_ACCOUNT_MESSAGE.into() }
    );
    assert_eq!(api.calls().len(), 1);
    assert!(store.0.find_by_discord_id("42").unwrap().is_none());
}

#[tokio::test]
async fn anonymous_register_never_reaches_api_or_store() {
    let api = MockApi::default();
    let store = IdentityStore::in_memory().unwrap();
    let status = StatusMessages::builtin();

    let outcome = flow::register(
        &api,
        &store,
        &status,
        None,
        &register_form("alice", "pw1234", "pw1234"),
    )
    .await;
    assert_eq!(outcome, RegistrationOutcome::Unauthenticated);
    assert!(api.calls().is_empty());
    assert!(store.find_by_discord_id("42").unwrap().is_none());
}

#[tokio::test]
async fn anonymous_password_change_never_reaches_api() {
    let api = MockApi::default();
    let store = IdentityStore::in_memory().unwrap();
    let status = StatusMessages::builtin();

    let outcome = flow::change_password(
        &api,
        &store,
        &status,
        GUILD,
        None,
        &password_form("old", "new", "new"),
    )
    .await;
    assert_eq!(outcome, PasswordChangeOutcome::Unauthenticated);
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn password_change_requires_guild_membership() {
    let api = MockApi::default();
    let store = IdentityStore::in_memory().unwrap();
    let status = StatusMessages::builtin();

    let outcome = flow::change_password(
        &api,
        &store,
        &status,
        GUILD,
        Some(&outsider()),
        &password_form("old", "new", "new"),
    )
    .await;
    assert_eq!(outcome, PasswordChangeOutcome::AccessDenied);
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn password_change_without_mapping_falls_back_to_registration() {
    let api = MockApi::default();
    let store = IdentityStore::in_memory().unwrap();
    let status = StatusMessages::builtin();

    let outcome = flow::change_password(
        &api,
        &store,
        &status,
        GUILD,
        Some(&member("42")),
        &password_form("old", "new", "new"),
    )
    .await;
    assert_eq!(outcome, PasswordChangeOutcome::NotRegistered);
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn password_change_mismatch_never_calls_api() {
    let api = MockApi::default();
    let store = IdentityStore::in_memory().unwrap();
    store.insert("42", "alice").unwrap();
    let status = StatusMessages::builtin();

    let outcome = flow::change_password(
        &api,
        &store,
        &status,
        GUILD,
        Some(&member("42")),
        &password_form("old", "new", "other"),
    )
    .await;
    assert_eq!(
        outcome,
        PasswordChangeOutcome::Rejected { message: flow::PASSWORD_MISMATCH_MESSAGE.into() }
    );
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn password_change_uses_stored_username() {
    let api = MockApi::default();
    let store = IdentityStore::in_memory().unwrap();
    store.insert("42", "alice").unwrap();
    let status = StatusMessages::builtin();

    let outcome = flow::change_password(
        &api,
        &store,
        &status,
        GUILD,
        Some(&member("42")),
        &password_form("old", "new", "new"),
    )
    .await;
    assert_eq!(outcome, PasswordChangeOutcome::Success);
    // The stored fso_username is what gets relayed, not the Discord name
    assert_eq!(api.calls(), vec!["password alice".to_string()]);
    // No local state changes on success
    assert_eq!(store.find_by_discord_id("42").unwrap().unwrap().fso_username, "alice");
}

#[tokio::test]
async fn password_change_api_error_uses_password_reset_table() {
    let store = IdentityStore::in_memory().unwrap();
    store.insert("42", "alice").unwrap();
    let status = StatusMessages::builtin();

    let outcome = flow::change_password(
        &MockApi::rejecting("invalid_password"),
        &store,
        &status,
        GUILD,
        Some(&member("42")),
        &password_form("wrong", "new", "new"),
    )
    .await;
    assert_eq!(
        outcome,
        PasswordChangeOutcome::Rejected { message: "Your current password is incorrect".into() }
    );
}
