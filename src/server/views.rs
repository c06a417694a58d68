//! Minimal HTML rendering for the gateway's view states. The flow controller
//! decides *what* to show; this module only decides how it looks, and keeps
//! that deliberately small.

use axum::response::Html;

use crate::identity::Identity;
use super::flow::{HomeView, RegistrationOutcome, PasswordChangeOutcome};

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{}</title></head><body>{}</body></html>",
        escape(title),
        body
    ))
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn error_banner(message: Option<&str>) -> String {
    match message {
        Some(m) => format!("<p class=\"error\">{}</p>", escape(m)),
        None => String::new(),
    }
}

pub fn landing() -> Html<String> {
    page(
        "FSO account gateway",
        "<h1>FSO account gateway</h1>\
         <p>Sign in with Discord to register an FSO account or manage an existing one.</p>\
         <p><a href=\"/auth/discord\">Log in with Discord</a></p>",
    )
}

pub fn error_page(message: &str) -> Html<String> {
    page("Error", &format!("<h1>Error</h1>{}", error_banner(Some(message))))
}

pub fn dashboard(identity: &Identity, fso_username: &str) -> Html<String> {
    page(
        "Your FSO account",
        &format!(
            "<h1>Welcome, {}</h1>\
             <p>Your FSO account: <strong>{}</strong></p>\
             <p><a href=\"/password\">Change password</a> | <a href=\"/logout\">Log out</a></p>",
            escape(&identity.username),
            escape(fso_username),
        ),
    )
}

pub fn registration(identity: &Identity, error: Option<&str>) -> Html<String> {
    let email = identity.email.as_deref().unwrap_or("");
    page(
        "Register an FSO account",
        &format!(
            "<h1>Register an FSO account</h1>{}\
             <form method=\"post\" action=\"/register\">\
             <label>Username <input name=\"username\" value=\"{}\"></label>\
             <label>Email <input name=\"email\" type=\"email\" value=\"{}\"></label>\
             <label>Password <input name=\"password\" type=\"password\"></label>\
             <label>Confirm password <input name=\"password_confirmation\" type=\"password\"></label>\
             <button type=\"submit\">Register</button>\
             </form>\
             <p><a href=\"/logout\">Log out</a></p>",
            error_banner(error),
            escape(&identity.username),
            escape(email),
        ),
    )
}

pub fn password_form(error: Option<&str>) -> Html<String> {
    page(
        "Change your FSO password",
        &format!(
            "<h1>Change your FSO password</h1>{}\
             <form method=\"post\" action=\"/password/change\">\
             <label>Current password <input name=\"current_password\" type=\"password\"></label>\
             <label>New password <input name=\"new_password\" type=\"password\"></label>\
             <label>Confirm new password <input name=\"new_password_confirmation\" type=\"password\"></label>\
             <button type=\"submit\">Change password</button>\
             </form>\
             <p><a href=\"/\">Back</a></p>",
            error_banner(error),
        ),
    )
}

pub fn success() -> Html<String> {
    page(
        "Done",
        "<h1>Done</h1><p>Your request was processed successfully.</p><p><a href=\"/\">Back to your account</a></p>",
    )
}

pub fn home(view: &HomeView, identity: Option<&Identity>) -> Html<String> {
    match view {
        HomeView::Landing => landing(),
        HomeView::AccessDenied => error_page(super::flow::ACCESS_DENIED_MESSAGE),
        HomeView::Dashboard { fso_username } => {
            // Dashboard and Registration are only produced for authenticated
            // requests, so an identity is always present here.
            let identity = identity.cloned().unwrap_or_default();
            dashboard(&identity, fso_username)
        }
        HomeView::Registration => {
            let identity = identity.cloned().unwrap_or_default();
            registration(&identity, None)
        }
    }
}

pub fn registration_outcome(identity: &Identity, outcome: &RegistrationOutcome) -> Html<String> {
    match outcome {
        RegistrationOutcome::Success => success(),
        RegistrationOutcome::Rejected { message } => registration(identity, Some(message.as_str())),
        // Unauthenticated is handled by the handler with a redirect.
        RegistrationOutcome::Unauthenticated => landing(),
    }
}

pub fn password_change_outcome(outcome: &PasswordChangeOutcome) -> Html<String> {
    match outcome {
        PasswordChangeOutcome::Success => success(),
        PasswordChangeOutcome::Rejected { message } => password_form(Some(message.as_str())),
        // The remaining variants are handled by the handler layer.
        _ => password_form(None),
    }
}
