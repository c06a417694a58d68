//! Discord identity and session management for the gateway.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod provider;
mod session;

pub use principal::Identity;
pub use provider::{DiscordProvider, OAUTH_SCOPES};
pub use session::{PendingStates, Sessions};
