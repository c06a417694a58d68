use serde::{Deserialize, Serialize};

/// The authenticated identity held by a session: the Discord subject id,
/// profile basics and the guilds the user belongs to. Created on a
/// successful OAuth callback, destroyed on logout or expiry, never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub discord_id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub guilds: Vec<String>,
}

impl Identity {
    pub fn is_member_of(&self, guild_id: &str) -> bool {
        self.guilds.iter().any(|g| g == guild_id)
    }
}
