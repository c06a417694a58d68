use std::collections::HashMap;
use std::time::{Duration, Instant};

use base64::Engine;
use parking_lot::RwLock;

use crate::tprintln;
use super::principal::Identity;

fn gen_id() -> String {
    // 256-bit random token base64url without padding
    let mut buf = [0u8; 32];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

#[derive(Debug)]
struct SessionEntry {
    identity: Identity,
    expires_at: Instant,
}

/// Server-side session map: sid -> identity, expiring after the TTL.
/// Owned by the server state and passed explicitly; no process globals.
pub struct Sessions {
    ttl: Duration,
    entries: RwLock<HashMap<String, SessionEntry>>,
}

impl Default for Sessions {
    fn default() -> Self { Self::new(Duration::from_secs(60 * 60)) }
}

impl Sessions {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: RwLock::new(HashMap::new()) }
    }

    pub fn issue(&self, identity: Identity) -> String {
        let sid = gen_id();
        let entry = SessionEntry { identity, expires_at: Instant::now() + self.ttl };
        tprintln!("session.issue discord_id={} ttl_secs={}", entry.identity.discord_id, self.ttl.as_secs());
        self.entries.write().insert(sid.clone(), entry);
        sid
    }

    pub fn validate(&self, sid: &str) -> Option<Identity> {
        let now = Instant::now();
        let mut drop_key: Option<String> = None;
        let out = {
            let map = self.entries.read();
            match map.get(sid) {
                Some(ent) if ent.expires_at > now => Some(ent.identity.clone()),
                Some(_) => {
                    drop_key = Some(sid.to_string());
                    None
                }
                None => None,
            }
        };
        if let Some(k) = drop_key {
            self.entries.write().remove(&k);
        }
        out
    }

    pub fn revoke(&self, sid: &str) -> bool {
        let removed = self.entries.write().remove(sid).is_some();
        if removed {
            tprintln!("session.revoke sid={}", sid);
        }
        removed
    }
}

/// Single-use OAuth `state` tokens issued when the login redirect is built
/// and consumed on the callback. Entries expire so abandoned logins do not
/// accumulate.
pub struct PendingStates {
    ttl: Duration,
    entries: RwLock<HashMap<String, Instant>>,
}

impl Default for PendingStates {
    fn default() -> Self { Self::new(Duration::from_secs(10 * 60)) }
}

impl PendingStates {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: RwLock::new(HashMap::new()) }
    }

    pub fn issue(&self) -> String {
        let state = gen_id();
        self.entries.write().insert(state.clone(), Instant::now() + self.ttl);
        state
    }

    /// Returns true exactly once per issued, unexpired state.
    pub fn consume(&self, state: &str) -> bool {
        match self.entries.write().remove(state) {
            Some(expires_at) => expires_at > Instant::now(),
            None => false,
        }
    }
}
