use serde::{Deserialize, Serialize};

/// All portal-owned grid state (identities, wallets, user entries) lives under
/// this prefix so it never collides with the user's own resources.
pub const IDENTITY_PREFIX: &str = "jukebox";

/// Per-user consent record, created on first accept.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserEntry {
    pub tname: String,
    pub explorer_url: String,
    #[serde(default)]
    pub has_agreed: bool,
}

/// `alice.3bot` -> `jukebox_alice`. The intermediate identity, wallet and
/// user entry all share this name.
pub fn prefixed_tname(tname: &str) -> String {
    let bare = tname.strip_suffix(".3bot").unwrap_or(tname);
    format!("{IDENTITY_PREFIX}_{bare}")
}

/// `alice@example.com` -> `alice_jukebox@example.com`, so the intermediate
/// identity registers with a distinct address.
pub fn suffixed_email(email: &str) -> String {
    match email.split_once('@') {
        Some((user, domain)) => format!("{user}_{IDENTITY_PREFIX}@{domain}"),
        None => email.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tname_prefixing_strips_3bot_suffix() {
        assert_eq!(prefixed_tname("alice.3bot"), "jukebox_alice");
        assert_eq!(prefixed_tname("bob"), "jukebox_bob");
    }

    #[test]
    fn email_suffixing() {
        assert_eq!(
            suffixed_email("alice@example.com"),
            "alice_jukebox@example.com"
        );
        assert_eq!(suffixed_email("not-an-email"), "not-an-email");
    }
}
