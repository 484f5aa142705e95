// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical WhatsApp identity (JID) normalization.
//!
//! Every address entering the system (bare digits, numbers with a leading
//! national zero, fully qualified JIDs) is reduced to one invariant
//! `user@domain` key before it touches storage. The empty string signals
//! "unusable address, ignore this event".

/// Domain for individual contacts.
pub const USER_DOMAIN: &str = "s.whatsapp.net";
/// Domain for group chats.
pub const GROUP_DOMAIN: &str = "g.us";
/// Legacy contact domain, rewritten to [`USER_DOMAIN`].
pub const LEGACY_CONTACT_DOMAIN: &str = "c.us";
/// Domain of temporary linked identifiers issued before the permanent
/// number is disclosed.
pub const LID_DOMAIN: &str = "lid";
/// Domain of broadcast/status pseudo-addresses, never stored as chats.
pub const BROADCAST_DOMAIN: &str = "broadcast";

/// Options controlling [`normalize_jid`].
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Explicit group flag from the caller; `None` means infer from the
    /// address itself.
    pub is_group: Option<bool>,
    /// Country calling code substituted for a leading national "0".
    pub country_prefix: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            is_group: None,
            country_prefix: "62".to_string(),
        }
    }
}

/// Normalize a raw address into its canonical `user@domain` form.
///
/// Returns an empty string for empty or unparseable input.
pub fn normalize_jid(raw: &str, opts: &NormalizeOptions) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    let (user_part, domain_part) = match raw.split_once('@') {
        Some((u, d)) => (u, d),
        None => (raw, ""),
    };

    // Device suffix (`:NN`) is addressing detail, not identity.
    let user_part = user_part.split(':').next().unwrap_or("");
    let user_part = user_part.strip_prefix('+').unwrap_or(user_part);

    let is_group = opts
        .is_group
        .unwrap_or(domain_part == GROUP_DOMAIN || user_part.contains('-'));

    let domain = if domain_part.is_empty() {
        if is_group { GROUP_DOMAIN } else { USER_DOMAIN }
    } else if domain_part == LEGACY_CONTACT_DOMAIN {
        USER_DOMAIN
    } else {
        domain_part
    };

    // Group ids carry hyphens and LIDs are opaque; only individual numbers
    // get digit cleanup and the national-zero rewrite.
    let user = if is_group || domain == LID_DOMAIN {
        user_part.to_string()
    } else {
        let digits: String = user_part.chars().filter(char::is_ascii_digit).collect();
        match digits.strip_prefix('0') {
            Some(rest) if !rest.is_empty() => format!("{}{rest}", opts.country_prefix),
            Some(_) => String::new(),
            None => digits,
        }
    };

    if user.is_empty() || domain.is_empty() {
        return String::new();
    }
    format!("{user}@{domain}")
}

/// The local part of a JID (everything before `@`).
pub fn jid_user(jid: &str) -> &str {
    jid.split('@').next().unwrap_or("")
}

/// Whether a JID uses the temporary linked-identifier domain.
pub fn is_lid(jid: &str) -> bool {
    jid.ends_with(&format!("@{LID_DOMAIN}"))
}

/// Whether a JID is a broadcast/status pseudo-address.
pub fn is_broadcast(jid: &str) -> bool {
    jid.ends_with(&format!("@{BROADCAST_DOMAIN}"))
}

/// Whether a canonical JID addresses a group.
pub fn is_group_jid(jid: &str) -> bool {
    jid.ends_with(&format!("@{GROUP_DOMAIN}"))
}

/// Reduce a raw phone number to bare digits with the country prefix
/// applied, the format the cloud driver sends to.
///
/// Returns an empty string when no digits remain.
pub fn normalize_phone(raw: &str, country_prefix: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.strip_prefix('0') {
        Some(rest) if !rest.is_empty() => format!("{country_prefix}{rest}"),
        Some(_) => String::new(),
        None => digits,
    }
}

/// Append the individual domain to bare digits, the format the socket
/// driver sends to.
pub fn to_socket_destination(digits: &str) -> String {
    format!("{digits}@{USER_DOMAIN}")
}
