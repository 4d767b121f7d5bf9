use axum::http::HeaderValue;
use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};

/// Static allow-list of bearer tokens, loaded once at startup.
pub struct TokenStore {
    tokens: Vec<Box<[u8]>>,
}

impl TokenStore {
    // Parse comma-separated tokens "abc123, def456"
    pub fn from_list(raw: &str) -> Self {
        let mut tokens: Vec<Box<[u8]>> = Vec::new();
        for token in raw.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
            let bytes: Box<[u8]> = token.as_bytes().into();
            if !tokens.contains(&bytes) {
                tokens.push(bytes);
            }
        }
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Constant-time membership check.
    ///
    /// Only entries with the same byte length as `candidate` are compared,
    /// and every one of them is compared; there is no early exit on a match.
    pub fn contains(&self, candidate: &str) -> bool {
        let candidate = candidate.as_bytes();
        let mut found = Choice::from(0u8);
        for token in &self.tokens {
            if token.len() == candidate.len() {
                found |= token[..].ct_eq(candidate);
            }
        }
        found.into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    MissingHeader,
    InvalidFormat,
    NoTokensConfigured,
    TokenNotAllowed,
}

impl AuthFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthFailure::MissingHeader => "missing_header",
            AuthFailure::InvalidFormat => "invalid_format",
            AuthFailure::NoTokensConfigured => "no_tokens_configured",
            AuthFailure::TokenNotAllowed => "token_not_allowed",
        }
    }
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// "Bearer <token>", scheme is case-insensitive
pub fn extract_bearer(value: &str) -> Option<&str> {
    let value = value.trim();
    let (scheme, rest) = value.split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// Checks the `Authorization` header against the allow-list.
pub fn authorize(header: Option<&HeaderValue>, store: &TokenStore) -> Result<(), AuthFailure> {
    let header = header.ok_or(AuthFailure::MissingHeader)?;
    let value = header.to_str().map_err(|_| AuthFailure::InvalidFormat)?;
    let token = extract_bearer(value).ok_or(AuthFailure::InvalidFormat)?;

    tracing::info!(
        token = %mask_token(token),
        fingerprint = %fingerprint(token),
        configured = store.len(),
        "Checking bearer token"
    );

    if store.is_empty() {
        return Err(AuthFailure::NoTokensConfigured);
    }
    if !store.contains(token) {
        return Err(AuthFailure::TokenNotAllowed);
    }
    Ok(())
}

// Keep first 6 and last 4 chars, hide the rest
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 10 {
        return "…".to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

// Short sha256 prefix, lets operators correlate log lines without the secret
fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest[..4].iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(value: &str) -> HeaderValue {
        HeaderValue::from_str(value).unwrap()
    }

    #[test]
    fn token_list_is_trimmed_and_deduplicated() {
        let store = TokenStore::from_list(" abc123 ,,def456, abc123 ,");
        assert_eq!(store.len(), 2);
        assert!(store.contains("abc123"));
        assert!(store.contains("def456"));
        assert!(TokenStore::from_list("").is_empty());
        assert!(TokenStore::from_list(" , ").is_empty());
    }

    #[test]
    fn contains_requires_exact_match() {
        let store = TokenStore::from_list("abc123");
        assert!(!store.contains("abc12"));
        assert!(!store.contains("abc1234"));
        assert!(!store.contains("ABC123"));
        assert!(!store.contains(""));
    }

    #[test]
    fn different_length_tokens_never_match() {
        let store = TokenStore::from_list("abc123,zzzzzzzzzz");
        // prefix of an allowed token, and an allowed token plus suffix
        for candidate in ["a", "abc", "abc12", "abc1234", "zzzzzzzzzzz", "zzzzzzzzz"] {
            assert!(!store.contains(candidate), "{candidate}");
        }
    }

    #[test]
    fn extracts_bearer_case_insensitively() {
        assert_eq!(extract_bearer("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer("bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer("BEARER   abc123  "), Some("abc123"));
        assert_eq!(extract_bearer("Bearer"), None);
        assert_eq!(extract_bearer("Bearer    "), None);
        assert_eq!(extract_bearer("Basic abc123"), None);
        assert_eq!(extract_bearer("abc123"), None);
    }

    #[test]
    fn authorize_reports_each_reason() {
        let store = TokenStore::from_list("abc123");
        assert_eq!(authorize(None, &store), Err(AuthFailure::MissingHeader));
        assert_eq!(
            authorize(Some(&header("Token abc123")), &store),
            Err(AuthFailure::InvalidFormat)
        );
        assert_eq!(
            authorize(Some(&header("Bearer nope00")), &store),
            Err(AuthFailure::TokenNotAllowed)
        );
        assert_eq!(authorize(Some(&header("Bearer abc123")), &store), Ok(()));

        let empty = TokenStore::from_list("");
        assert_eq!(
            authorize(Some(&header("Bearer abc123")), &empty),
            Err(AuthFailure::NoTokensConfigured)
        );
    }

    #[test]
    fn non_ascii_header_is_invalid_format() {
        let store = TokenStore::from_list("abc123");
        let value = HeaderValue::from_bytes(b"Bearer \xffabc").unwrap();
        assert_eq!(authorize(Some(&value), &store), Err(AuthFailure::InvalidFormat));
    }

    #[test]
    fn mask_hides_the_middle() {
        assert_eq!(mask_token("re_abcdefghijklmnop"), "re_abc…mnop");
        assert_eq!(mask_token("abc123"), "…");
        assert_eq!(mask_token("abcdefghijk"), "abcdef…hijk");
    }
}
