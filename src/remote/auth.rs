//! Bearer tokens for the remote service.
//!
//! Token acquisition belongs to the session layer outside this crate. The
//! client only asks a [`TokenSource`] for whatever token is valid right now and
//! sends the request unauthenticated when there is none.

use std::fmt;

use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};

/// Supplies the currently valid bearer token, if any.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<SecretString>;
}

/// A token held in memory, replaceable at runtime (login/logout).
#[derive(Default)]
pub struct StaticToken {
    token: RwLock<Option<SecretString>>,
}

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(
                token
                    .filter(|t| !t.trim().is_empty())
                    .map(SecretString::from),
            ),
        }
    }

    pub fn set(&self, token: Option<String>) {
        *self.token.write() = token
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);
    }

    pub fn is_present(&self) -> bool {
        self.token.read().is_some()
    }
}

impl TokenSource for StaticToken {
    fn bearer_token(&self) -> Option<SecretString> {
        self.token.read().clone()
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticToken")
            .field("token", &self.token.read().as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// `Authorization` header value for a token.
pub(crate) fn bearer_header(token: &SecretString) -> String {
    format!("Bearer {}", token.expose_secret())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_token_counts_as_absent() {
        assert!(!StaticToken::new(Some("   ".to_string())).is_present());
        assert!(!StaticToken::new(None).is_present());
        assert!(StaticToken::new(Some("abc".to_string())).is_present());
    }

    #[test]
    fn test_set_replaces_token() {
        let source = StaticToken::new(None);
        source.set(Some("t1".to_string()));
        assert_eq!(
            source.bearer_token().map(|t| bearer_header(&t)),
            Some("Bearer t1".to_string())
        );
        source.set(None);
        assert!(source.bearer_token().is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let source = StaticToken::new(Some("super-secret".to_string()));
        let debug = format!("{source:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
