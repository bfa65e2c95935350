//! Identity verification for mutating requests.
//!
//! Callers present `Authorization: Bearer <token>`. The header is parsed
//! here; the token itself is checked by an [`IdentityVerifier`].
//!
//! ## Token Format
//!
//! [`TokenValidator`] issues tokens of three dot-separated parts:
//! - hex-encoded subject
//! - expiry (Unix millis, decimal)
//! - hex-encoded HMAC-SHA256 over the first two parts joined by `.`

use crate::error::{ServerError, ServerResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// A verified caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Who the caller is.
    pub subject: String,
    /// When the credential expires (Unix millis), if it does.
    pub expires_at_millis: Option<u64>,
}

impl Identity {
    /// The identity used when authentication is disabled.
    pub fn anonymous() -> Self {
        Self {
            subject: "anonymous".to_string(),
            expires_at_millis: None,
        }
    }
}

/// Verifies a bearer credential.
pub trait IdentityVerifier: Send + Sync {
    /// Returns the verified identity, or [`ServerError::Unauthorized`].
    fn verify(&self, token: &str) -> ServerResult<Identity>;

    /// Whether requests must carry a credential at all.
    fn requires_credential(&self) -> bool {
        true
    }
}

/// Extracts the token from an `Authorization` header value.
///
/// # Errors
///
/// Returns [`ServerError::Unauthorized`] if the header is missing or is not
/// exactly `Bearer <token>`.
pub fn parse_bearer(header: Option<&str>) -> ServerResult<&str> {
    let header = header.ok_or_else(|| {
        ServerError::Unauthorized("No authorization header provided".into())
    })?;

    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(ServerError::Unauthorized(
            "Invalid authorization header format. Use: Bearer <token>".into(),
        )),
    }
}

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// Secret key for HMAC.
    pub secret: Zeroizing<Vec<u8>>,
    /// Token lifetime.
    pub token_expiry: Duration,
}

impl AuthConfig {
    /// Creates a new auth configuration.
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret: Zeroizing::new(secret),
            token_expiry: Duration::from_secs(60 * 60), // 1 hour
        }
    }

    /// Sets the token lifetime.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.token_expiry = expiry;
        self
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("token_expiry", &self.token_expiry)
            .finish()
    }
}

/// Issues and validates HMAC-signed bearer tokens.
#[derive(Clone, Debug)]
pub struct TokenValidator {
    config: AuthConfig,
}

impl TokenValidator {
    /// Creates a new token validator.
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Issues a token for `subject` expiring after the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Internal`] if the secret cannot key the MAC.
    pub fn issue_token(&self, subject: &str) -> ServerResult<String> {
        let expiry_millis = self.config.token_expiry.as_millis() as u64;
        self.issue_token_until(subject, now_millis().saturating_add(expiry_millis))
    }

    /// Issues a token for `subject` expiring at `expires_at_millis`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Internal`] if the secret cannot key the MAC.
    pub fn issue_token_until(
        &self,
        subject: &str,
        expires_at_millis: u64,
    ) -> ServerResult<String> {
        let claims = format!("{}.{}", hex_encode(subject.as_bytes()), expires_at_millis);
        let signature = hex_encode(&self.mac(claims.as_bytes())?.finalize().into_bytes());
        Ok(format!("{claims}.{signature}"))
    }

    fn mac(&self, data: &[u8]) -> ServerResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.config.secret)
            .map_err(|e| ServerError::Internal(format!("invalid HMAC key: {e}")))?;
        mac.update(data);
        Ok(mac)
    }
}

impl IdentityVerifier for TokenValidator {
    fn verify(&self, token: &str) -> ServerResult<Identity> {
        let parts: Vec<&str> = token.split('.').collect();
        let [subject_hex, expiry, signature_hex] = parts.as_slice() else {
            return Err(ServerError::Unauthorized("Invalid token format".into()));
        };

        let signature = hex_decode(signature_hex)
            .ok_or_else(|| ServerError::Unauthorized("Invalid token format".into()))?;
        let claims = format!("{subject_hex}.{expiry}");
        self.mac(claims.as_bytes())?
            .verify_slice(&signature)
            .map_err(|_| ServerError::Unauthorized("Invalid token".into()))?;

        let expires_at_millis: u64 = expiry
            .parse()
            .map_err(|_| ServerError::Unauthorized("Invalid token format".into()))?;
        if now_millis() >= expires_at_millis {
            return Err(ServerError::Unauthorized("Token has expired".into()));
        }

        let subject = hex_decode(subject_hex)
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| ServerError::Unauthorized("Invalid token format".into()))?;

        Ok(Identity {
            subject,
            expires_at_millis: Some(expires_at_millis),
        })
    }
}

/// Verifier that accepts exactly one shared secret.
/// Useful for testing.
#[derive(Clone)]
pub struct StaticTokenVerifier {
    secret: Zeroizing<String>,
    subject: String,
}

impl StaticTokenVerifier {
    /// Creates a verifier accepting `secret` as the caller `subject`.
    pub fn new(secret: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
            subject: subject.into(),
        }
    }
}

impl IdentityVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> ServerResult<Identity> {
        if token == self.secret.as_str() {
            Ok(Identity {
                subject: self.subject.clone(),
                expires_at_millis: None,
            })
        } else {
            Err(ServerError::Unauthorized("Invalid token".into()))
        }
    }
}

/// Verifier used when authentication is disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnonymousVerifier;

impl IdentityVerifier for AnonymousVerifier {
    fn verify(&self, _token: &str) -> ServerResult<Identity> {
        Ok(Identity::anonymous())
    }

    fn requires_credential(&self) -> bool {
        false
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> TokenValidator {
        TokenValidator::new(AuthConfig::new(b"test-secret-key-32-bytes-long!!".to_vec()))
    }

    #[test]
    fn parse_bearer_header() {
        assert_eq!(parse_bearer(Some("Bearer abc")).unwrap(), "abc");
        assert!(parse_bearer(None).is_err());
        assert!(parse_bearer(Some("Basic abc")).is_err());
        assert!(parse_bearer(Some("Bearer")).is_err());
        assert!(parse_bearer(Some("Bearer ")).is_err());
        assert!(parse_bearer(Some("Bearer a b")).is_err());
    }

    #[test]
    fn issue_and_verify_token() {
        let validator = validator();
        let token = validator.issue_token("alice@example.com").unwrap();

        let identity = validator.verify(&token).unwrap();
        assert_eq!(identity.subject, "alice@example.com");
        assert!(identity.expires_at_millis.is_some());
    }

    #[test]
    fn subject_with_dots_survives() {
        let validator = validator();
        let token = validator.issue_token("a.b.c").unwrap();
        assert_eq!(validator.verify(&token).unwrap().subject, "a.b.c");
    }

    #[test]
    fn reject_tampered_token() {
        let validator = validator();
        let token = validator.issue_token("alice").unwrap();
        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        parts[0] = hex_encode(b"mallory");
        let forged = parts.join(".");

        assert!(matches!(
            validator.verify(&forged),
            Err(ServerError::Unauthorized(_))
        ));
    }

    #[test]
    fn reject_other_secret() {
        let token = validator().issue_token("alice").unwrap();
        let other = TokenValidator::new(AuthConfig::new(b"another-secret".to_vec()));
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn reject_expired_token() {
        let validator = validator();
        let token = validator
            .issue_token_until("alice", now_millis().saturating_sub(1))
            .unwrap();
        let err = validator.verify(&token).unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn reject_malformed_token() {
        let validator = validator();
        for token in ["", "abc", "a.b", "a.b.c.d", "zz.1.zz", "61.x.00"] {
            assert!(validator.verify(token).is_err(), "{token}");
        }
    }

    #[test]
    fn any_key_length_signs_and_verifies() {
        for secret in [Vec::new(), vec![7u8; 1], vec![7u8; 200]] {
            let validator = TokenValidator::new(AuthConfig::new(secret));
            let token = validator.issue_token("alice").unwrap();
            assert_eq!(validator.verify(&token).unwrap().subject, "alice");
            assert!(matches!(
                validator.verify("61.1.00"),
                Err(ServerError::Unauthorized(_))
            ));
        }
    }

    #[test]
    fn static_verifier() {
        let verifier = StaticTokenVerifier::new("shared-secret", "tester");
        assert_eq!(verifier.verify("shared-secret").unwrap().subject, "tester");
        assert!(verifier.verify("wrong-secret").is_err());
    }

    #[test]
    fn anonymous_verifier_needs_no_credential() {
        assert!(!AnonymousVerifier.requires_credential());
        assert_eq!(AnonymousVerifier.verify("").unwrap(), Identity::anonymous());
    }

    #[test]
    fn auth_config_debug_redacts_secret() {
        let config = AuthConfig::new(b"super-secret".to_vec());
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}
