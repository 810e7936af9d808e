//! HMAC-SHA256 signed bearer tokens.
//!
//! Token format: `base64url(user_id|expires_unix_secs|username|hex(hmac))`.
//! The signature covers everything before the last separator, binding the
//! subject to an expiry so a token can be neither forged nor replayed past
//! its lifetime.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::AuthError;
use crate::Subject;

type HmacSha256 = Hmac<Sha256>;

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Issues and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    ttl_secs: u64,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"<redacted>")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

impl TokenSigner {
    pub fn new(secret: impl Into<Vec<u8>>, ttl_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs,
        }
    }

    /// A signer with a random 32-byte secret. Tokens do not survive a restart.
    pub fn random(ttl_secs: u64) -> Self {
        let secret: [u8; 32] = rand::random();
        Self::new(secret.to_vec(), ttl_secs)
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC key length is valid")
    }

    /// Issues a token for `subject`, valid for the configured lifetime.
    pub fn issue(&self, subject: &Subject) -> String {
        self.issue_at(subject, unix_now())
    }

    fn issue_at(&self, subject: &Subject, now_secs: u64) -> String {
        let expires = now_secs.saturating_add(self.ttl_secs);
        let payload = format!("{}|{}|{}", subject.user_id, expires, subject.username);

        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        let signature = mac.finalize().into_bytes();

        let token = format!("{}|{}", payload, hex::encode(signature));
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(token.as_bytes())
    }

    /// Verifies a token and returns its subject.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] for malformed or forged tokens and
    /// [`AuthError::TokenExpired`] once the lifetime has elapsed.
    pub fn verify(&self, token: &str) -> Result<Subject, AuthError> {
        self.verify_at(token, unix_now())
    }

    fn verify_at(&self, token: &str, now_secs: u64) -> Result<Subject, AuthError> {
        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(token.as_bytes())
            .map_err(|_| AuthError::InvalidToken)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthError::InvalidToken)?;

        let (payload, sig_hex) = decoded.rsplit_once('|').ok_or(AuthError::InvalidToken)?;
        let provided = hex::decode(sig_hex).map_err(|_| AuthError::InvalidToken)?;

        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&provided)
            .map_err(|_| AuthError::InvalidToken)?;

        let mut parts = payload.splitn(3, '|');
        let (Some(user_id), Some(expires), Some(username)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::InvalidToken);
        };
        let expires: u64 = expires.parse().map_err(|_| AuthError::InvalidToken)?;
        if now_secs > expires {
            return Err(AuthError::TokenExpired);
        }

        Ok(Subject {
            user_id: user_id.to_string(),
            username: username.to_string(),
        })
    }
}
