//! Token minting and verification

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;
use wingman_types::{DeploymentEnv, TokenClaims};

use crate::key::KeySet;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TTL_SECS: i64 = 600;

const ENVELOPE_PREFIX: &str = "wgt1";

/// Reasons a presented token is refused. Messages never echo the token
/// or any claim values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("unknown signing key")]
    UnknownKey,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("missing required claim: {0}")]
    MissingClaim(&'static str),
}

/// SHA-256 of the full token string, hex encoded. This is what audit
/// records store; the token itself is never persisted.
pub fn token_hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}

/// Signs and verifies capability tokens against a rotating key set.
pub struct TokenService {
    keys: KeySet,
    ttl_secs: i64,
}

impl TokenService {
    pub fn new(keys: KeySet, ttl_secs: i64) -> Self {
        let ttl_secs = if ttl_secs <= 0 {
            DEFAULT_TTL_SECS
        } else {
            ttl_secs
        };
        Self { keys, ttl_secs }
    }

    pub fn with_secret(secret: impl Into<Vec<u8>>) -> Self {
        Self::new(KeySet::from_single(secret.into()), DEFAULT_TTL_SECS)
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    fn sign(secret: &[u8], payload: &str) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(secret).expect("HMAC accepts any key size");
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Mints a signed token for an approved request. Returns the
    /// compact token string and the claims it carries.
    pub fn mint(
        &self,
        approval_id: &str,
        worker_id: &str,
        environment: DeploymentEnv,
        allowed_commands: Vec<String>,
    ) -> Result<(String, TokenClaims), TokenError> {
        let claims = TokenClaims::new(
            approval_id.to_string(),
            worker_id.to_string(),
            environment,
            allowed_commands,
            self.ttl_secs,
        );
        let payload = serde_json::to_string(&claims).map_err(|_| TokenError::Malformed)?;
        let encoded = URL_SAFE_NO_PAD.encode(payload.as_bytes());

        let key = self.keys.current();
        let sig = URL_SAFE_NO_PAD.encode(Self::sign(&key.secret, &encoded));

        let token = format!("{ENVELOPE_PREFIX}.{}.{encoded}.{sig}", key.kid);
        tracing::debug!(jti = %claims.jti, kid = %key.kid, "capability token minted");
        Ok((token, claims))
    }

    /// Verifies signature, envelope shape, required claims, and expiry.
    /// Replay is the caller's concern; see [`crate::ReplayGuard`].
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let mut parts = token.split('.');
        let (prefix, kid, encoded, sig) = match (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) {
            (Some(prefix), Some(kid), Some(encoded), Some(sig), None) => {
                (prefix, kid, encoded, sig)
            }
            _ => return Err(TokenError::Malformed),
        };
        if prefix != ENVELOPE_PREFIX {
            return Err(TokenError::Malformed);
        }

        let key = self.keys.get(kid).ok_or(TokenError::UnknownKey)?;
        let presented = URL_SAFE_NO_PAD
            .decode(sig.as_bytes())
            .map_err(|_| TokenError::Malformed)?;
        let expected = Self::sign(&key.secret, encoded);
        if !constant_time_eq(&presented, &expected) {
            return Err(TokenError::InvalidSignature);
        }

        let payload = URL_SAFE_NO_PAD
            .decode(encoded.as_bytes())
            .map_err(|_| TokenError::Malformed)?;
        let claims: TokenClaims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if claims.jti.is_empty() {
            return Err(TokenError::MissingClaim("jti"));
        }
        if claims.approval_id.is_empty() {
            return Err(TokenError::MissingClaim("approval_id"));
        }
        if claims.worker_id.is_empty() {
            return Err(TokenError::MissingClaim("worker_id"));
        }
        if claims.is_expired(now) {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
