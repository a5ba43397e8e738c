//! Wingman Token - HMAC-signed single-use capability tokens
//!
//! A capability token binds one approved request to one command scope
//! for a short window. Tokens are compact strings
//! `wgt1.<kid>.<claims>.<sig>` where claims are base64url JSON and the
//! signature is HMAC-SHA256 over the claims segment. The kid segment
//! selects the signing key so rotation can honor the previous key
//! during an overlap window. A token is consumed on presentation.
#![deny(unsafe_code)]

mod key;
mod replay;
mod service;

pub use key::{KeySet, SigningKey};
pub use replay::ReplayGuard;
pub use service::{token_hash, TokenError, TokenService, DEFAULT_TTL_SECS};
