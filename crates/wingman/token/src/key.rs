//! Named HMAC keys with rotation support

/// A named HMAC key for signing and verifying tokens.
#[derive(Debug, Clone)]
pub struct SigningKey {
    /// Key identifier carried in the token envelope.
    pub kid: String,
    /// Raw HMAC secret bytes.
    pub secret: Vec<u8>,
}

/// Ordered set of HMAC keys. Index 0 is the current signing key; the
/// rest are still accepted for verification during rotation overlap.
#[derive(Debug, Clone)]
pub struct KeySet {
    keys: Vec<SigningKey>,
}

impl KeySet {
    /// Panics if `keys` is empty. A token service without a key cannot
    /// sign anything and must not start.
    pub fn new(keys: Vec<SigningKey>) -> Self {
        assert!(!keys.is_empty(), "KeySet must have at least one key");
        Self { keys }
    }

    /// Key set from a single secret, kid `k0`.
    pub fn from_single(secret: Vec<u8>) -> Self {
        Self {
            keys: vec![SigningKey {
                kid: "k0".into(),
                secret,
            }],
        }
    }

    /// The current signing key.
    pub fn current(&self) -> &SigningKey {
        &self.keys[0]
    }

    /// Look up a key by its kid.
    pub fn get(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}
