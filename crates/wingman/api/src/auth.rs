//! Role-scoped header authorization
//!
//! Three keys guard three endpoint groups; a legacy key is accepted
//! for any of them. An unset key leaves its group unauthenticated,
//! which config validation forbids in prd.

use axum::http::HeaderMap;

use crate::config::RoleKeys;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Request,
    Read,
    Decide,
}

impl Role {
    pub fn header(&self) -> &'static str {
        match self {
            Role::Request => "x-wingman-approval-request-key",
            Role::Read => "x-wingman-approval-read-key",
            Role::Decide => "x-wingman-approval-decide-key",
        }
    }
}

pub const LEGACY_HEADER: &str = "x-wingman-approval-key";

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}

/// Checks the role header (or the legacy header) against the
/// configured keys. Error text never includes the presented value.
pub fn authorize(keys: &RoleKeys, headers: &HeaderMap, role: Role) -> Result<(), ApiError> {
    let expected = match role {
        Role::Request => &keys.request,
        Role::Read => &keys.read,
        Role::Decide => &keys.decide,
    };

    let Some(expected) = expected.as_deref().or(keys.legacy.as_deref()) else {
        return Ok(());
    };

    let presented = headers
        .get(role.header())
        .or_else(|| headers.get(LEGACY_HEADER))
        .and_then(|v| v.to_str().ok());

    match presented {
        Some(value) if constant_time_eq(value, expected) => Ok(()),
        Some(_) => Err(ApiError::Unauthorized("invalid key".to_string())),
        None => Err(ApiError::Unauthorized("missing key".to_string())),
    }
}
