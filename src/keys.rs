//! Dotted permission key encoding.
//!
//! Leaf keys are encoded as: `factory.department.service`
//! - Every part is normalized: trimmed, lowercased, `-` replaced by `_`
//! - Decoding is lenient: wrong part counts or empty parts yield `None`
//! - Scope keys (`factory.department`) and prefixed department ids
//!   (`kr_store`) are built here too, nowhere else

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{KEY_SEPARATOR, PREFIX_SEPARATOR};
use crate::error::AccessError;

/// Normalize an identifier token: trim, lowercase, hyphen to underscore
///
/// # Example
/// ```
/// use factory_access::normalize;
/// assert_eq!(normalize("  Place-Order "), "place_order");
/// ```
#[inline]
pub fn normalize(token: &str) -> String {
    token.trim().to_lowercase().replace('-', "_")
}

/// Build a leaf key from its three parts. Never fails.
///
/// # Example
/// ```
/// use factory_access::encode;
/// assert_eq!(encode("Kerur", "store", "kr-place-order"), "kerur.store.kr_place_order");
/// ```
#[inline]
pub fn encode(factory: &str, department: &str, service: &str) -> String {
    let (f, d, s) = (normalize(factory), normalize(department), normalize(service));
    let mut key = String::with_capacity(f.len() + d.len() + s.len() + 2);
    key.push_str(&f);
    key.push(KEY_SEPARATOR);
    key.push_str(&d);
    key.push(KEY_SEPARATOR);
    key.push_str(&s);
    key
}

/// Parse a leaf key. Returns `None` for anything that is not exactly three
/// non-empty parts; historical records contain such keys and callers skip them.
pub fn decode(key: &str) -> Option<PermissionKey> {
    let mut parts = key.split(KEY_SEPARATOR).map(normalize);
    let factory = parts.next()?;
    let department = parts.next()?;
    let service = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    if factory.is_empty() || department.is_empty() || service.is_empty() {
        return None;
    }
    Some(PermissionKey { factory, department, service })
}

/// Build the `services` map key for a department: `factory.department`
#[inline]
pub fn scope_key(factory: &str, department: &str) -> String {
    format!("{}{}{}", normalize(factory), KEY_SEPARATOR, normalize(department))
}

/// Split a scope key back into `(factory, department)`
pub fn parse_scope(scope: &str) -> Option<(String, String)> {
    let (f, d) = scope.split_once(KEY_SEPARATOR)?;
    let (f, d) = (normalize(f), normalize(d));
    if f.is_empty() || d.is_empty() || d.contains(KEY_SEPARATOR) {
        return None;
    }
    Some((f, d))
}

/// Build a department id prefixed with its factory short code (`kr_store`)
#[inline]
pub fn prefixed_department(short_code: &str, department: &str) -> String {
    format!("{}{}{}", normalize(short_code), PREFIX_SEPARATOR, normalize(department))
}

/// Check that a token is already in normalized snake_case form
pub fn is_identifier(token: &str) -> bool {
    !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// A decoded `(factory, department, service)` leaf
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionKey {
    pub factory: String,
    pub department: String,
    pub service: String,
}

impl PermissionKey {
    /// Create a key from un-normalized parts
    pub fn new(factory: &str, department: &str, service: &str) -> Self {
        PermissionKey {
            factory: normalize(factory),
            department: normalize(department),
            service: normalize(service),
        }
    }

    /// Encoded `factory.department.service` form
    #[inline]
    pub fn encode(&self) -> String {
        encode(&self.factory, &self.department, &self.service)
    }

    /// Scope key of the department holding this leaf
    #[inline]
    pub fn scope(&self) -> String {
        scope_key(&self.factory, &self.department)
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}{}{}", self.factory, KEY_SEPARATOR, self.department, KEY_SEPARATOR, self.service)
    }
}

impl FromStr for PermissionKey {
    type Err = AccessError;

    /// Strict variant of [`decode`] for callers that reject bad input
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s).ok_or_else(|| AccessError::MalformedKey(s.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================
