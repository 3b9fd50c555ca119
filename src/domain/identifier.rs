//! Classification of caller-supplied account identifiers.
//!
//! Callers address an account by one of three forms: a display username, an
//! account UUID (with or without hyphens) or an internal numeric id carrying the
//! `wuid;` marker. Classification is purely lexical and never touches storage.

use std::fmt;
use std::str::FromStr;

use super::error::DomainError;

/// Marker that prefixes internal numeric account ids.
pub const INTERNAL_ID_MARKER: &str = "wuid;";

const UUID_SIMPLE_LEN: usize = 32;
const UUID_HYPHENATED_LEN: usize = 36;
/// Usernames are strictly shorter than this many characters.
const USERNAME_LIMIT: usize = 17;
const INTERNAL_ID_MAX_DIGITS: usize = USERNAME_LIMIT - INTERNAL_ID_MARKER.len();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    Uuid,
    InternalId,
    Username,
}

impl IdentifierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IdentifierKind::Uuid => "uuid",
            IdentifierKind::InternalId => "internal_id",
            IdentifierKind::Username => "username",
        }
    }
}

/// A validated account identifier.
///
/// `Uuid` and `Username` hold the normalized text (hyphens and surrounding
/// whitespace removed); a `Uuid` is also lowercased. `InternalId` holds only the
/// digits that followed the marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassifiedId {
    Uuid(String),
    InternalId(String),
    Username(String),
}

impl ClassifiedId {
    pub fn kind(&self) -> IdentifierKind {
        match self {
            ClassifiedId::Uuid(_) => IdentifierKind::Uuid,
            ClassifiedId::InternalId(_) => IdentifierKind::InternalId,
            ClassifiedId::Username(_) => IdentifierKind::Username,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            ClassifiedId::Uuid(value)
            | ClassifiedId::InternalId(value)
            | ClassifiedId::Username(value) => value,
        }
    }

    /// Stable textual form used when the identifier becomes part of a cache key.
    pub fn cache_identifier(&self) -> String {
        match self {
            ClassifiedId::InternalId(digits) => format!("{INTERNAL_ID_MARKER}{digits}"),
            other => other.value().to_string(),
        }
    }
}

impl fmt::Display for ClassifiedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_identifier())
    }
}

impl FromStr for ClassifiedId {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        classify(raw)
    }
}

/// Classifies a raw identifier.
///
/// Rules are applied in order and the first match wins:
/// 1. a normalized length of 32 or 36 characters is a UUID;
/// 2. the `wuid;` marker followed by 1 to 12 ASCII digits is an internal id;
/// 3. any other non-empty value shorter than 17 characters is a username.
pub fn classify(raw: &str) -> Result<ClassifiedId, DomainError> {
    let normalized: String = raw.trim().chars().filter(|ch| *ch != '-').collect();
    let normalized_len = normalized.chars().count();

    if normalized_len == 0 {
        return Err(DomainError::invalid_identifier(raw));
    }

    if is_uuid_length(normalized_len) {
        return Ok(ClassifiedId::Uuid(normalized.to_lowercase()));
    }

    if let Some(digits) = normalized.strip_prefix(INTERNAL_ID_MARKER) {
        if is_internal_digits(digits) {
            return Ok(ClassifiedId::InternalId(digits.to_string()));
        }
        return Err(DomainError::invalid_identifier(raw));
    }

    if normalized_len < USERNAME_LIMIT {
        return Ok(ClassifiedId::Username(normalized));
    }

    Err(DomainError::invalid_identifier(raw))
}

fn is_uuid_length(len: usize) -> bool {
    len == UUID_SIMPLE_LEN || len == UUID_HYPHENATED_LEN
}

fn is_internal_digits(digits: &str) -> bool {
    !digits.is_empty()
        && digits.len() <= INTERNAL_ID_MAX_DIGITS
        && digits.bytes().all(|byte| byte.is_ascii_digit())
}
