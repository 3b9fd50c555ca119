//! Cache key definitions.
//!
//! Every entry lives under one of three namespaces and renders as
//! `<namespace>:<identifier>`.

use std::fmt;

use crate::domain::identifier::ClassifiedId;

/// Cache namespace, one per cached entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Classified identifier to canonical account UUID.
    Identity,
    /// Account UUID to equipped cape record.
    Cape,
    /// File id to file payload.
    File,
}

impl Namespace {
    pub const ALL: [Namespace; 3] = [Namespace::Identity, Namespace::Cape, Namespace::File];

    /// Key prefix in the backing store.
    pub fn prefix(self) -> &'static str {
        match self {
            Namespace::Identity => "user",
            Namespace::Cape => "cape",
            Namespace::File => "file",
        }
    }

    /// Label used for metrics and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Identity => "identity",
            Namespace::Cape => "cape",
            Namespace::File => "file",
        }
    }

    /// Glob pattern matching every key in the namespace.
    pub fn pattern(self) -> String {
        format!("{}:*", self.prefix())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: Namespace,
    identifier: String,
}

impl CacheKey {
    pub fn identity(id: &ClassifiedId) -> Self {
        Self {
            namespace: Namespace::Identity,
            identifier: id.cache_identifier(),
        }
    }

    pub fn cape(account_uuid: &str) -> Self {
        Self {
            namespace: Namespace::Cape,
            identifier: account_uuid.to_string(),
        }
    }

    pub fn file(file_id: &str) -> Self {
        Self {
            namespace: Namespace::File,
            identifier: file_id.to_string(),
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace.prefix(), self.identifier)
    }
}
