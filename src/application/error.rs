use std::error::Error as StdError;
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::repos::RepoError,
    cache::CacheError,
    domain::error::DomainError,
    infra::{blob::BlobError, error::InfraError},
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

/// Which entity in the account graph was absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Account,
    Cape,
    File,
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Missing::Account => "account",
            Missing::Cape => "cape",
            Missing::File => "file",
        })
    }
}

/// Backing service that failed or timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Database,
    BlobStore,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Upstream::Database => "database",
            Upstream::BlobStore => "blob store",
        })
    }
}

/// Outcome of an identifier resolution or content delivery that did not
/// produce a value.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    InvalidIdentifier(#[from] DomainError),
    #[error("{0} not found")]
    NotFound(Missing),
    #[error("{service} failed: {message}")]
    Upstream {
        service: Upstream,
        message: String,
    },
}

impl ResolveError {
    pub fn upstream(service: Upstream, message: impl Into<String>) -> Self {
        Self::Upstream {
            service,
            message: message.into(),
        }
    }
}

impl From<RepoError> for ResolveError {
    fn from(err: RepoError) -> Self {
        ResolveError::upstream(Upstream::Database, err.to_string())
    }
}

impl From<BlobError> for ResolveError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::NotFound(_) => ResolveError::NotFound(Missing::File),
            other => ResolveError::upstream(Upstream::BlobStore, other.to_string()),
        }
    }
}

impl From<ResolveError> for HttpError {
    fn from(error: ResolveError) -> Self {
        const SOURCE: &str = "application::error::resolve_error_to_http";
        match &error {
            ResolveError::InvalidIdentifier(_) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Invalid identifier",
                &error,
            ),
            ResolveError::NotFound(Missing::Account) => {
                HttpError::from_error(SOURCE, StatusCode::NOT_FOUND, "User not found", &error)
            }
            ResolveError::NotFound(Missing::Cape) => {
                HttpError::from_error(SOURCE, StatusCode::NOT_FOUND, "Cape not found", &error)
            }
            ResolveError::NotFound(Missing::File) => {
                HttpError::from_error(SOURCE, StatusCode::NOT_FOUND, "File not found", &error)
            }
            ResolveError::Upstream {
                service: Upstream::Database,
                ..
            } => HttpError::from_error(
                SOURCE,
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable",
                &error,
            ),
            ResolveError::Upstream {
                service: Upstream::BlobStore,
                ..
            } => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_GATEWAY,
                "Upstream storage unavailable",
                &error,
            ),
        }
    }
}

/// Failure of an administrative cache operation.
#[derive(Debug, Error)]
pub enum InvalidationError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("cache invalidation failed: {0}")]
    Cache(#[from] CacheError),
}

impl From<InvalidationError> for HttpError {
    fn from(error: InvalidationError) -> Self {
        match error {
            InvalidationError::Resolve(inner) => inner.into(),
            InvalidationError::Cache(inner) => HttpError::from_error(
                "application::error::invalidation_error_to_http",
                StatusCode::BAD_GATEWAY,
                "Cache unavailable",
                &inner,
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
