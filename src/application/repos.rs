//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{AccountIdentities, CapeRecord, ContentFileRecord};
use crate::domain::identifier::ClassifiedId;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[async_trait]
pub trait AccountsRepo: Send + Sync {
    /// Canonical account UUID for the identifier, if the account exists.
    async fn find_account_uuid(&self, id: &ClassifiedId) -> Result<Option<String>, RepoError>;

    /// All identity forms of the account, if it exists.
    async fn find_identities(
        &self,
        id: &ClassifiedId,
    ) -> Result<Option<AccountIdentities>, RepoError>;
}

#[async_trait]
pub trait CapesRepo: Send + Sync {
    /// The cape equipped by the account. `None` when no slot is equipped or the
    /// cape has no texture file.
    async fn find_equipped_cape(&self, account_uuid: &str)
    -> Result<Option<CapeRecord>, RepoError>;

    /// An uploaded cape addressed by its own id.
    async fn find_uploaded_cape(&self, cape_id: &str) -> Result<Option<CapeRecord>, RepoError>;
}

#[async_trait]
pub trait FilesRepo: Send + Sync {
    async fn find_file(&self, file_id: &str) -> Result<Option<ContentFileRecord>, RepoError>;

    async fn update_file_hash(&self, file_id: &str, hash: &str) -> Result<(), RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
