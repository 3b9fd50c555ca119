//! Account to cape resolution over the cached entity graph.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::application::error::{Missing, ResolveError};
use crate::application::repos::{AccountsRepo, CapesRepo};
use crate::application::upstream;
use crate::cache::{CacheAside, CacheKey};
use crate::domain::entities::CapeRecord;
use crate::domain::identifier::ClassifiedId;

const SOURCE: &str = "application::capes";

/// How much of the cape the caller needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapeDetail {
    TextureOnly,
    Full,
}

/// A cape together with the canonical UUID of the account wearing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCape {
    pub account_uuid: String,
    pub record: CapeRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapeView {
    /// File id of the primary texture.
    Texture(String),
    Full(ResolvedCape),
}

impl CapeView {
    /// File id of the primary texture, whichever detail was resolved.
    pub fn into_texture(self) -> String {
        match self {
            CapeView::Texture(file_id) => file_id,
            CapeView::Full(cape) => cape.record.texture,
        }
    }
}

pub struct CapeService {
    accounts: Arc<dyn AccountsRepo>,
    capes: Arc<dyn CapesRepo>,
    cache: CacheAside,
    timeout: Duration,
}

impl CapeService {
    pub fn new(
        accounts: Arc<dyn AccountsRepo>,
        capes: Arc<dyn CapesRepo>,
        cache: CacheAside,
        timeout: Duration,
    ) -> Self {
        Self {
            accounts,
            capes,
            cache,
            timeout,
        }
    }

    /// Maps an identifier to the canonical account UUID.
    pub async fn resolve_account(&self, id: &ClassifiedId) -> Result<String, ResolveError> {
        let key = CacheKey::identity(id);
        if let Some(account_uuid) = self.cache.lookup::<String>(&key).await {
            return Ok(account_uuid);
        }

        let account_uuid = upstream::database(
            self.timeout,
            "find_account_uuid",
            self.accounts.find_account_uuid(id),
        )
        .await?
        .ok_or(ResolveError::NotFound(Missing::Account))?;

        self.cache.store(&key, &account_uuid).await;
        Ok(account_uuid)
    }

    pub async fn resolve_cape(
        &self,
        id: &ClassifiedId,
        detail: CapeDetail,
    ) -> Result<CapeView, ResolveError> {
        let cape = self.resolve_full(id).await?;
        Ok(match detail {
            CapeDetail::TextureOnly => CapeView::Texture(cape.record.texture),
            CapeDetail::Full => CapeView::Full(cape),
        })
    }

    pub async fn resolve_full(&self, id: &ClassifiedId) -> Result<ResolvedCape, ResolveError> {
        let account_uuid = self.resolve_account(id).await?;
        let record = self.equipped_cape(&account_uuid).await?;

        debug!(
            target = SOURCE,
            identifier = %id,
            kind = id.kind().as_str(),
            cape_id = %record.id,
            "cape resolved"
        );

        Ok(ResolvedCape {
            account_uuid,
            record,
        })
    }

    /// Looks up an uploaded cape by its own id, bypassing the account graph.
    pub async fn resolve_uploaded_cape(&self, cape_id: &str) -> Result<CapeRecord, ResolveError> {
        upstream::database(
            self.timeout,
            "find_uploaded_cape",
            self.capes.find_uploaded_cape(cape_id),
        )
        .await?
        .ok_or(ResolveError::NotFound(Missing::Cape))
    }

    async fn equipped_cape(&self, account_uuid: &str) -> Result<CapeRecord, ResolveError> {
        let key = CacheKey::cape(account_uuid);
        if let Some(record) = self.cache.lookup::<CapeRecord>(&key).await {
            return Ok(record);
        }

        let record = upstream::database(
            self.timeout,
            "find_equipped_cape",
            self.capes.find_equipped_cape(account_uuid),
        )
        .await?
        .ok_or(ResolveError::NotFound(Missing::Cape))?;

        self.cache.store(&key, &record).await;
        Ok(record)
    }
}
