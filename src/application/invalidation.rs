//! Administrative cache invalidation.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::application::error::{InvalidationError, Missing, ResolveError};
use crate::application::repos::{AccountsRepo, CapesRepo};
use crate::application::upstream;
use crate::cache::{CacheAside, CacheKey};
use crate::domain::identifier::{ClassifiedId, classify};

const SOURCE: &str = "application::invalidation";

pub struct CacheAdminService {
    accounts: Arc<dyn AccountsRepo>,
    capes: Arc<dyn CapesRepo>,
    cache: CacheAside,
    timeout: Duration,
}

impl CacheAdminService {
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

    pub async fn invalidate_all(&self) -> Result<(), InvalidationError> {
        self.cache.invalidate_all().await?;
        info!(target = SOURCE, "cache cleared");
        Ok(())
    }

    /// Drops every cache entry derived from one account.
    ///
    /// Covers the identity entries for all of its identifier forms, its cape
    /// entry and the payloads of its equipped cape's files. Returns the keys
    /// that were dropped.
    pub async fn invalidate_identity(&self, raw: &str) -> Result<Vec<CacheKey>, InvalidationError> {
        let id = classify(raw).map_err(ResolveError::from)?;
        let keys = self.keys_for(&id).await?;

        for key in &keys {
            self.cache.invalidate(key).await?;
        }

        info!(
            target = SOURCE,
            identifier = %id,
            keys = keys.len(),
            "account cache cleared"
        );
        Ok(keys)
    }

    async fn keys_for(&self, id: &ClassifiedId) -> Result<Vec<CacheKey>, ResolveError> {
        let identities = upstream::database(
            self.timeout,
            "find_identities",
            self.accounts.find_identities(id),
        )
        .await?
        .ok_or(ResolveError::NotFound(Missing::Account))?;

        let mut forms = vec![
            id.clone(),
            ClassifiedId::Uuid(identities.uuid.clone()),
            ClassifiedId::InternalId(identities.id.clone()),
        ];
        if let Some(username) = identities.username.as_deref()
            && let Ok(form) = classify(username)
        {
            forms.push(form);
        }

        let mut keys: Vec<CacheKey> = Vec::new();
        for form in forms {
            let key = CacheKey::identity(&form);
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys.push(CacheKey::cape(&identities.uuid));

        let equipped = upstream::database(
            self.timeout,
            "find_equipped_cape",
            self.capes.find_equipped_cape(&identities.uuid),
        )
        .await?;
        if let Some(record) = equipped {
            for file_id in record.file_ids() {
                let key = CacheKey::file(file_id);
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }

        Ok(keys)
    }
}

/// Renders a key list for the admin response body.
pub fn describe_keys(keys: &[CacheKey]) -> Vec<String> {
    keys.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::application::repos::RepoError;
    use crate::cache::{CacheConfig, CacheStore, MemoryCacheStore};
    use crate::domain::entities::{AccountIdentities, CapeRecord};

    const UUID: &str = "069a79f444e94726a5befca90e38aaf5";
    const TTL: Duration = Duration::from_secs(60);
    const TIMEOUT: Duration = Duration::from_secs(1);

    struct StubAccounts;

    #[async_trait]
    impl AccountsRepo for StubAccounts {
        async fn find_account_uuid(&self, _id: &ClassifiedId) -> Result<Option<String>, RepoError> {
            Ok(Some(UUID.into()))
        }

        async fn find_identities(
            &self,
            id: &ClassifiedId,
        ) -> Result<Option<AccountIdentities>, RepoError> {
            let known = matches!(id.value(), "Notch" | "12345" | UUID);
            Ok(known.then(|| AccountIdentities {
                id: "12345".into(),
                username: Some("Notch".into()),
                uuid: UUID.into(),
            }))
        }
    }

    struct StubCapes {
        equipped: HashMap<String, CapeRecord>,
    }

    #[async_trait]
    impl CapesRepo for StubCapes {
        async fn find_equipped_cape(
            &self,
            account_uuid: &str,
        ) -> Result<Option<CapeRecord>, RepoError> {
            Ok(self.equipped.get(account_uuid).cloned())
        }

        async fn find_uploaded_cape(&self, _cape_id: &str) -> Result<Option<CapeRecord>, RepoError> {
            Ok(None)
        }
    }

    fn cape() -> CapeRecord {
        CapeRecord {
            id: "cape-1".into(),
            name: None,
            texture: "tex".into(),
            render: Some("render".into()),
            animation: Some("meta".into()),
            emissive: None,
            specular: None,
            normal: None,
            hash: None,
        }
    }

    async fn seeded_store() -> Arc<MemoryCacheStore> {
        let store = Arc::new(MemoryCacheStore::new(64));
        for key in [
            "user:Notch",
            "user:wuid;12345",
            "user:069a79f444e94726a5befca90e38aaf5",
            "cape:069a79f444e94726a5befca90e38aaf5",
            "file:tex",
            "file:render",
            "file:meta",
            "file:unrelated",
            "user:Jeb_",
        ] {
            store.put(key, Bytes::from_static(b"\"x\""), TTL).await.unwrap();
        }
        store
    }

    fn service(store: Arc<MemoryCacheStore>) -> CacheAdminService {
        let mut equipped = HashMap::new();
        equipped.insert(UUID.to_string(), cape());
        CacheAdminService::new(
            Arc::new(StubAccounts),
            Arc::new(StubCapes { equipped }),
            CacheAside::new(store, CacheConfig::default(), TIMEOUT),
            TIMEOUT,
        )
    }

    #[tokio::test]
    async fn identity_clear_drops_every_derived_entry() {
        let store = seeded_store().await;
        let admin = service(store.clone());

        let keys = admin.invalidate_identity("wuid;12345").await.unwrap();

        assert_eq!(
            describe_keys(&keys),
            vec![
                "user:wuid;12345",
                "user:069a79f444e94726a5befca90e38aaf5",
                "user:Notch",
                "cape:069a79f444e94726a5befca90e38aaf5",
                "file:tex",
                "file:render",
                "file:meta",
            ]
        );
        for key in &keys {
            assert!(store.get(&key.to_string()).await.unwrap().is_none());
        }
        assert!(store.get("file:unrelated").await.unwrap().is_some());
        assert!(store.get("user:Jeb_").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn identity_clear_covers_keys_cached_from_uppercase_uuids() {
        let store = seeded_store().await;
        let shouted = CacheKey::identity(&classify("069A79F4-44E9-4726-A5BE-FCA90E38AAF5").unwrap());
        store
            .put(&shouted.to_string(), Bytes::from_static(b"\"x\""), TTL)
            .await
            .unwrap();
        let admin = service(store.clone());

        admin.invalidate_identity("Notch").await.unwrap();

        assert!(store.get(&shouted.to_string()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn identity_clear_rejects_invalid_and_unknown_identifiers() {
        let admin = service(seeded_store().await);

        assert!(matches!(
            admin.invalidate_identity("").await,
            Err(InvalidationError::Resolve(ResolveError::InvalidIdentifier(_)))
        ));
        assert!(matches!(
            admin.invalidate_identity("Herobrine").await,
            Err(InvalidationError::Resolve(ResolveError::NotFound(Missing::Account)))
        ));
    }

    #[tokio::test]
    async fn clear_all_empties_the_store() {
        let store = seeded_store().await;
        let admin = service(store.clone());

        admin.invalidate_all().await.unwrap();
        assert!(store.is_empty());
    }
}
