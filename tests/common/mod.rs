#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{Router, body::Body, http::Request, response::Response};
use bytes::Bytes;
use http_body_util::BodyExt;
use tower::ServiceExt;

use narnia::application::{
    capes::CapeService,
    content::ContentService,
    descriptor::DescriptorService,
    hashing::HashBackfiller,
    invalidation::CacheAdminService,
    repos::{AccountsRepo, CapesRepo, FilesRepo, HealthRepo, RepoError},
};
use narnia::cache::{CacheAside, CacheConfig, CacheStore, MemoryCacheStore};
use narnia::domain::{
    entities::{AccountIdentities, CapeRecord, ContentFileRecord},
    identifier::ClassifiedId,
};
use narnia::infra::{
    blob::{BlobError, BlobFetcher, BlobObject, BlobStore},
    http::{AdminState, HttpState, build_admin_router, build_router},
};

pub const NOTCH_UUID: &str = "069a79f444e94726a5befca90e38aaf5";
pub const JEB_UUID: &str = "853c80ef3c3749fdaa49938b674adae6";
pub const BASE_URL: &str = "https://capes.example.test";
pub const TEXTURE: &[u8] = b"\x89PNG-texture";
pub const ANIMATION: &[u8] = br#"{"animation":{"frametime":2,"interpolate":true}}"#;
const TIMEOUT: Duration = Duration::from_secs(2);

/// In-memory stand-in for the account platform tables.
#[derive(Default)]
pub struct FakeDatabase {
    accounts: Vec<AccountIdentities>,
    equipped: HashMap<String, CapeRecord>,
    uploaded: HashMap<String, CapeRecord>,
    files: Mutex<HashMap<String, ContentFileRecord>>,
    pub account_lookups: AtomicUsize,
    pub cape_lookups: AtomicUsize,
    pub healthy: bool,
}

impl FakeDatabase {
    pub fn seeded() -> Self {
        let cape = CapeRecord {
            id: "cape-1".into(),
            name: Some("Founder".into()),
            texture: "tex".into(),
            render: Some("render".into()),
            animation: Some("meta".into()),
            emissive: None,
            specular: None,
            normal: None,
            hash: None,
        };

        let mut equipped = HashMap::new();
        equipped.insert(NOTCH_UUID.to_string(), cape.clone());
        let mut uploaded = HashMap::new();
        uploaded.insert(
            "cape-2".to_string(),
            CapeRecord {
                id: "cape-2".into(),
                name: None,
                render: None,
                animation: None,
                ..cape
            },
        );

        let files = [
            file("tex", "cape.png", "capes/tex.png", Some("image/png"), true),
            file("render", "render.png", "capes/render.png", Some("image/png"), false),
            file("meta", "cape.mcmeta", "capes/meta.mcmeta", Some("application/json"), true),
            file("pack", "pack.zip", "/packs/pack%20one.zip/", None, true),
            file("garbled", "garbled.mcmeta", "capes/garbled.mcmeta", None, true),
            file("still", "still.mcmeta", "capes/still.mcmeta", None, true),
            file("orphan", "orphan.mcmeta", "capes/orphan.mcmeta", None, true),
        ]
        .into_iter()
        .map(|record| (record.id.clone(), record))
        .collect();

        Self {
            accounts: vec![
                AccountIdentities {
                    id: "12345".into(),
                    username: Some("Notch".into()),
                    uuid: NOTCH_UUID.into(),
                },
                AccountIdentities {
                    id: "67890".into(),
                    username: Some("Jeb_".into()),
                    uuid: JEB_UUID.into(),
                },
            ],
            equipped,
            uploaded,
            files: Mutex::new(files),
            healthy: true,
            ..Default::default()
        }
    }

    pub fn stored_hash(&self, file_id: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .and_then(|file| file.hash.clone())
    }

    /// Points the equipped cape of `account_uuid` at another metadata file.
    pub fn with_animation_file(mut self, account_uuid: &str, file_id: &str) -> Self {
        if let Some(cape) = self.equipped.get_mut(account_uuid) {
            cape.animation = Some(file_id.to_string());
        }
        self
    }

    fn account(&self, id: &ClassifiedId) -> Option<&AccountIdentities> {
        self.accounts.iter().find(|account| match id {
            ClassifiedId::Uuid(value) => account.uuid == *value,
            ClassifiedId::InternalId(value) => account.id == *value,
            ClassifiedId::Username(value) => account.username.as_deref() == Some(value.as_str()),
        })
    }

    fn with_texture_hash(&self, mut record: CapeRecord) -> CapeRecord {
        record.hash = self.stored_hash(&record.texture);
        record
    }
}

fn file(
    id: &str,
    name: &str,
    path: &str,
    content_type: Option<&str>,
    cacheable: bool,
) -> ContentFileRecord {
    ContentFileRecord {
        id: id.into(),
        file_name: name.into(),
        storage_path: path.into(),
        content_type: content_type.map(str::to_string),
        hash: None,
        cacheable,
    }
}

#[async_trait]
impl AccountsRepo for FakeDatabase {
    async fn find_account_uuid(&self, id: &ClassifiedId) -> Result<Option<String>, RepoError> {
        self.account_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.account(id).map(|account| account.uuid.clone()))
    }

    async fn find_identities(
        &self,
        id: &ClassifiedId,
    ) -> Result<Option<AccountIdentities>, RepoError> {
        Ok(self.account(id).cloned())
    }
}

#[async_trait]
impl CapesRepo for FakeDatabase {
    async fn find_equipped_cape(&self, account_uuid: &str) -> Result<Option<CapeRecord>, RepoError> {
        self.cape_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .equipped
            .get(account_uuid)
            .cloned()
            .map(|record| self.with_texture_hash(record)))
    }

    async fn find_uploaded_cape(&self, cape_id: &str) -> Result<Option<CapeRecord>, RepoError> {
        Ok(self
            .uploaded
            .get(cape_id)
            .cloned()
            .map(|record| self.with_texture_hash(record)))
    }
}

#[async_trait]
impl FilesRepo for FakeDatabase {
    async fn find_file(&self, file_id: &str) -> Result<Option<ContentFileRecord>, RepoError> {
        Ok(self.files.lock().unwrap().get(file_id).cloned())
    }

    async fn update_file_hash(&self, file_id: &str, hash: &str) -> Result<(), RepoError> {
        if let Some(file) = self.files.lock().unwrap().get_mut(file_id) {
            file.hash = Some(hash.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl HealthRepo for FakeDatabase {
    async fn ping(&self) -> Result<(), RepoError> {
        if self.healthy {
            Ok(())
        } else {
            Err(RepoError::Persistence("connection refused".into()))
        }
    }
}

/// Object store keyed by normalized path; counts reads.
#[derive(Default)]
pub struct FakeBlobs {
    objects: HashMap<String, Bytes>,
    pub reads: AtomicUsize,
}

impl FakeBlobs {
    pub fn seeded() -> Self {
        let mut objects = HashMap::new();
        objects.insert("capes/tex.png".to_string(), Bytes::from_static(TEXTURE));
        objects.insert(
            "capes/render.png".to_string(),
            Bytes::from_static(b"render-png"),
        );
        objects.insert(
            "capes/meta.mcmeta".to_string(),
            Bytes::from_static(ANIMATION),
        );
        objects.insert(
            "packs/pack one.zip".to_string(),
            Bytes::from_static(b"PK\x03\x04"),
        );
        objects.insert(
            "capes/garbled.mcmeta".to_string(),
            Bytes::from_static(b"{\"animation\": "),
        );
        objects.insert(
            "capes/still.mcmeta".to_string(),
            Bytes::from_static(br#"{"frames":[0,1]}"#),
        );
        Self {
            objects,
            reads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl BlobStore for FakeBlobs {
    async fn get(&self, key: &str) -> Result<BlobObject, BlobError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.objects
            .get(key)
            .cloned()
            .map(|bytes| BlobObject {
                bytes,
                content_type: None,
            })
            .ok_or_else(|| BlobError::NotFound(key.to_string()))
    }
}

pub struct Harness {
    pub db: Arc<FakeDatabase>,
    pub blobs: Arc<FakeBlobs>,
    pub store: Arc<MemoryCacheStore>,
    pub public: Router,
    pub admin: Router,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_database(FakeDatabase::seeded())
    }

    pub fn with_database(db: FakeDatabase) -> Self {
        let db = Arc::new(db);
        let blobs = Arc::new(FakeBlobs::seeded());
        let store = Arc::new(MemoryCacheStore::new(256));
        let cache = CacheAside::new(
            store.clone() as Arc<dyn CacheStore>,
            CacheConfig::default(),
            TIMEOUT,
        );

        let capes = Arc::new(CapeService::new(
            db.clone(),
            db.clone(),
            cache.clone(),
            TIMEOUT,
        ));
        let content = Arc::new(ContentService::new(
            db.clone(),
            BlobFetcher::new(blobs.clone(), TIMEOUT),
            cache.clone(),
            TIMEOUT,
        ));
        let hashes = Arc::new(HashBackfiller::new(
            db.clone(),
            content.clone(),
            cache.clone(),
            TIMEOUT,
        ));
        let descriptors = Arc::new(DescriptorService::new(
            capes.clone(),
            content.clone(),
            hashes,
            BASE_URL,
        ));
        let cache_admin = Arc::new(CacheAdminService::new(
            db.clone(),
            db.clone(),
            cache,
            TIMEOUT,
        ));

        let public = build_router(HttpState {
            capes,
            content,
            descriptors,
            health: db.clone(),
        });
        let admin = build_admin_router(AdminState {
            cache_admin,
            health: db.clone(),
        });

        Self {
            db,
            blobs,
            store,
            public,
            admin,
        }
    }

    pub async fn get(&self, uri: &str) -> Response {
        send(&self.public, "GET", uri).await
    }

    pub async fn admin_post(&self, uri: &str) -> Response {
        send(&self.admin, "POST", uri).await
    }

    pub async fn cached(&self, key: &str) -> bool {
        self.store.get(key).await.unwrap().is_some()
    }
}

pub async fn send(router: &Router, method: &str, uri: &str) -> Response {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn body_bytes(response: Response) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
