//! Structural cape descriptor served at `/{identifier}`.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::application::capes::CapeService;
use crate::application::content::{CacheMode, ContentService};
use crate::application::error::ResolveError;
use crate::application::hashing::HashBackfiller;
use crate::domain::identifier::ClassifiedId;
use crate::domain::types::Slot;

const SOURCE: &str = "application::descriptor";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapeSummary {
    pub id: String,
    pub texture: Slot<String>,
    pub name: Slot<String>,
    pub render: Slot<String>,
    pub cape_hash: Slot<String>,
    pub animation: Slot<JsonValue>,
    pub emissive: Slot<String>,
    pub specular: Slot<String>,
    pub normal: Slot<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapeDescriptor {
    pub cape: CapeSummary,
    /// Always empty; kept for clients that expect the field.
    pub cosmetics: Vec<JsonValue>,
}

pub struct DescriptorService {
    capes: Arc<CapeService>,
    content: Arc<ContentService>,
    hashes: Arc<HashBackfiller>,
    base_url: String,
}

impl DescriptorService {
    pub fn new(
        capes: Arc<CapeService>,
        content: Arc<ContentService>,
        hashes: Arc<HashBackfiller>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            capes,
            content,
            hashes,
            base_url: base_url.into(),
        }
    }

    /// Public URL of a file served by `/file/{id}`.
    pub fn file_url(&self, file_id: &str) -> String {
        file_url(&self.base_url, file_id)
    }

    pub async fn describe(&self, id: &ClassifiedId) -> Result<CapeDescriptor, ResolveError> {
        let cape = self.capes.resolve_full(id).await?;
        let cape = self.hashes.ensure_hash(cape).await;
        let record = cape.record;

        let animation = match record.animation.as_deref() {
            Some(file_id) => self.load_animation(file_id).await,
            None => Slot::Absent,
        };
        let cape_hash = Slot::from(record.known_hash().map(str::to_string));
        let url = |slot: Option<String>| Slot::from(slot).map(|file_id| self.file_url(&file_id));

        Ok(CapeDescriptor {
            cape: CapeSummary {
                texture: Slot::Present(self.file_url(&record.texture)),
                name: Slot::from(record.name),
                render: url(record.render),
                cape_hash,
                animation,
                emissive: url(record.emissive),
                specular: url(record.specular),
                normal: url(record.normal),
                id: record.id,
            },
            cosmetics: Vec::new(),
        })
    }

    /// The `animation` member of the cape's animation metadata file.
    async fn load_animation(&self, file_id: &str) -> Slot<JsonValue> {
        let payload = match self.content.deliver(file_id, CacheMode::ReadWrite).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!(
                    target = SOURCE,
                    file_id,
                    error = %err,
                    "animation metadata unavailable"
                );
                return Slot::Absent;
            }
        };

        match serde_json::from_slice::<JsonValue>(&payload.bytes) {
            Ok(mut document) => Slot::from(
                document
                    .get_mut("animation")
                    .map(JsonValue::take)
                    .filter(|value| !value.is_null()),
            ),
            Err(err) => {
                warn!(
                    target = SOURCE,
                    file_id,
                    error = %err,
                    "animation metadata is not valid JSON"
                );
                Slot::Absent
            }
        }
    }
}

fn file_url(base_url: &str, file_id: &str) -> String {
    format!("{}/file/{}", base_url.trim_end_matches('/'), file_id)
}
