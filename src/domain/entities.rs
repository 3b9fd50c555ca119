//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};

/// Every identity form an account can be addressed by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentities {
    pub id: String,
    pub username: Option<String>,
    pub uuid: String,
}

/// The equipped (or directly addressed) cape with its file references.
///
/// `texture` is always present: a cape without a texture file is treated as
/// absent by the repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapeRecord {
    pub id: String,
    pub name: Option<String>,
    pub texture: String,
    pub render: Option<String>,
    pub animation: Option<String>,
    pub emissive: Option<String>,
    pub specular: Option<String>,
    pub normal: Option<String>,
    pub hash: Option<String>,
}

impl CapeRecord {
    /// Returns the integrity hash when one has been computed.
    pub fn known_hash(&self) -> Option<&str> {
        self.hash.as_deref().filter(|hash| !hash.is_empty())
    }

    /// File ids referenced by the cape, texture first.
    pub fn file_ids(&self) -> Vec<&str> {
        let mut ids = vec![self.texture.as_str()];
        ids.extend(
            [
                &self.render,
                &self.animation,
                &self.emissive,
                &self.specular,
                &self.normal,
            ]
            .into_iter()
            .filter_map(|slot| slot.as_deref()),
        );
        ids
    }
}

/// Metadata row for a stored binary asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFileRecord {
    pub id: String,
    pub file_name: String,
    pub storage_path: String,
    pub content_type: Option<String>,
    pub hash: Option<String>,
    pub cacheable: bool,
}
