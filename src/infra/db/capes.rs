use async_trait::async_trait;

use crate::{
    application::repos::{CapesRepo, RepoError},
    domain::entities::CapeRecord,
};

use super::{PostgresRepositories, map_sqlx_error, util::CANONICAL_UUID};

const CAPE_COLUMNS: &str = "\
    uc.id::text AS id, \
    uc.name AS name, \
    uc.cape_file::text AS texture, \
    uc.render::text AS render, \
    uc.mcmeta::text AS animation, \
    uc.emissive_layer::text AS emissive, \
    uc.specular_layer::text AS specular, \
    uc.normal_layer::text AS normal, \
    f.hash AS hash";

#[derive(sqlx::FromRow)]
struct CapeRow {
    id: String,
    name: Option<String>,
    texture: String,
    render: Option<String>,
    animation: Option<String>,
    emissive: Option<String>,
    specular: Option<String>,
    normal: Option<String>,
    hash: Option<String>,
}

impl From<CapeRow> for CapeRecord {
    fn from(row: CapeRow) -> Self {
        Self {
            id: row.id,
            name: row.name.filter(|name| !name.is_empty()),
            texture: row.texture,
            render: non_empty(row.render),
            animation: non_empty(row.animation),
            emissive: non_empty(row.emissive),
            specular: non_empty(row.specular),
            normal: non_empty(row.normal),
            hash: row.hash,
        }
    }
}

/// Empty file references are stored by the uploader for unset slots.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

#[async_trait]
impl CapesRepo for PostgresRepositories {
    async fn find_equipped_cape(
        &self,
        account_uuid: &str,
    ) -> Result<Option<CapeRecord>, RepoError> {
        let sql = format!(
            "SELECT {CAPE_COLUMNS} \
             FROM users u \
             INNER JOIN cape_slots cs ON cs.id = u.cape \
             INNER JOIN uploaded_capes uc ON uc.id = cs.cape_id \
             INNER JOIN files f ON f.id = uc.cape_file \
             WHERE {CANONICAL_UUID} = $1 \
             LIMIT 1"
        );

        let row = sqlx::query_as::<_, CapeRow>(&sql)
            .bind(account_uuid)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(CapeRecord::from))
    }

    async fn find_uploaded_cape(&self, cape_id: &str) -> Result<Option<CapeRecord>, RepoError> {
        let sql = format!(
            "SELECT {CAPE_COLUMNS} \
             FROM uploaded_capes uc \
             INNER JOIN files f ON f.id = uc.cape_file \
             WHERE uc.id::text = $1 \
             LIMIT 1"
        );

        let row = sqlx::query_as::<_, CapeRow>(&sql)
            .bind(cape_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(CapeRecord::from))
    }
}
