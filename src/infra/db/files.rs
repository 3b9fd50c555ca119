use async_trait::async_trait;

use crate::{
    application::repos::{FilesRepo, RepoError},
    domain::entities::ContentFileRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct FileRow {
    id: String,
    file_name: Option<String>,
    file_location: String,
    content_type: Option<String>,
    hash: Option<String>,
    cache: Option<bool>,
}

impl From<FileRow> for ContentFileRecord {
    fn from(row: FileRow) -> Self {
        let file_name = row
            .file_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| row.id.clone());
        Self {
            id: row.id,
            file_name,
            storage_path: row.file_location,
            content_type: row.content_type.filter(|value| !value.is_empty()),
            hash: row.hash,
            cacheable: row.cache.unwrap_or(false),
        }
    }
}

#[async_trait]
impl FilesRepo for PostgresRepositories {
    async fn find_file(&self, file_id: &str) -> Result<Option<ContentFileRecord>, RepoError> {
        let row = sqlx::query_as::<_, FileRow>(
            r#"
            SELECT id::text AS id, file_name, file_location, content_type, hash, cache
            FROM files
            WHERE id::text = $1
            LIMIT 1
            "#,
        )
        .bind(file_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ContentFileRecord::from))
    }

    async fn update_file_hash(&self, file_id: &str, hash: &str) -> Result<(), RepoError> {
        sqlx::query("UPDATE files SET hash = $1 WHERE id::text = $2")
            .bind(hash)
            .bind(file_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}
