use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use crate::{
    application::repos::{AccountsRepo, RepoError},
    domain::{entities::AccountIdentities, identifier::ClassifiedId},
};

use super::{PostgresRepositories, map_sqlx_error, util::CANONICAL_UUID};

#[derive(sqlx::FromRow)]
struct IdentityRow {
    id: String,
    username: Option<String>,
    uuid: String,
}

impl From<IdentityRow> for AccountIdentities {
    fn from(row: IdentityRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            uuid: row.uuid,
        }
    }
}

/// Column expression matching the identifier kind.
fn identity_column(id: &ClassifiedId) -> &'static str {
    match id {
        ClassifiedId::Uuid(_) => CANONICAL_UUID,
        ClassifiedId::InternalId(_) => "u.id::text",
        ClassifiedId::Username(_) => "u.username",
    }
}

fn push_identity_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, id: &'q ClassifiedId) {
    qb.push(" WHERE ");
    qb.push(identity_column(id));
    qb.push(" = ");
    qb.push_bind(id.value());
    qb.push(" LIMIT 1");
}

#[async_trait]
impl AccountsRepo for PostgresRepositories {
    async fn find_account_uuid(&self, id: &ClassifiedId) -> Result<Option<String>, RepoError> {
        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {CANONICAL_UUID} FROM users u"));
        push_identity_filter(&mut qb, id);

        qb.build_query_scalar::<String>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_identities(
        &self,
        id: &ClassifiedId,
    ) -> Result<Option<AccountIdentities>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT u.id::text AS id, u.username, {CANONICAL_UUID} AS uuid FROM users u"
        ));
        push_identity_filter(&mut qb, id);

        let row = qb
            .build_query_as::<IdentityRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(AccountIdentities::from))
    }
}
