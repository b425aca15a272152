//! Admin Keys Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};

use crate::auth::models::{AdminKey, AdminKeyUuid};

const GET_ADMIN_KEY_SQL: &str = include_str!("sql/get_admin_key.sql");
const CREATE_ADMIN_KEY_SQL: &str = include_str!("sql/create_admin_key.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgAuthRepository;

impl PgAuthRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_key_by_hash(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        key_hash: &str,
    ) -> Result<Option<AdminKey>, sqlx::Error> {
        query_as::<Postgres, AdminKey>(GET_ADMIN_KEY_SQL)
            .bind(key_hash)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn create_key(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        uuid: AdminKeyUuid,
        key_hash: &str,
        label: &str,
    ) -> Result<AdminKey, sqlx::Error> {
        query_as::<Postgres, AdminKey>(CREATE_ADMIN_KEY_SQL)
            .bind(uuid.into_uuid())
            .bind(key_hash)
            .bind(label)
            .fetch_one(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for AdminKey {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: AdminKeyUuid::from_uuid(row.try_get("uuid")?),
            key_hash: row.try_get("key_hash")?,
            label: row.try_get("label")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            revoked_at: row
                .try_get::<Option<SqlxTimestamp>, _>("revoked_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}
