use std::{marker::PhantomData, time::Duration};

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::{with_deadline, DeletedRows, EntityStore, Record, UpdateResult};
use crate::error::{AppError, AppResult};

/// Statements for one record kind, rendered once per store.
#[derive(Debug, Clone)]
pub(crate) struct Statements {
    pub columns: String,
    pub list: String,
    pub insert: String,
    pub read: String,
    pub update: String,
    pub soft_delete: String,
}

impl Statements {
    pub fn render<R: Record>(deleted_rows: DeletedRows) -> Self {
        let table = R::TABLE;
        let columns = std::iter::once("id")
            .chain(["created_at", "updated_at", "deleted_at"])
            .chain(R::COLUMNS.iter().copied())
            .collect::<Vec<_>>()
            .join(", ");

        let insert_placeholders = (2..R::COLUMNS.len() + 2)
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let insert = format!(
            "INSERT INTO {table} (id, {fields}, created_at, updated_at) \
             VALUES ($1, {insert_placeholders}, now(), now()) \
             RETURNING {columns}",
            fields = R::COLUMNS.join(", "),
        );

        let visible = match deleted_rows {
            DeletedRows::Hidden => " AND deleted_at IS NULL",
            DeletedRows::Updatable => "",
        };
        let set_params = (2..R::UPDATE_COLUMNS.len() + 2)
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>();
        let assignments = R::UPDATE_COLUMNS
            .iter()
            .zip(&set_params)
            .map(|(col, p)| format!("{col} = {p}"))
            .collect::<Vec<_>>()
            .join(", ");
        // A write whose values all match the row is skipped, so it neither
        // bumps updated_at nor counts as an affected row.
        let update = format!(
            "WITH target AS (SELECT id FROM {table} WHERE id = $1{visible}), \
             changed AS (UPDATE {table} SET {assignments}, updated_at = now() \
             WHERE id = $1{visible} AND ({cols}) IS DISTINCT FROM ({params}) RETURNING id) \
             SELECT EXISTS (SELECT 1 FROM target) AS found, \
             (SELECT COUNT(*) FROM changed) AS rows_affected",
            cols = R::UPDATE_COLUMNS.join(", "),
            params = set_params.join(", "),
        );

        Self {
            list: format!(
                "SELECT {columns} FROM {table} WHERE deleted_at IS NULL ORDER BY created_at"
            ),
            read: format!("SELECT {columns} FROM {table} WHERE id = $1 AND deleted_at IS NULL"),
            soft_delete: format!(
                "UPDATE {table} SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL"
            ),
            insert,
            update,
            columns,
        }
    }
}

#[derive(Debug, FromRow)]
struct UpdateRow {
    found: bool,
    rows_affected: i64,
}

/// PostgreSQL-backed store for one record kind.
pub struct PgStore<R> {
    pub(crate) pool: PgPool,
    pub(crate) deadline: Duration,
    pub(crate) sql: Statements,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> PgStore<R> {
    pub fn new(pool: PgPool, deleted_rows: DeletedRows, deadline: Duration) -> Self {
        Self {
            pool,
            deadline,
            sql: Statements::render::<R>(deleted_rows),
            _record: PhantomData,
        }
    }
}

impl<R> Clone for PgStore<R> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            deadline: self.deadline,
            sql: self.sql.clone(),
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<R: Record> EntityStore<R> for PgStore<R> {
    async fn list(&self) -> AppResult<Vec<R>> {
        with_deadline(self.deadline, async {
            let rows = sqlx::query_as::<_, R>(&self.sql.list)
                .fetch_all(&self.pool)
                .await?;
            Ok::<_, AppError>(rows)
        })
        .await
    }

    async fn create(&self, record: R) -> AppResult<R> {
        let id = record.id();
        let created = with_deadline(self.deadline, async {
            let q = sqlx::query_as::<_, R>(&self.sql.insert).bind(id);
            let row = record.bind_fields(q).fetch_one(&self.pool).await?;
            Ok::<_, AppError>(row)
        })
        .await?;
        debug!(table = R::TABLE, %id, "record created");
        Ok(created)
    }

    async fn read(&self, id: Uuid) -> AppResult<R> {
        with_deadline(self.deadline, async {
            sqlx::query_as::<_, R>(&self.sql.read)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(AppError::NotFound)
        })
        .await
    }

    async fn update_fields(&self, id: Uuid, patch: &R::Patch) -> AppResult<UpdateResult> {
        let row = with_deadline(self.deadline, async {
            let q = sqlx::query_as::<_, UpdateRow>(&self.sql.update).bind(id);
            let row = R::bind_patch(patch, q).fetch_one(&self.pool).await?;
            Ok::<_, AppError>(row)
        })
        .await?;
        let result = UpdateResult {
            rows_affected: u64::try_from(row.rows_affected).unwrap_or_default(),
            found: row.found,
        };
        debug!(table = R::TABLE, %id, ?result, "update_fields");
        Ok(result)
    }

    async fn soft_delete(&self, id: Uuid) -> AppResult<u64> {
        let done = with_deadline(self.deadline, async {
            let done = sqlx::query(&self.sql.soft_delete)
                .bind(id)
                .execute(&self.pool)
                .await?;
            Ok::<_, AppError>(done)
        })
        .await?;
        debug!(table = R::TABLE, %id, rows = done.rows_affected(), "soft_delete");
        Ok(done.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::repo_types::DailyLedger;
    use crate::products::repo_types::Product;

    #[test]
    fn renders_visibility_filtered_reads() {
        let sql = Statements::render::<Product>(DeletedRows::Hidden);
        assert_eq!(
            sql.columns,
            "id, created_at, updated_at, deleted_at, product_name, kcal, proteins, carbs, fats"
        );
        assert!(sql.list.ends_with("FROM products WHERE deleted_at IS NULL ORDER BY created_at"));
        assert!(sql.read.ends_with("WHERE id = $1 AND deleted_at IS NULL"));
        assert_eq!(
            sql.soft_delete,
            "UPDATE products SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL"
        );
    }

    #[test]
    fn insert_binds_id_then_columns() {
        let sql = Statements::render::<Product>(DeletedRows::Hidden);
        assert!(sql.insert.starts_with(
            "INSERT INTO products (id, product_name, kcal, proteins, carbs, fats, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, now(), now())"
        ));
    }

    #[test]
    fn ledger_update_touches_only_nutrition_columns() {
        let sql = Statements::render::<DailyLedger>(DeletedRows::Hidden);
        assert!(sql.update.contains(
            "SET daily_kcal = $2, daily_proteins = $3, daily_carbs = $4, daily_fats = $5, updated_at = now()"
        ));
        assert!(!sql.update.contains("user_id ="));
        assert!(!sql.update.contains("user_date ="));
        assert!(sql.update.contains(
            "(daily_kcal, daily_proteins, daily_carbs, daily_fats) IS DISTINCT FROM ($2, $3, $4, $5)"
        ));
    }

    #[test]
    fn update_visibility_follows_policy() {
        let hidden = Statements::render::<Product>(DeletedRows::Hidden);
        let updatable = Statements::render::<Product>(DeletedRows::Updatable);
        assert_eq!(hidden.update.matches("AND deleted_at IS NULL").count(), 2);
        assert!(!updatable.update.contains("deleted_at"));
    }
}
