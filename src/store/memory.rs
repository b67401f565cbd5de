use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{DeletedRows, EntityStore, Record, UpdateResult};
use crate::error::{AppError, AppResult};

/// In-process store used for local runs (`STORAGE_BACKEND=memory`) and tests.
///
/// Each call holds the table lock for its whole duration, so every operation
/// is atomic with respect to the others.
pub struct MemoryStore<R> {
    pub(crate) rows: Arc<RwLock<HashMap<Uuid, R>>>,
    deleted_rows: DeletedRows,
}

impl<R: Record> MemoryStore<R> {
    pub fn new(deleted_rows: DeletedRows) -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
            deleted_rows,
        }
    }

    /// Inserts under an already held lock, stamping both timestamps.
    pub(crate) fn insert_locked(rows: &mut HashMap<Uuid, R>, mut record: R) -> AppResult<R> {
        let id = record.id();
        if rows.contains_key(&id) {
            return Err(AppError::Constraint(format!(
                "duplicate key {id} in {}",
                R::TABLE
            )));
        }
        let now = OffsetDateTime::now_utc();
        let audit = record.audit_mut();
        audit.created_at = now;
        audit.updated_at = now;
        audit.deleted_at = None;
        rows.insert(id, record.clone());
        Ok(record)
    }
}

impl<R: Record> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new(DeletedRows::Hidden)
    }
}

#[async_trait]
impl<R: Record> EntityStore<R> for MemoryStore<R> {
    async fn list(&self) -> AppResult<Vec<R>> {
        let rows = self.rows.read().await;
        let mut visible: Vec<R> = rows
            .values()
            .filter(|r| !r.audit().is_deleted())
            .cloned()
            .collect();
        visible.sort_by_key(|r| r.audit().created_at);
        Ok(visible)
    }

    async fn create(&self, record: R) -> AppResult<R> {
        let mut rows = self.rows.write().await;
        let created = Self::insert_locked(&mut rows, record)?;
        debug!(table = R::TABLE, id = %created.id(), "record created");
        Ok(created)
    }

    async fn read(&self, id: Uuid) -> AppResult<R> {
        let rows = self.rows.read().await;
        rows.get(&id)
            .filter(|r| !r.audit().is_deleted())
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn update_fields(&self, id: Uuid, patch: &R::Patch) -> AppResult<UpdateResult> {
        let mut rows = self.rows.write().await;
        let target = rows.get_mut(&id).filter(|r| {
            self.deleted_rows == DeletedRows::Updatable || !r.audit().is_deleted()
        });
        let Some(record) = target else {
            return Ok(UpdateResult {
                rows_affected: 0,
                found: false,
            });
        };
        let changed = record.apply_patch(patch);
        if changed {
            record.audit_mut().updated_at = OffsetDateTime::now_utc();
        }
        let result = UpdateResult {
            rows_affected: u64::from(changed),
            found: true,
        };
        debug!(table = R::TABLE, %id, ?result, "update_fields");
        Ok(result)
    }

    async fn soft_delete(&self, id: Uuid) -> AppResult<u64> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&id) {
            Some(record) if !record.audit().is_deleted() => {
                record.audit_mut().deleted_at = Some(OffsetDateTime::now_utc());
                debug!(table = R::TABLE, %id, "soft_delete");
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::Macros;
    use crate::products::repo_types::{Product, ProductPatch};

    fn apple() -> Product {
        Product::new(Uuid::new_v4(), "apple".into(), Macros::new(52, 0, 14, 0))
    }

    #[tokio::test]
    async fn create_stamps_timestamps() {
        let store = MemoryStore::<Product>::default();
        let created = store.create(apple()).await.unwrap();
        assert_ne!(created.audit.created_at, OffsetDateTime::UNIX_EPOCH);
        assert_eq!(created.audit.created_at, created.audit.updated_at);
        assert!(created.audit.deleted_at.is_none());
    }

    #[tokio::test]
    async fn duplicate_id_is_a_constraint_violation() {
        let store = MemoryStore::<Product>::default();
        let p = apple();
        store.create(p.clone()).await.unwrap();
        let err = store.create(p).await.unwrap_err();
        assert!(matches!(err, AppError::Constraint(_)));
    }

    #[tokio::test]
    async fn soft_deleted_rows_disappear_from_reads() {
        let store = MemoryStore::<Product>::default();
        let kept = store.create(apple()).await.unwrap();
        let gone = store.create(apple()).await.unwrap();

        assert_eq!(store.soft_delete(gone.id).await.unwrap(), 1);

        assert!(matches!(store.read(gone.id).await, Err(AppError::NotFound)));
        let listed: Vec<Uuid> = store.list().await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(listed, vec![kept.id]);
        assert_eq!(store.soft_delete(gone.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn deleting_unknown_id_affects_nothing() {
        let store = MemoryStore::<Product>::default();
        assert_eq!(store.soft_delete(Uuid::new_v4()).await.unwrap(), 0);
        assert!(matches!(store.read(Uuid::new_v4()).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn identical_update_is_a_visible_no_op() {
        let store = MemoryStore::<Product>::default();
        let p = store.create(apple()).await.unwrap();
        let patch = ProductPatch {
            name: p.name.clone(),
            per_100g: p.per_100g(),
        };

        let res = store.update_fields(p.id, &patch).await.unwrap();
        assert_eq!(res, UpdateResult { rows_affected: 0, found: true });

        let after = store.read(p.id).await.unwrap();
        assert_eq!(after.audit.updated_at, p.audit.updated_at);
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found() {
        let store = MemoryStore::<Product>::default();
        let patch = ProductPatch {
            name: "pear".into(),
            per_100g: Macros::ZERO,
        };
        let res = store.update_fields(Uuid::new_v4(), &patch).await.unwrap();
        assert_eq!(res, UpdateResult { rows_affected: 0, found: false });
    }

    #[tokio::test]
    async fn update_writes_allowed_fields() {
        let store = MemoryStore::<Product>::default();
        let p = store.create(apple()).await.unwrap();
        let patch = ProductPatch {
            name: "green apple".into(),
            per_100g: Macros::new(48, 1, 12, 0),
        };
        let res = store.update_fields(p.id, &patch).await.unwrap();
        assert_eq!(res.rows_affected, 1);

        let after = store.read(p.id).await.unwrap();
        assert_eq!(after.name, "green apple");
        assert_eq!(after.per_100g(), Macros::new(48, 1, 12, 0));
        assert_eq!(after.audit.created_at, p.audit.created_at);
    }

    #[tokio::test]
    async fn hidden_policy_refuses_to_update_deleted_rows() {
        let store = MemoryStore::<Product>::new(DeletedRows::Hidden);
        let p = store.create(apple()).await.unwrap();
        store.soft_delete(p.id).await.unwrap();

        let patch = ProductPatch {
            name: "pear".into(),
            per_100g: Macros::ZERO,
        };
        let res = store.update_fields(p.id, &patch).await.unwrap();
        assert_eq!(res.outcome(), crate::store::UpdateOutcome::NotFound);
    }

    #[tokio::test]
    async fn updatable_policy_writes_deleted_rows_but_keeps_them_hidden() {
        let store = MemoryStore::<Product>::new(DeletedRows::Updatable);
        let p = store.create(apple()).await.unwrap();
        store.soft_delete(p.id).await.unwrap();

        let patch = ProductPatch {
            name: "pear".into(),
            per_100g: Macros::ZERO,
        };
        let res = store.update_fields(p.id, &patch).await.unwrap();
        assert_eq!(res, UpdateResult { rows_affected: 1, found: true });
        assert!(matches!(store.read(p.id).await, Err(AppError::NotFound)));
        assert!(store.list().await.unwrap().is_empty());
    }
}
