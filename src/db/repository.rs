use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::db::query::{Filter, Sort};
use crate::error::AppError;

/// Field values to overwrite on an existing document.
pub type Patch = Map<String, Value>;

/// A document type persisted in its own collection.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    /// Collection name, also used as the cache tag for reads.
    const COLLECTION: &'static str;

    /// Fields that must be unique across the collection.
    const UNIQUE_FIELDS: &'static [&'static str] = &[];

    fn id(&self) -> &str;
}

/// Generate a new opaque document identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Serialize a partial-update struct into a patch, dropping absent fields.
pub fn to_patch<P: Serialize>(patch: &P) -> Result<Patch, AppError> {
    match serde_json::to_value(patch).map_err(|e| AppError::Internal(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Internal(format!(
            "Patch must serialize to an object, got {other}"
        ))),
    }
}

/// Repository trait for document collections.
///
/// This trait allows swapping the database layer for the in-process store
/// in tests and demo mode.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Insert a new document. Fails with `Conflict` on a unique-key clash.
    async fn insert(&self, item: &T) -> Result<(), AppError>;

    async fn find_one(&self, filter: &Filter) -> Result<Option<T>, AppError>;

    async fn find(
        &self,
        filter: &Filter,
        sort: &Sort,
        skip: u64,
        limit: Option<u64>,
    ) -> Result<Vec<T>, AppError>;

    async fn count(&self, filter: &Filter) -> Result<u64, AppError>;

    /// Overwrite the fields present in `patch`. Returns the updated
    /// document, or `None` when the id does not exist.
    async fn update(&self, id: &str, patch: Patch) -> Result<Option<T>, AppError>;

    /// Atomically add one to a numeric field.
    async fn increment(&self, id: &str, field: &str) -> Result<bool, AppError>;

    /// Atomically append a value to an array field.
    async fn push(&self, id: &str, field: &str, value: Value) -> Result<bool, AppError>;

    /// Returns `false` when nothing was deleted.
    async fn delete(&self, id: &str) -> Result<bool, AppError>;

    async fn delete_many(&self, filter: &Filter) -> Result<u64, AppError>;

    /// Create the unique indexes declared by the entity.
    async fn ensure_indexes(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<T>, AppError> {
        self.find_one(&Filter::new().eq("_id", id)).await
    }

    async fn find_all(&self, filter: &Filter, sort: &Sort) -> Result<Vec<T>, AppError> {
        self.find(filter, sort, 0, None).await
    }
}
