use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson};
use serde_json::Value;

use crate::db::pool::MongoPool;
use crate::db::query::{Filter, Sort};
use crate::db::repository::{Entity, Patch, Repository};
use crate::error::AppError;

const DUPLICATE_KEY: i32 = 11000;

/// MongoDB implementation of the Repository.
pub struct MongoRepository<T> {
    pool: Arc<MongoPool>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> MongoRepository<T> {
    pub fn new(pool: Arc<MongoPool>) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    async fn collection(&self) -> Result<mongodb::Collection<T>, AppError> {
        self.pool.collection::<T>(T::COLLECTION).await
    }
}

fn db_err(e: mongodb::error::Error) -> AppError {
    AppError::Database(e.to_string())
}

/// Map duplicate-key write failures to `Conflict`.
fn write_err<T: Entity>(e: mongodb::error::Error) -> AppError {
    use mongodb::error::{ErrorKind, WriteFailure};

    if let ErrorKind::Write(WriteFailure::WriteError(ref write_error)) = *e.kind {
        if write_error.code == DUPLICATE_KEY {
            return AppError::Conflict(format!(
                "A {} document with the same {} already exists",
                T::COLLECTION,
                T::UNIQUE_FIELDS.join("/")
            ));
        }
    }
    db_err(e)
}

fn to_bson(value: &Value) -> Result<Bson, AppError> {
    mongodb::bson::to_bson(value).map_err(|e| AppError::Internal(e.to_string()))
}

#[async_trait]
impl<T: Entity> Repository<T> for MongoRepository<T> {
    async fn insert(&self, item: &T) -> Result<(), AppError> {
        self.collection()
            .await?
            .insert_one(item)
            .await
            .map_err(write_err::<T>)?;
        Ok(())
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<T>, AppError> {
        self.collection()
            .await?
            .find_one(filter.to_document()?)
            .await
            .map_err(db_err)
    }

    async fn find(
        &self,
        filter: &Filter,
        sort: &Sort,
        skip: u64,
        limit: Option<u64>,
    ) -> Result<Vec<T>, AppError> {
        use mongodb::options::FindOptions;

        let mut options = FindOptions::default();
        if !sort.is_empty() {
            options.sort = Some(sort.to_document());
        }
        if skip > 0 {
            options.skip = Some(skip);
        }
        options.limit = limit.map(|l| l as i64);

        let mut cursor = self
            .collection()
            .await?
            .find(filter.to_document()?)
            .with_options(options)
            .await
            .map_err(db_err)?;

        let mut items = Vec::new();
        while let Some(item) = cursor.try_next().await.map_err(db_err)? {
            items.push(item);
        }

        Ok(items)
    }

    async fn count(&self, filter: &Filter) -> Result<u64, AppError> {
        self.collection()
            .await?
            .count_documents(filter.to_document()?)
            .await
            .map_err(db_err)
    }

    async fn update(&self, id: &str, patch: Patch) -> Result<Option<T>, AppError> {
        use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};

        let collection = self.collection().await?;
        if patch.is_empty() {
            return collection.find_one(doc! { "_id": id }).await.map_err(db_err);
        }

        let set = mongodb::bson::to_document(&patch)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .with_options(options)
            .await
            .map_err(write_err::<T>)
    }

    async fn increment(&self, id: &str, field: &str) -> Result<bool, AppError> {
        let result = self
            .collection()
            .await?
            .update_one(doc! { "_id": id }, doc! { "$inc": { field: 1_i64 } })
            .await
            .map_err(db_err)?;
        Ok(result.matched_count > 0)
    }

    async fn push(&self, id: &str, field: &str, value: Value) -> Result<bool, AppError> {
        let value = to_bson(&value)?;
        let result = self
            .collection()
            .await?
            .update_one(doc! { "_id": id }, doc! { "$push": { field: value } })
            .await
            .map_err(db_err)?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let result = self
            .collection()
            .await?
            .delete_one(doc! { "_id": id })
            .await
            .map_err(db_err)?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_many(&self, filter: &Filter) -> Result<u64, AppError> {
        let result = self
            .collection()
            .await?
            .delete_many(filter.to_document()?)
            .await
            .map_err(db_err)?;
        Ok(result.deleted_count)
    }

    async fn ensure_indexes(&self) -> Result<(), AppError> {
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        let collection = self.collection().await?;
        for &field in T::UNIQUE_FIELDS {
            let model = IndexModel::builder()
                .keys(doc! { field: 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build();
            collection.create_index(model).await.map_err(db_err)?;
            tracing::debug!(collection = T::COLLECTION, field, "Unique index ensured");
        }
        Ok(())
    }
}
