use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::db::query::{Filter, Sort};
use crate::db::repository::{Entity, Patch, Repository};
use crate::error::AppError;

/// In-process repository used by tests and demo mode.
///
/// Documents are kept in their serialized form so filtering, sorting and
/// patching behave like the MongoDB adapter.
pub struct MemoryRepository<T> {
    documents: Mutex<Vec<Value>>,
    _entity: std::marker::PhantomData<fn() -> T>,
}

impl<T: Entity> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(Vec::new()),
            _entity: std::marker::PhantomData,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Value>>, AppError> {
        self.documents
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".into()))
    }

    fn decode(value: &Value) -> Result<T, AppError> {
        serde_json::from_value(value.clone()).map_err(|e| AppError::Database(e.to_string()))
    }

    fn conflicts(documents: &[Value], candidate: &Value, skip_id: Option<&Value>) -> bool {
        T::UNIQUE_FIELDS.iter().any(|field| {
            let Some(value) = candidate.get(*field) else {
                return false;
            };
            documents.iter().any(|doc| {
                doc.get("_id") != skip_id && doc.get(*field) == Some(value)
            })
        })
    }

    fn conflict_error() -> AppError {
        AppError::Conflict(format!(
            "A {} document with the same {} already exists",
            T::COLLECTION,
            T::UNIQUE_FIELDS.join("/")
        ))
    }
}

fn id_matches(doc: &Value, id: &str) -> bool {
    doc.get("_id").and_then(Value::as_str) == Some(id)
}

/// Assign `value` at a dotted path, creating intermediate objects the way
/// MongoDB's `$set` does.
fn set_path(fields: &mut serde_json::Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            fields.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = fields
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Default::default()));
            if !child.is_object() {
                *child = Value::Object(Default::default());
            }
            if let Value::Object(nested) = child {
                set_path(nested, rest, value);
            }
        }
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for MemoryRepository<T> {
    async fn insert(&self, item: &T) -> Result<(), AppError> {
        let value = serde_json::to_value(item).map_err(|e| AppError::Internal(e.to_string()))?;
        let mut documents = self.lock()?;

        if documents.iter().any(|doc| id_matches(doc, item.id())) {
            return Err(AppError::Conflict(format!("Duplicate id '{}'", item.id())));
        }
        if Self::conflicts(&documents, &value, None) {
            return Err(Self::conflict_error());
        }

        documents.push(value);
        Ok(())
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<T>, AppError> {
        let documents = self.lock()?;
        documents
            .iter()
            .find(|doc| filter.matches(doc))
            .map(Self::decode)
            .transpose()
    }

    async fn find(
        &self,
        filter: &Filter,
        sort: &Sort,
        skip: u64,
        limit: Option<u64>,
    ) -> Result<Vec<T>, AppError> {
        let documents = self.lock()?;
        let mut matching: Vec<&Value> = documents.iter().filter(|doc| filter.matches(doc)).collect();
        matching.sort_by(|a, b| sort.compare(a, b));

        matching
            .into_iter()
            .skip(skip as usize)
            .take(limit.map(|l| l as usize).unwrap_or(usize::MAX))
            .map(Self::decode)
            .collect()
    }

    async fn count(&self, filter: &Filter) -> Result<u64, AppError> {
        let documents = self.lock()?;
        Ok(documents.iter().filter(|doc| filter.matches(doc)).count() as u64)
    }

    async fn update(&self, id: &str, patch: Patch) -> Result<Option<T>, AppError> {
        let mut documents = self.lock()?;
        let Some(index) = documents.iter().position(|doc| id_matches(doc, id)) else {
            return Ok(None);
        };

        let mut updated = documents[index].clone();
        if let Value::Object(fields) = &mut updated {
            for (key, value) in patch {
                set_path(fields, &key, value);
            }
        }

        let skip_id = documents[index].get("_id").cloned();
        if Self::conflicts(&documents, &updated, skip_id.as_ref()) {
            return Err(Self::conflict_error());
        }

        // Reject patches that would no longer decode before storing them.
        let decoded = Self::decode(&updated)?;
        documents[index] = updated;
        Ok(Some(decoded))
    }

    async fn increment(&self, id: &str, field: &str) -> Result<bool, AppError> {
        let mut documents = self.lock()?;
        let Some(doc) = documents.iter_mut().find(|doc| id_matches(doc, id)) else {
            return Ok(false);
        };
        let current = doc.get(field).and_then(Value::as_i64).unwrap_or(0);
        doc[field] = Value::from(current + 1);
        Ok(true)
    }

    async fn push(&self, id: &str, field: &str, value: Value) -> Result<bool, AppError> {
        let mut documents = self.lock()?;
        let Some(doc) = documents.iter_mut().find(|doc| id_matches(doc, id)) else {
            return Ok(false);
        };
        match doc.get_mut(field) {
            Some(Value::Array(items)) => items.push(value),
            _ => doc[field] = Value::Array(vec![value]),
        }
        Ok(true)
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let mut documents = self.lock()?;
        let before = documents.len();
        documents.retain(|doc| !id_matches(doc, id));
        Ok(documents.len() < before)
    }

    async fn delete_many(&self, filter: &Filter) -> Result<u64, AppError> {
        let mut documents = self.lock()?;
        let before = documents.len();
        documents.retain(|doc| !filter.matches(doc));
        Ok((before - documents.len()) as u64)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    /// Memory repository whose next `count` parks until released.
    pub struct StalledRepository<T> {
        pub inner: MemoryRepository<T>,
        armed: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    impl<T: Entity> StalledRepository<T> {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                inner: MemoryRepository::new(),
                armed: AtomicBool::new(true),
                entered: Notify::new(),
                release: Notify::new(),
            })
        }

        /// Resolves once a reader is parked inside `count`.
        pub async fn stalled(&self) {
            self.entered.notified().await;
        }

        pub fn release(&self) {
            self.release.notify_one();
        }
    }

    #[async_trait]
    impl<T: Entity> Repository<T> for StalledRepository<T> {
        async fn insert(&self, item: &T) -> Result<(), AppError> {
            self.inner.insert(item).await
        }

        async fn find_one(&self, filter: &Filter) -> Result<Option<T>, AppError> {
            self.inner.find_one(filter).await
        }

        async fn find(
            &self,
            filter: &Filter,
            sort: &Sort,
            skip: u64,
            limit: Option<u64>,
        ) -> Result<Vec<T>, AppError> {
            self.inner.find(filter, sort, skip, limit).await
        }

        async fn count(&self, filter: &Filter) -> Result<u64, AppError> {
            let total = self.inner.count(filter).await?;
            if self.armed.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(total)
        }

        async fn update(&self, id: &str, patch: Patch) -> Result<Option<T>, AppError> {
            self.inner.update(id, patch).await
        }

        async fn increment(&self, id: &str, field: &str) -> Result<bool, AppError> {
            self.inner.increment(id, field).await
        }

        async fn push(&self, id: &str, field: &str, value: Value) -> Result<bool, AppError> {
            self.inner.push(id, field, value).await
        }

        async fn delete(&self, id: &str) -> Result<bool, AppError> {
            self.inner.delete(id).await
        }

        async fn delete_many(&self, filter: &Filter) -> Result<u64, AppError> {
            self.inner.delete_many(filter).await
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        #[serde(rename = "_id")]
        id: String,
        slug: String,
        rank: i64,
        #[serde(default)]
        hits: u64,
        #[serde(default)]
        log: Vec<String>,
    }

    impl Entity for Note {
        const COLLECTION: &'static str = "notes";
        const UNIQUE_FIELDS: &'static [&'static str] = &["slug"];

        fn id(&self) -> &str {
            &self.id
        }
    }

    fn note(id: &str, slug: &str, rank: i64) -> Note {
        Note {
            id: id.to_string(),
            slug: slug.to_string(),
            rank,
            hits: 0,
            log: vec![],
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_unique_field() {
        let repo = MemoryRepository::<Note>::new();
        repo.insert(&note("1", "a", 1)).await.unwrap();
        let err = repo.insert(&note("2", "a", 2)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(repo.count(&Filter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_sorts_and_pages() {
        let repo = MemoryRepository::<Note>::new();
        for (i, rank) in [3, 1, 2].iter().enumerate() {
            repo.insert(&note(&i.to_string(), &format!("n{i}"), *rank))
                .await
                .unwrap();
        }

        let sorted = repo
            .find(&Filter::new(), &Sort::asc("rank"), 1, Some(1))
            .await
            .unwrap();
        assert_eq!(sorted.len(), 1);
        assert_eq!(sorted[0].rank, 2);
    }

    #[tokio::test]
    async fn test_update_is_partial() {
        let repo = MemoryRepository::<Note>::new();
        repo.insert(&note("1", "a", 1)).await.unwrap();

        let mut patch = Patch::new();
        patch.insert("rank".into(), Value::from(9));
        let updated = repo.update("1", patch).await.unwrap().unwrap();
        assert_eq!(updated.rank, 9);
        assert_eq!(updated.slug, "a");

        assert!(repo.update("missing", Patch::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_sets_nested_paths() {
        let repo = MemoryRepository::<Note>::new();
        repo.insert(&note("1", "a", 1)).await.unwrap();

        let mut patch = Patch::new();
        patch.insert("meta.flags.pinned".into(), Value::from(true));
        patch.insert("meta.label".into(), Value::from("x"));
        repo.update("1", patch).await.unwrap();

        let mut patch = Patch::new();
        patch.insert("meta.label".into(), Value::from("y"));
        repo.update("1", patch).await.unwrap();

        let stored = repo.lock().unwrap()[0].clone();
        assert_eq!(stored["meta"]["flags"]["pinned"], true);
        assert_eq!(stored["meta"]["label"], "y");
        assert_eq!(stored["slug"], "a");
    }

    #[tokio::test]
    async fn test_update_rejects_unique_clash() {
        let repo = MemoryRepository::<Note>::new();
        repo.insert(&note("1", "a", 1)).await.unwrap();
        repo.insert(&note("2", "b", 1)).await.unwrap();

        let mut patch = Patch::new();
        patch.insert("slug".into(), Value::from("a"));
        let err = repo.update("2", patch).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Re-saving its own slug is fine.
        let mut patch = Patch::new();
        patch.insert("slug".into(), Value::from("b"));
        assert!(repo.update("2", patch).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_increment_and_push() {
        let repo = MemoryRepository::<Note>::new();
        repo.insert(&note("1", "a", 1)).await.unwrap();

        assert!(repo.increment("1", "hits").await.unwrap());
        assert!(repo.increment("1", "hits").await.unwrap());
        assert!(repo.push("1", "log", Value::from("first")).await.unwrap());
        assert!(!repo.increment("nope", "hits").await.unwrap());

        let stored = repo.find_by_id("1").await.unwrap().unwrap();
        assert_eq!(stored.hits, 2);
        assert_eq!(stored.log, vec!["first".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let repo = MemoryRepository::<Note>::new();
        repo.insert(&note("1", "a", 1)).await.unwrap();
        assert!(repo.delete("1").await.unwrap());
        assert!(!repo.delete("1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_many() {
        let repo = MemoryRepository::<Note>::new();
        repo.insert(&note("1", "a", 1)).await.unwrap();
        repo.insert(&note("2", "b", 1)).await.unwrap();
        repo.insert(&note("3", "c", 2)).await.unwrap();

        let removed = repo.delete_many(&Filter::new().eq("rank", 1)).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(repo.count(&Filter::new()).await.unwrap(), 1);
    }
}
