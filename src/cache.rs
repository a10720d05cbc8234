use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::db::query::{paginate, ListQuery, Page};
use crate::db::repository::{Entity, Repository};

/// Cache port for read results.
///
/// Keys are namespaced by tag (`"<tag>:<signature>"`) so a write can purge
/// every cached query of a resource at once. Each tag carries a generation
/// that `invalidate` bumps; `set` is a no-op when the generation observed
/// before the read is no longer current.
pub trait CachePort: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn generation(&self, tag: &str) -> u64;

    /// Store `value` unless `tag` was invalidated after `generation` was read.
    /// Returns whether the value was stored.
    fn set(&self, tag: &str, generation: u64, key: &str, value: Value, ttl: Duration) -> bool;

    /// Drop every entry whose key belongs to `tag`.
    fn invalidate(&self, tag: &str);
}

pub fn cache_key(tag: &str, signature: &str) -> String {
    format!("{tag}:{signature}")
}

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    generations: HashMap<String, u64>,
}

/// Process-local TTL cache with a bounded number of entries.
pub struct MemoryCache {
    max_entries: usize,
    state: Mutex<CacheState>,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl CachePort for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let mut state = self.state.lock().ok()?;
        match state.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                state.entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn generation(&self, tag: &str) -> u64 {
        self.state
            .lock()
            .map(|s| s.generations.get(tag).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn set(&self, tag: &str, generation: u64, key: &str, value: Value, ttl: Duration) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };

        if state.generations.get(tag).copied().unwrap_or(0) != generation {
            tracing::debug!(tag, %key, "Skipping cache write for invalidated generation");
            return false;
        }

        let now = Instant::now();
        let entries = &mut state.entries;
        entries.retain(|_, entry| entry.expires_at > now);
        if entries.len() >= self.max_entries && !entries.contains_key(key) {
            if let Some(victim) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&victim);
            }
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
        true
    }

    fn invalidate(&self, tag: &str) {
        let prefix = format!("{tag}:");
        if let Ok(mut state) = self.state.lock() {
            *state.generations.entry(tag.to_string()).or_insert(0) += 1;
            let before = state.entries.len();
            state.entries.retain(|key, _| !key.starts_with(&prefix));
            tracing::debug!(tag, purged = before - state.entries.len(), "Cache tag invalidated");
        }
    }
}

/// Cached paginated reads over a repository.
///
/// Failures degrade to an empty page so public pages never hard-fail on a
/// database outage; degraded results are not cached.
#[derive(Clone)]
pub struct ReadCache {
    port: Arc<dyn CachePort>,
    ttl: Duration,
}

impl ReadCache {
    pub fn new(port: Arc<dyn CachePort>, ttl: Duration) -> Self {
        Self { port, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn invalidate<T: Entity>(&self) {
        self.port.invalidate(T::COLLECTION);
    }

    pub async fn page<T: Entity>(&self, repo: &dyn Repository<T>, query: &ListQuery) -> Page<T> {
        let key = cache_key(T::COLLECTION, &query.signature());
        let generation = self.port.generation(T::COLLECTION);

        if let Some(hit) = self.port.get(&key) {
            match serde_json::from_value::<Page<T>>(hit) {
                Ok(page) => return page,
                Err(e) => tracing::warn!(%key, "Discarding undecodable cache entry: {e}"),
            }
        }

        match paginate(repo, query).await {
            Ok(page) => {
                match serde_json::to_value(&page) {
                    Ok(value) => {
                        self.port.set(T::COLLECTION, generation, &key, value, self.ttl);
                    }
                    Err(e) => tracing::warn!(%key, "Failed to cache page: {e}"),
                }
                page
            }
            Err(e) => {
                tracing::warn!(collection = T::COLLECTION, "Read failed, serving empty page: {e}");
                Page::empty(query.limit)
            }
        }
    }
}

impl Default for ReadCache {
    fn default() -> Self {
        Self::new(Arc::new(MemoryCache::default()), Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::tests::StalledRepository;
    use crate::db::memory::MemoryRepository;
    use crate::db::query::{Filter, PageParams, Sort};
    use crate::db::pool::MongoPool;
    use crate::db::mongo::MongoRepository;
    use crate::models::testimonial::Testimonial;
    use serde_json::json;

    #[test]
    fn test_get_after_set() {
        let cache = MemoryCache::default();
        cache.set("posts", 0, "posts:abc", json!({"n": 1}), Duration::from_secs(30));
        assert_eq!(cache.get("posts:abc"), Some(json!({"n": 1})));
        assert_eq!(cache.get("posts:other"), None);
    }

    #[test]
    fn test_entries_expire() {
        let cache = MemoryCache::default();
        cache.set("posts", 0, "posts:abc", json!(1), Duration::ZERO);
        assert_eq!(cache.get("posts:abc"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_only_touches_tag() {
        let cache = MemoryCache::default();
        cache.set("posts", 0, "posts:a", json!(1), Duration::from_secs(30));
        cache.set("posts", 0, "posts:b", json!(2), Duration::from_secs(30));
        cache.set("works", 0, "works:a", json!(3), Duration::from_secs(30));

        cache.invalidate("posts");

        assert_eq!(cache.get("posts:a"), None);
        assert_eq!(cache.get("posts:b"), None);
        assert_eq!(cache.get("works:a"), Some(json!(3)));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = MemoryCache::new(2);
        cache.set("t", 0, "t:1", json!(1), Duration::from_secs(10));
        cache.set("t", 0, "t:2", json!(2), Duration::from_secs(20));
        cache.set("t", 0, "t:3", json!(3), Duration::from_secs(30));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("t:1"), None);
    }

    #[test]
    fn test_set_is_dropped_after_invalidate() {
        let cache = MemoryCache::default();
        let before = cache.generation("posts");

        cache.invalidate("posts");

        assert!(!cache.set("posts", before, "posts:a", json!(1), Duration::from_secs(30)));
        assert_eq!(cache.get("posts:a"), None);
        assert_eq!(cache.generation("works"), 0);
        let current = cache.generation("posts");
        assert!(cache.set("posts", current, "posts:a", json!(2), Duration::from_secs(30)));
        assert_eq!(cache.get("posts:a"), Some(json!(2)));
    }

    fn query() -> ListQuery {
        ListQuery::new(Filter::new(), Sort::desc("created_at"), &PageParams::default())
    }

    #[tokio::test]
    async fn test_page_is_served_from_cache_until_invalidated() {
        let repo = MemoryRepository::<Testimonial>::new();
        let reads = ReadCache::new(Arc::new(MemoryCache::default()), Duration::from_secs(60));

        repo.insert(&Testimonial::sample("Ada")).await.unwrap();
        let first = reads.page(&repo, &query()).await;
        assert_eq!(first.pagination.total_count, 1);

        repo.insert(&Testimonial::sample("Grace")).await.unwrap();
        let cached = reads.page(&repo, &query()).await;
        assert_eq!(cached.pagination.total_count, 1);

        reads.invalidate::<Testimonial>();
        let fresh = reads.page(&repo, &query()).await;
        assert_eq!(fresh.pagination.total_count, 2);
    }

    #[tokio::test]
    async fn test_read_racing_a_write_does_not_cache_stale_page() {
        let repo = StalledRepository::<Testimonial>::new();
        let reads = ReadCache::new(Arc::new(MemoryCache::default()), Duration::from_secs(60));

        let reader = {
            let (repo, reads) = (repo.clone(), reads.clone());
            tokio::spawn(async move { reads.page(&*repo, &query()).await })
        };
        repo.stalled().await;

        repo.insert(&Testimonial::sample("Ada")).await.unwrap();
        reads.invalidate::<Testimonial>();
        repo.release();

        let stale = reader.await.unwrap();
        assert_eq!(stale.pagination.total_count, 0);

        let fresh = reads.page(&*repo, &query()).await;
        assert_eq!(fresh.pagination.total_count, 1);
        assert_eq!(fresh.items.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_read_degrades_to_empty_page() {
        let pool = Arc::new(MongoPool::new(None, "agency"));
        let repo = MongoRepository::<Testimonial>::new(pool);
        let port = Arc::new(MemoryCache::default());
        let reads = ReadCache::new(port.clone(), Duration::from_secs(60));

        let page = reads.page(&repo, &query()).await;
        assert!(page.items.is_empty());
        assert_eq!(page.pagination.total_count, 0);
        assert!(!page.pagination.has_next_page);
        assert!(port.is_empty());
    }
}
