use chrono::Utc;
use serde_json::Value;

use crate::cache::ReadCache;
use crate::db::query::{paginate, Filter, ListQuery, Page, PageParams, Sort};
use crate::db::repository::{new_id, to_patch, Repository};
use crate::error::AppError;
use crate::models::blog::{BlogListParams, BlogPost, BlogPostPatch, NewBlogPost, PostStatus};
use crate::models::validation::Checks;
use crate::rendering::markdown::reading_time_minutes;
use crate::services::shared::{clean, ensure_unique, not_found, resolve_slug, stamp};

const SEARCH_FIELDS: &[&str] = &["title", "excerpt", "content"];

fn listing_filter(params: &BlogListParams) -> Filter {
    Filter::new()
        .eq_opt("category", clean(params.category.clone()))
        .eq_opt("tags", clean(params.tag.clone()))
        .eq_opt("featured", params.featured)
        .text(params.q.as_deref().unwrap_or_default(), SEARCH_FIELDS)
}

fn page_params(params: &BlogListParams) -> PageParams {
    PageParams {
        page: params.page,
        limit: params.limit,
    }
}

/// Published posts, newest first. Served from the read cache.
pub async fn list_published(
    repo: &dyn Repository<BlogPost>,
    reads: &ReadCache,
    params: &BlogListParams,
) -> Page<BlogPost> {
    let filter = listing_filter(params).eq("status", PostStatus::Published.as_str());
    let sort = Sort::desc("published_at").then_desc("created_at");
    reads
        .page(repo, &ListQuery::new(filter, sort, &page_params(params)))
        .await
}

/// Every post regardless of status, for the admin panel.
pub async fn list_all(
    repo: &dyn Repository<BlogPost>,
    params: &BlogListParams,
) -> Result<Page<BlogPost>, AppError> {
    let filter = listing_filter(params).eq_opt("status", params.status.map(|s| s.as_str()));
    let query = ListQuery::new(filter, Sort::desc("created_at"), &page_params(params));
    paginate(repo, &query).await
}

/// Fetch a published post by slug and count the view.
pub async fn read_published(repo: &dyn Repository<BlogPost>, slug: &str) -> Result<BlogPost, AppError> {
    let filter = Filter::new()
        .eq("slug", slug)
        .eq("status", PostStatus::Published.as_str());
    let mut post = repo
        .find_one(&filter)
        .await?
        .ok_or_else(|| not_found("Blog post", slug))?;

    match repo.increment(&post.id, "views").await {
        Ok(_) => post.views += 1,
        Err(e) => tracing::warn!(slug, "Failed to count blog post view: {e}"),
    }

    Ok(post)
}

pub async fn get(repo: &dyn Repository<BlogPost>, id: &str) -> Result<BlogPost, AppError> {
    repo.find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Blog post", id))
}

pub async fn create(
    repo: &dyn Repository<BlogPost>,
    reads: &ReadCache,
    input: NewBlogPost,
) -> Result<BlogPost, AppError> {
    let slug = resolve_slug(input.slug.as_deref(), &input.title);

    let mut checks = Checks::new();
    checks.require("title", &input.title);
    if !slug.is_empty() || input.slug.is_some() {
        checks.slug("slug", &slug);
    }
    checks.finish()?;

    ensure_unique(repo, "slug", &slug, None).await?;

    let now = Utc::now();
    let post = BlogPost {
        id: new_id(),
        title: input.title.trim().to_string(),
        slug,
        excerpt: input.excerpt,
        read_time_minutes: reading_time_minutes(&input.content),
        content: input.content,
        category: input.category,
        tags: input.tags,
        author: clean(input.author),
        cover_image: clean(input.cover_image),
        status: input.status,
        featured: input.featured,
        views: 0,
        published_at: (input.status == PostStatus::Published).then_some(now),
        created_at: now,
        updated_at: now,
    };

    repo.insert(&post).await?;
    reads.invalidate::<BlogPost>();
    tracing::info!(id = %post.id, slug = %post.slug, "Blog post created");

    Ok(post)
}

pub async fn update(
    repo: &dyn Repository<BlogPost>,
    reads: &ReadCache,
    id: &str,
    patch: BlogPostPatch,
) -> Result<BlogPost, AppError> {
    let existing = get(repo, id).await?;

    let mut checks = Checks::new();
    checks.not_blank("title", patch.title.as_deref());
    if let Some(slug) = &patch.slug {
        checks.slug("slug", slug);
    }
    checks.finish()?;

    if let Some(slug) = &patch.slug {
        ensure_unique(repo, "slug", slug, Some(id)).await?;
    }

    let patch = BlogPostPatch {
        title: patch.title.map(|t| t.trim().to_string()),
        ..patch
    };

    let now = Utc::now();
    let mut fields = to_patch(&patch)?;
    if let Some(content) = &patch.content {
        fields.insert(
            "read_time_minutes".into(),
            Value::from(reading_time_minutes(content)),
        );
    }
    if patch.status == Some(PostStatus::Published) && existing.published_at.is_none() {
        stamp(&mut fields, "published_at", now);
    }
    stamp(&mut fields, "updated_at", now);

    let updated = repo
        .update(id, fields)
        .await?
        .ok_or_else(|| not_found("Blog post", id))?;
    reads.invalidate::<BlogPost>();

    Ok(updated)
}

pub async fn delete(repo: &dyn Repository<BlogPost>, reads: &ReadCache, id: &str) -> Result<(), AppError> {
    if !repo.delete(id).await? {
        return Err(not_found("Blog post", id));
    }
    reads.invalidate::<BlogPost>();
    tracing::info!(id, "Blog post deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryRepository;

    fn new_post(title: &str, slug: Option<&str>) -> NewBlogPost {
        NewBlogPost {
            title: title.to_string(),
            slug: slug.map(str::to_string),
            content: "Some words here".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_derives_slug_and_read_time() {
        let repo = MemoryRepository::<BlogPost>::new();
        let post = create(&repo, &ReadCache::default(), new_post("Hello, World!", None))
            .await
            .unwrap();

        assert_eq!(post.slug, "hello-world");
        assert_eq!(post.read_time_minutes, 1);
        assert_eq!(post.status, PostStatus::Draft);
        assert!(post.published_at.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_slug_conflicts() {
        let repo = MemoryRepository::<BlogPost>::new();
        let reads = ReadCache::default();
        create(&repo, &reads, new_post("A", Some("a"))).await.unwrap();

        let err = create(&repo, &reads, new_post("Other", Some("a"))).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(repo.count(&Filter::new().eq("slug", "a")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_non_ascii_titles_get_their_own_slugs() {
        let repo = MemoryRepository::<BlogPost>::new();
        let reads = ReadCache::default();

        let first = create(&repo, &reads, new_post("日本語", None)).await.unwrap();
        let second = create(&repo, &reads, new_post("Привет", None)).await.unwrap();

        assert!(!first.slug.is_empty());
        assert_ne!(first.slug, second.slug);
        assert_eq!(repo.count(&Filter::new().eq("slug", "")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_trims_title() {
        let repo = MemoryRepository::<BlogPost>::new();
        let reads = ReadCache::default();
        let post = create(&repo, &reads, new_post("Draft", None)).await.unwrap();

        let patch = BlogPostPatch {
            title: Some("  Launch notes  ".into()),
            ..Default::default()
        };
        let updated = update(&repo, &reads, &post.id, patch).await.unwrap();
        assert_eq!(updated.title, "Launch notes");
    }

    #[tokio::test]
    async fn test_create_validates_fields() {
        let repo = MemoryRepository::<BlogPost>::new();
        let err = create(&repo, &ReadCache::default(), new_post("", Some("Bad Slug")))
            .await
            .unwrap_err();

        let AppError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["title", "slug"]);
    }

    #[tokio::test]
    async fn test_published_at_is_set_once() {
        let repo = MemoryRepository::<BlogPost>::new();
        let reads = ReadCache::default();
        let post = create(&repo, &reads, new_post("Launch", None)).await.unwrap();

        let publish = BlogPostPatch {
            status: Some(PostStatus::Published),
            ..Default::default()
        };
        let first = update(&repo, &reads, &post.id, publish.clone()).await.unwrap();
        let published_at = first.published_at.expect("published_at set");

        let draft = BlogPostPatch {
            status: Some(PostStatus::Draft),
            ..Default::default()
        };
        update(&repo, &reads, &post.id, draft).await.unwrap();
        let again = update(&repo, &reads, &post.id, publish).await.unwrap();
        assert_eq!(again.published_at, Some(published_at));
    }

    #[tokio::test]
    async fn test_update_is_partial_and_recomputes_read_time() {
        let repo = MemoryRepository::<BlogPost>::new();
        let reads = ReadCache::default();
        let post = create(&repo, &reads, new_post("Launch", None)).await.unwrap();

        let patch = BlogPostPatch {
            content: Some("word ".repeat(401)),
            ..Default::default()
        };
        let updated = update(&repo, &reads, &post.id, patch).await.unwrap();
        assert_eq!(updated.title, "Launch");
        assert_eq!(updated.read_time_minutes, 3);
        assert!(updated.updated_at >= post.updated_at);
    }

    #[tokio::test]
    async fn test_public_reads_only_see_published_posts() {
        let repo = MemoryRepository::<BlogPost>::new();
        let reads = ReadCache::default();
        create(&repo, &reads, new_post("Draft", None)).await.unwrap();
        let mut live = new_post("Live", None);
        live.status = PostStatus::Published;
        live.tags = vec!["rust".into()];
        create(&repo, &reads, live).await.unwrap();

        let page = list_published(&repo, &reads, &BlogListParams::default()).await;
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].slug, "live");

        let params = BlogListParams {
            tag: Some("go".into()),
            ..Default::default()
        };
        assert!(list_published(&repo, &reads, &params).await.items.is_empty());

        assert!(matches!(
            read_published(&repo, "draft").await,
            Err(AppError::NotFound(_))
        ));
        let post = read_published(&repo, "live").await.unwrap();
        assert_eq!(post.views, 1);
        assert_eq!(read_published(&repo, "live").await.unwrap().views, 2);
    }

    #[tokio::test]
    async fn test_delete_twice_is_not_found() {
        let repo = MemoryRepository::<BlogPost>::new();
        let reads = ReadCache::default();
        let post = create(&repo, &reads, new_post("Gone", None)).await.unwrap();

        delete(&repo, &reads, &post.id).await.unwrap();
        assert!(matches!(
            delete(&repo, &reads, &post.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
