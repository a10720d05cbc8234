use chrono::Utc;

use crate::cache::ReadCache;
use crate::db::query::{paginate, Filter, ListQuery, Page, PageParams, Sort};
use crate::db::repository::{new_id, to_patch, Repository};
use crate::error::AppError;
use crate::models::testimonial::{NewTestimonial, Testimonial, TestimonialPatch, MAX_RATING, MIN_RATING};
use crate::models::validation::Checks;
use crate::services::shared::{clean, not_found, stamp};

/// Returns the rating as stored, or `None` when absent or out of range.
fn check_rating(checks: &mut Checks, rating: Option<i64>) -> Option<u8> {
    let rating = rating?;
    match u8::try_from(rating) {
        Ok(r) if (MIN_RATING..=MAX_RATING).contains(&r) => Some(r),
        _ => {
            checks.fail(
                "rating",
                &format!("must be between {MIN_RATING} and {MAX_RATING}"),
            );
            None
        }
    }
}

fn query(params: &PageParams) -> ListQuery {
    ListQuery::new(Filter::new(), Sort::desc("created_at"), params)
}

pub async fn list_public(
    repo: &dyn Repository<Testimonial>,
    reads: &ReadCache,
    params: &PageParams,
) -> Page<Testimonial> {
    reads.page(repo, &query(params)).await
}

pub async fn list_all(
    repo: &dyn Repository<Testimonial>,
    params: &PageParams,
) -> Result<Page<Testimonial>, AppError> {
    paginate(repo, &query(params)).await
}

pub async fn get(repo: &dyn Repository<Testimonial>, id: &str) -> Result<Testimonial, AppError> {
    repo.find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Testimonial", id))
}

pub async fn create(
    repo: &dyn Repository<Testimonial>,
    reads: &ReadCache,
    input: NewTestimonial,
) -> Result<Testimonial, AppError> {
    let mut checks = Checks::new();
    checks.require("author", &input.author);
    checks.require("quote", &input.quote);
    let rating = check_rating(&mut checks, input.rating);
    checks.finish()?;

    let now = Utc::now();
    let testimonial = Testimonial {
        id: new_id(),
        author: input.author.trim().to_string(),
        role: input.role,
        company: input.company,
        quote: input.quote.trim().to_string(),
        rating: rating.unwrap_or(MAX_RATING),
        avatar: clean(input.avatar),
        created_at: now,
        updated_at: now,
    };

    repo.insert(&testimonial).await?;
    reads.invalidate::<Testimonial>();

    Ok(testimonial)
}

pub async fn update(
    repo: &dyn Repository<Testimonial>,
    reads: &ReadCache,
    id: &str,
    patch: TestimonialPatch,
) -> Result<Testimonial, AppError> {
    let mut checks = Checks::new();
    checks.not_blank("author", patch.author.as_deref());
    checks.not_blank("quote", patch.quote.as_deref());
    check_rating(&mut checks, patch.rating);
    checks.finish()?;

    let mut fields = to_patch(&patch)?;
    stamp(&mut fields, "updated_at", Utc::now());

    let updated = repo
        .update(id, fields)
        .await?
        .ok_or_else(|| not_found("Testimonial", id))?;
    reads.invalidate::<Testimonial>();

    Ok(updated)
}

pub async fn delete(repo: &dyn Repository<Testimonial>, reads: &ReadCache, id: &str) -> Result<(), AppError> {
    if !repo.delete(id).await? {
        return Err(not_found("Testimonial", id));
    }
    reads.invalidate::<Testimonial>();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryRepository;

    fn input(rating: Option<i64>) -> NewTestimonial {
        NewTestimonial {
            author: "Grace".into(),
            quote: "They shipped on time.".into(),
            rating,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_rating_defaults_to_max() {
        let repo = MemoryRepository::<Testimonial>::new();
        let t = create(&repo, &ReadCache::default(), input(None)).await.unwrap();
        assert_eq!(t.rating, MAX_RATING);
    }

    #[tokio::test]
    async fn test_rating_out_of_range() {
        let repo = MemoryRepository::<Testimonial>::new();
        let reads = ReadCache::default();
        for rating in [0, 6, -1] {
            let err = create(&repo, &reads, input(Some(rating))).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(ref e) if e[0].field == "rating"));
        }
        assert_eq!(repo.count(&Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rating_that_would_wrap_is_rejected() {
        let repo = MemoryRepository::<Testimonial>::new();
        let reads = ReadCache::default();
        for rating in [257, 261, i64::MAX] {
            let err = create(&repo, &reads, input(Some(rating))).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(ref e) if e[0].field == "rating"));
        }

        let t = create(&repo, &reads, input(Some(2))).await.unwrap();
        let patch = TestimonialPatch {
            rating: Some(260),
            ..Default::default()
        };
        assert!(matches!(update(&repo, &reads, &t.id, patch).await, Err(AppError::Validation(_))));
        assert_eq!(get(&repo, &t.id).await.unwrap().rating, 2);
    }

    #[tokio::test]
    async fn test_create_then_fetch_round_trips() {
        let repo = MemoryRepository::<Testimonial>::new();
        let created = create(&repo, &ReadCache::default(), input(Some(4))).await.unwrap();
        let fetched = get(&repo, &created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_writes_invalidate_public_listing() {
        let repo = MemoryRepository::<Testimonial>::new();
        let reads = ReadCache::default();
        let params = PageParams::default();

        assert!(list_public(&repo, &reads, &params).await.items.is_empty());
        let t = create(&repo, &reads, input(None)).await.unwrap();
        assert_eq!(list_public(&repo, &reads, &params).await.items.len(), 1);

        let patch = TestimonialPatch {
            rating: Some(3),
            ..Default::default()
        };
        update(&repo, &reads, &t.id, patch).await.unwrap();
        assert_eq!(list_public(&repo, &reads, &params).await.items[0].rating, 3);
    }
}
