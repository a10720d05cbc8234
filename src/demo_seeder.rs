use crate::db::query::Filter;
use crate::error::AppError;
use crate::models::blog::{NewBlogPost, PostStatus};
use crate::models::form::{FieldKind, FormField, FormSettings, NewForm, ValidationRules};
use crate::models::job::{JobStatus, NewJob};
use crate::models::legal::LegalPageInput;
use crate::models::testimonial::NewTestimonial;
use crate::models::work::{NewWork, WorkStat, WorkStatus};
use crate::services;
use crate::state::AppState;

/// Fill an empty store with sample content for demo mode.
///
/// Items that already exist (same slug) are skipped, so seeding twice is
/// harmless.
pub async fn seed_demo_data(state: &AppState) {
    tracing::info!("Starting demo data seeding...");

    let results = [
        ("blog", seed_posts(state).await),
        ("works", seed_works(state).await),
        ("testimonials", seed_testimonials(state).await),
        ("jobs", seed_jobs(state).await),
        ("forms", seed_forms(state).await),
        ("legal", seed_legal(state).await),
    ];

    for (section, result) in results {
        match result {
            Ok(count) => tracing::info!(section, count, "Demo content seeded"),
            Err(e) => tracing::error!(section, "Failed to seed demo content: {e}"),
        }
    }
}

/// Conflicts mean the item is already there.
fn skip_existing<T>(result: Result<T, AppError>) -> Result<usize, AppError> {
    match result {
        Ok(_) => Ok(1),
        Err(AppError::Conflict(_)) => Ok(0),
        Err(e) => Err(e),
    }
}

async fn seed_posts(state: &AppState) -> Result<usize, AppError> {
    let posts = [
        (
            "Designing for conversion",
            "design",
            "What a decade of landing pages taught us.",
            include_str!("../demo_data/designing_for_conversion.md"),
            true,
        ),
        (
            "Our stack in 2026",
            "engineering",
            "The tools we reach for on every client project.",
            include_str!("../demo_data/our_stack.md"),
            false,
        ),
    ];

    let mut seeded = 0;
    for (title, category, excerpt, content, featured) in posts {
        let input = NewBlogPost {
            title: title.to_string(),
            excerpt: excerpt.to_string(),
            content: content.to_string(),
            category: category.to_string(),
            tags: vec![category.to_string()],
            author: Some("Agency Team".to_string()),
            status: PostStatus::Published,
            featured,
            ..Default::default()
        };
        seeded += skip_existing(
            services::blog::create(state.repos.posts.as_ref(), &state.reads, input).await,
        )?;
    }
    Ok(seeded)
}

async fn seed_works(state: &AppState) -> Result<usize, AppError> {
    let works = [
        ("Northwind rebrand", "branding", "Northwind", "+38%", "qualified leads"),
        ("Harbor checkout", "e-commerce", "Harbor Goods", "-22%", "cart abandonment"),
    ];

    let mut seeded = 0;
    for (order, (title, category, client, value, label)) in works.into_iter().enumerate() {
        let input = NewWork {
            title: title.to_string(),
            category: category.to_string(),
            client: Some(client.to_string()),
            description: format!("Case study for {client}."),
            stats: vec![WorkStat {
                label: label.to_string(),
                value: value.to_string(),
            }],
            tags: vec![category.to_string()],
            status: WorkStatus::Published,
            order: order as i32,
            ..Default::default()
        };
        seeded += skip_existing(
            services::works::create(state.repos.works.as_ref(), &state.reads, input).await,
        )?;
    }
    Ok(seeded)
}

async fn seed_testimonials(state: &AppState) -> Result<usize, AppError> {
    // Testimonials have no natural key, only seed an empty collection.
    let existing = state.repos.testimonials.count(&Filter::new()).await?;
    if existing > 0 {
        return Ok(0);
    }

    let quotes = [
        ("Maya Chen", "CMO", "Northwind", "They shipped in six weeks what we had planned for a quarter."),
        ("Tom Okafor", "Founder", "Harbor Goods", "Clear communication and a great eye for detail."),
    ];

    for (author, role, company, quote) in quotes {
        let input = NewTestimonial {
            author: author.to_string(),
            role: role.to_string(),
            company: company.to_string(),
            quote: quote.to_string(),
            rating: Some(5),
            avatar: None,
        };
        services::testimonials::create(state.repos.testimonials.as_ref(), &state.reads, input)
            .await?;
    }
    Ok(quotes.len())
}

async fn seed_jobs(state: &AppState) -> Result<usize, AppError> {
    let existing = state.repos.jobs.count(&Filter::new()).await?;
    if existing > 0 {
        return Ok(0);
    }

    let jobs = [
        ("Senior Frontend Engineer", "Engineering", "Remote (EU)"),
        ("Brand Designer", "Design", "Lisbon"),
    ];

    for (order, (title, department, location)) in jobs.into_iter().enumerate() {
        let input = NewJob {
            title: title.to_string(),
            department: department.to_string(),
            location: location.to_string(),
            description: format!("Join our {department} team."),
            requirements: vec!["3+ years of relevant experience".to_string()],
            status: JobStatus::Published,
            order: order as i32,
            ..Default::default()
        };
        services::jobs::create(state.repos.jobs.as_ref(), &state.reads, input).await?;
    }
    Ok(jobs.len())
}

fn field(id: &str, label: &str, kind: FieldKind, required: bool) -> FormField {
    FormField {
        id: id.to_string(),
        label: label.to_string(),
        kind,
        placeholder: None,
        help_text: None,
        options: vec![],
        validation: ValidationRules {
            required,
            ..Default::default()
        },
    }
}

async fn seed_forms(state: &AppState) -> Result<usize, AppError> {
    let mut budget = field("budget", "Budget", FieldKind::Select, false);
    budget.options = vec!["< 10k".into(), "10k - 50k".into(), "> 50k".into()];

    let input = NewForm {
        title: "Project brief".to_string(),
        slug: Some("project-brief".to_string()),
        description: "Tell us about your project.".to_string(),
        fields: vec![
            field("name", "Name", FieldKind::Text, true),
            field("email", "Email", FieldKind::Email, true),
            budget,
            field("details", "Project details", FieldKind::Textarea, true),
        ],
        settings: FormSettings::default(),
    };

    skip_existing(services::forms::create(state.repos.forms.as_ref(), &state.reads, input).await)
}

async fn seed_legal(state: &AppState) -> Result<usize, AppError> {
    let pages = [
        ("privacy", "Privacy Policy", include_str!("../demo_data/privacy.md")),
        ("terms", "Terms of Service", include_str!("../demo_data/terms.md")),
    ];

    for (slug, title, content) in pages {
        let input = LegalPageInput {
            title: Some(title.to_string()),
            content: Some(content.to_string()),
        };
        services::legal::upsert(state.repos.legal.as_ref(), slug, input).await?;
    }
    Ok(pages.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::email::mailer::DisabledMailer;
    use crate::state::Repositories;
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(
            Repositories::memory(),
            Arc::new(DisabledMailer),
            Settings::default(),
        )
    }

    #[tokio::test]
    async fn test_seeding_twice_does_not_duplicate() {
        let state = state();
        seed_demo_data(&state).await;
        seed_demo_data(&state).await;

        let all = Filter::new();
        assert_eq!(state.repos.posts.count(&all).await.unwrap(), 2);
        assert_eq!(state.repos.works.count(&all).await.unwrap(), 2);
        assert_eq!(state.repos.testimonials.count(&all).await.unwrap(), 2);
        assert_eq!(state.repos.jobs.count(&all).await.unwrap(), 2);
        assert_eq!(state.repos.forms.count(&all).await.unwrap(), 1);
        assert_eq!(state.repos.legal.count(&all).await.unwrap(), 2);
    }
}
