use chrono::{DateTime, Utc};

use crate::db::query::{Filter, Sort};
use crate::db::repository::Repository;
use crate::models::blog::{BlogPost, PostStatus};
use crate::models::work::{Work, WorkStatus};

/// One `<url>` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub path: String,
    pub lastmod: DateTime<Utc>,
    pub changefreq: &'static str,
    pub priority: f32,
}

/// Pages of the marketing site that exist regardless of content.
const STATIC_PAGES: &[(&str, &str, f32)] = &[
    ("/", "weekly", 1.0),
    ("/about", "monthly", 0.8),
    ("/services", "monthly", 0.8),
    ("/works", "weekly", 0.8),
    ("/blog", "daily", 0.8),
    ("/careers", "weekly", 0.6),
    ("/contact", "yearly", 0.5),
    ("/legal/privacy", "yearly", 0.3),
    ("/legal/terms", "yearly", 0.3),
];

fn escape_xml(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Static pages plus published posts and works.
///
/// A failed content query drops that section instead of failing the sitemap.
pub async fn collect_entries(
    posts: &dyn Repository<BlogPost>,
    works: &dyn Repository<Work>,
    now: DateTime<Utc>,
) -> Vec<SitemapEntry> {
    let mut entries: Vec<SitemapEntry> = STATIC_PAGES
        .iter()
        .map(|&(path, changefreq, priority)| SitemapEntry {
            path: path.to_string(),
            lastmod: now,
            changefreq,
            priority,
        })
        .collect();

    let published_posts = Filter::new().eq("status", PostStatus::Published.as_str());
    match posts.find_all(&published_posts, &Sort::desc("published_at")).await {
        Ok(posts) => entries.extend(posts.into_iter().map(|post| SitemapEntry {
            path: format!("/blog/{}", post.slug),
            lastmod: post.updated_at,
            changefreq: "weekly",
            priority: 0.7,
        })),
        Err(e) => tracing::warn!("Sitemap: skipping blog posts: {e}"),
    }

    let published_works = Filter::new().eq("status", WorkStatus::Published.as_str());
    match works.find_all(&published_works, &Sort::asc("order")).await {
        Ok(works) => entries.extend(works.into_iter().map(|work| SitemapEntry {
            path: format!("/works/{}", work.slug),
            lastmod: work.updated_at,
            changefreq: "monthly",
            priority: 0.7,
        })),
        Err(e) => tracing::warn!("Sitemap: skipping works: {e}"),
    }

    entries
}

pub fn render_sitemap(site_url: &str, entries: &[SitemapEntry]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in entries {
        xml.push_str(&format!(
            "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>{}</changefreq>\n    <priority>{:.1}</priority>\n  </url>\n",
            escape_xml(&format!("{site_url}{}", entry.path)),
            entry.lastmod.format("%Y-%m-%d"),
            entry.changefreq,
            entry.priority,
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}

pub fn render_robots(site_url: &str) -> String {
    format!(
        "User-agent: *\nAllow: /\nDisallow: /admin\nDisallow: /api\n\nSitemap: {site_url}/sitemap.xml\n"
    )
}
