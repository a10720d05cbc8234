use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::Value;

use crate::cache::ReadCache;
use crate::db::query::{paginate, Filter, ListQuery, Page, PageParams, Sort};
use crate::db::repository::{new_id, to_patch, Patch, Repository};
use crate::email::mailer::{deliver, Mailer};
use crate::email::templates;
use crate::error::AppError;
use crate::forms::render::{render_form, RenderedForm};
use crate::forms::validate::{validate_answers, validate_definition};
use crate::models::form::{Form, FormPatch, FormSettingsPatch, FormSubmission, NewForm};
use crate::models::validation::{is_valid_email, Checks};
use crate::services::shared::{ensure_unique, not_found, resolve_slug, stamp};

fn check_notify_email(checks: &mut Checks, notify: Option<&str>) {
    if notify.is_some_and(|email| !is_valid_email(email.trim())) {
        checks.fail("settings.notify_email", "must be a valid email address");
    }
}

/// Flatten a settings patch into `settings.<key>` paths so untouched keys survive.
fn merge_settings(fields: &mut Patch, mut settings: FormSettingsPatch) -> Result<(), AppError> {
    let notify = settings.notify_email.take().map(|email| email.trim().to_string());
    for (key, value) in to_patch(&settings)? {
        fields.insert(format!("settings.{key}"), value);
    }
    match notify {
        Some(email) if email.is_empty() => {
            fields.insert("settings.notify_email".into(), Value::Null);
        }
        Some(email) => {
            fields.insert("settings.notify_email".into(), Value::String(email));
        }
        None => {}
    }
    Ok(())
}

pub async fn list(repo: &dyn Repository<Form>, params: &PageParams) -> Result<Page<Form>, AppError> {
    paginate(repo, &ListQuery::new(Filter::new(), Sort::desc("created_at"), params)).await
}

pub async fn get(repo: &dyn Repository<Form>, id: &str) -> Result<Form, AppError> {
    repo.find_by_id(id).await?.ok_or_else(|| not_found("Form", id))
}

pub async fn create(repo: &dyn Repository<Form>, reads: &ReadCache, input: NewForm) -> Result<Form, AppError> {
    let slug = resolve_slug(input.slug.as_deref(), &input.title);

    let mut checks = Checks::new();
    checks.require("title", &input.title);
    if !slug.is_empty() || input.slug.is_some() {
        checks.slug("slug", &slug);
    }
    check_notify_email(&mut checks, input.settings.notify_email.as_deref());
    checks.finish()?;
    validate_definition(&input.fields)?;

    ensure_unique(repo, "slug", &slug, None).await?;

    let now = Utc::now();
    let form = Form {
        id: new_id(),
        title: input.title.trim().to_string(),
        slug,
        description: input.description,
        fields: input.fields,
        settings: input.settings,
        created_at: now,
        updated_at: now,
    };

    repo.insert(&form).await?;
    reads.invalidate::<Form>();
    tracing::info!(id = %form.id, slug = %form.slug, fields = form.fields.len(), "Form created");

    Ok(form)
}

pub async fn update(
    repo: &dyn Repository<Form>,
    reads: &ReadCache,
    id: &str,
    mut patch: FormPatch,
) -> Result<Form, AppError> {
    let mut checks = Checks::new();
    checks.not_blank("title", patch.title.as_deref());
    if let Some(slug) = &patch.slug {
        checks.slug("slug", slug);
    }
    if let Some(settings) = &patch.settings {
        let notify = settings.notify_email.as_deref().filter(|e| !e.trim().is_empty());
        check_notify_email(&mut checks, notify);
    }
    checks.finish()?;
    if let Some(fields) = &patch.fields {
        validate_definition(fields)?;
    }

    if let Some(slug) = &patch.slug {
        ensure_unique(repo, "slug", slug, Some(id)).await?;
    }

    patch.title = patch.title.map(|t| t.trim().to_string());
    let settings = patch.settings.take();
    let mut fields = to_patch(&patch)?;
    if let Some(settings) = settings {
        merge_settings(&mut fields, settings)?;
    }
    stamp(&mut fields, "updated_at", Utc::now());

    let updated = repo
        .update(id, fields)
        .await?
        .ok_or_else(|| not_found("Form", id))?;
    reads.invalidate::<Form>();

    Ok(updated)
}

/// Delete a form together with all of its submissions.
pub async fn delete(
    forms: &dyn Repository<Form>,
    submissions: &dyn Repository<FormSubmission>,
    reads: &ReadCache,
    id: &str,
) -> Result<(), AppError> {
    if !forms.delete(id).await? {
        return Err(not_found("Form", id));
    }
    let removed = submissions
        .delete_many(&Filter::new().eq("form_id", id))
        .await?;

    reads.invalidate::<Form>();
    reads.invalidate::<FormSubmission>();
    tracing::info!(id, submissions = removed, "Form deleted");
    Ok(())
}

pub async fn list_submissions(
    forms: &dyn Repository<Form>,
    submissions: &dyn Repository<FormSubmission>,
    form_id: &str,
    params: &PageParams,
) -> Result<Page<FormSubmission>, AppError> {
    let form = get(forms, form_id).await?;
    let query = ListQuery::new(
        Filter::new().eq("form_id", form.id.as_str()),
        Sort::desc("submitted_at"),
        params,
    );
    paginate(submissions, &query).await
}

async fn find_active(repo: &dyn Repository<Form>, slug: &str) -> Result<Form, AppError> {
    repo.find_one(&Filter::new().eq("slug", slug))
        .await?
        .filter(|form| form.settings.is_active)
        .ok_or_else(|| not_found("Form", slug))
}

/// Render descriptor for an active form.
pub async fn render(repo: &dyn Repository<Form>, slug: &str) -> Result<RenderedForm, AppError> {
    Ok(render_form(&find_active(repo, slug).await?))
}

/// Validate and store answers for an active form.
///
/// Returns the stored submission and the form's success message. Nothing
/// is written when validation fails.
pub async fn submit(
    forms: &dyn Repository<Form>,
    submissions: &dyn Repository<FormSubmission>,
    mailer: &dyn Mailer,
    slug: &str,
    answers: BTreeMap<String, Value>,
) -> Result<(FormSubmission, String), AppError> {
    let form = find_active(forms, slug).await?;
    let answers = validate_answers(&form, &answers)?;

    let submission = FormSubmission {
        id: new_id(),
        form_id: form.id.clone(),
        answers,
        submitted_at: Utc::now(),
    };
    submissions.insert(&submission).await?;
    tracing::info!(form = %form.slug, id = %submission.id, "Form submission stored");

    if let Some(notify) = form.settings.notify_email.as_deref() {
        deliver(mailer, &templates::form_submission(notify, &form, &submission.answers)).await;
    }

    Ok((submission, form.settings.success_message))
}
