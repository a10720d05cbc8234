//! Transactional email bodies, authored in Markdown.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::email::mailer::EmailMessage;
use crate::models::contact::ContactSubmission;
use crate::models::form::Form;
use crate::models::job::JobApplication;

/// Link a subscriber can follow to stop receiving the newsletter.
pub fn unsubscribe_url(site_url: &str, email: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(email.as_bytes()).collect();
    format!("{site_url}/newsletter/unsubscribe?email={encoded}")
}

fn quote(text: &str) -> String {
    text.lines()
        .map(|line| format!("> {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn contact_acknowledgement(contact: &ContactSubmission) -> EmailMessage {
    let body = format!(
        "Hi {name},\n\n\
         Thanks for getting in touch. We received your message and will get back to you shortly.\n\n\
         {quoted}\n\n\
         The Agency team",
        name = contact.name,
        quoted = quote(&contact.message),
    );
    EmailMessage::from_markdown(&contact.email, "We received your message", &body)
}

/// Alert for the site owner about a new contact submission.
pub fn contact_alert(admin_email: &str, contact: &ContactSubmission) -> EmailMessage {
    let mut body = format!("**From:** {} <{}>\n\n", contact.name, contact.email);
    if let Some(company) = &contact.company {
        body.push_str(&format!("**Company:** {company}\n\n"));
    }
    if let Some(service) = &contact.service {
        body.push_str(&format!("**Service:** {service}\n\n"));
    }
    body.push_str(&quote(&contact.message));

    EmailMessage::from_markdown(
        admin_email,
        &format!("New contact from {}", contact.name),
        &body,
    )
}

pub fn contact_reply(contact: &ContactSubmission, subject: Option<&str>, message: &str) -> EmailMessage {
    let body = format!(
        "Hi {name},\n\n{message}\n\n---\n\nYou wrote:\n\n{quoted}",
        name = contact.name,
        quoted = quote(&contact.message),
    );
    EmailMessage::from_markdown(
        &contact.email,
        subject.unwrap_or("Re: your message"),
        &body,
    )
}

pub fn application_acknowledgement(application: &JobApplication) -> EmailMessage {
    let body = format!(
        "Hi {name},\n\n\
         Thank you for applying for the **{title}** position. \
         Our team will review your application and contact you if there is a match.\n\n\
         The Agency team",
        name = application.name,
        title = application.job_title,
    );
    EmailMessage::from_markdown(
        &application.email,
        &format!("Your application for {}", application.job_title),
        &body,
    )
}

pub fn application_alert(admin_email: &str, application: &JobApplication) -> EmailMessage {
    let mut body = format!(
        "**Position:** {}\n\n**Candidate:** {} <{}>\n\n",
        application.job_title, application.name, application.email
    );
    if let Some(resume) = &application.resume_url {
        body.push_str(&format!("**Resume:** {resume}\n\n"));
    }
    if !application.cover_letter.is_empty() {
        body.push_str(&quote(&application.cover_letter));
    }
    EmailMessage::from_markdown(
        admin_email,
        &format!("New application: {}", application.job_title),
        &body,
    )
}

fn answer_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(answer_text).collect::<Vec<_>>().join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Submission summary sent to the form's `notify_email`, in field order.
pub fn form_submission(to: &str, form: &Form, answers: &BTreeMap<String, Value>) -> EmailMessage {
    let mut body = format!("New submission for **{}**.\n\n", form.title);
    for field in &form.fields {
        if let Some(value) = answers.get(&field.id) {
            body.push_str(&format!("- **{}:** {}\n", field.label, answer_text(value)));
        }
    }
    EmailMessage::from_markdown(to, &format!("New submission: {}", form.title), &body)
}

pub fn newsletter_welcome(email: &str, site_url: &str) -> EmailMessage {
    let body = format!(
        "Welcome aboard!\n\n\
         You are now subscribed to our newsletter. Expect occasional notes on our latest work and articles.\n\n\
         [Unsubscribe]({})",
        unsubscribe_url(site_url, email),
    );
    EmailMessage::from_markdown(email, "Welcome to our newsletter", &body)
}

/// A broadcast issue with the unsubscribe footer appended.
pub fn newsletter_issue(email: &str, subject: &str, content: &str, site_url: &str) -> EmailMessage {
    let body = format!(
        "{content}\n\n---\n\nYou receive this email because you subscribed at {site_url}. \
         [Unsubscribe]({})",
        unsubscribe_url(site_url, email),
    );
    EmailMessage::from_markdown(email, subject, &body)
}
