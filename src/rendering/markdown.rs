use pulldown_cmark::{html, Event, Options, Parser, TagEnd};

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_SMART_PUNCTUATION
}

/// Render a raw Markdown string to sanitized HTML.
///
/// Supports GitHub Flavored Markdown (GFM) features: tables,
/// footnotes, strikethrough, task lists, and smart punctuation.
/// Scripts, event handlers and other unsafe markup are stripped.
pub fn render_markdown(raw: &str) -> String {
    let parser = Parser::new_ext(raw, options());
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    ammonia::clean(&html_output)
}

/// Flatten Markdown to plain text, one paragraph per block.
pub fn to_plain_text(raw: &str) -> String {
    let mut text = String::new();
    for event in Parser::new_ext(raw, options()) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock) => {
                text.push('\n')
            }
            _ => {}
        }
    }
    text.trim().to_string()
}

/// Estimated reading time at 200 words per minute, never below one minute.
pub fn reading_time_minutes(raw: &str) -> u32 {
    let words = to_plain_text(raw).split_whitespace().count() as u32;
    words.div_ceil(200).max(1)
}
