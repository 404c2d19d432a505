//! Markdown rendering via `pulldown-cmark`.

use anyhow::{Context, Result};
use pulldown_cmark::{Event, Options, Parser, Tag, html};

use super::MarkupRenderer;

/// GitHub-flavoured extensions enabled for every page.
fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownRenderer;

impl MarkupRenderer for MarkdownRenderer {
    fn render_markup(&self, source: &[u8]) -> Result<Vec<u8>> {
        let text = std::str::from_utf8(source).context("page content is not valid UTF-8")?;

        let mut out = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut out, Parser::new_ext(text, options()));
        Ok(out.into_bytes())
    }
}

/// Image destinations referenced by a page, in document order.
///
/// Includes external URLs; callers filter with `is_external_link`.
pub fn image_links(source: &str) -> Vec<String> {
    Parser::new_ext(source, options())
        .filter_map(|event| match event {
            Event::Start(Tag::Image { dest_url, .. }) => Some(dest_url.into_string()),
            _ => None,
        })
        .collect()
}
