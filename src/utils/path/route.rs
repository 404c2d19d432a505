//! URL processing utilities.
//!
//! - Link type detection (external vs local attachment)
//! - Preview URL generation for files under the served root

use std::path::Path;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters escaped inside a single URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Check if a link is external (has a URL scheme like http:, mailto:, etc.)
///
/// A valid scheme must:
/// - Have at least 1 character before the colon
/// - Only contain ASCII alphanumeric or `+`, `-`, `.`
///
/// # Examples
/// ```ignore
/// assert!(is_external_link("https://example.com/logo.png"));
/// assert!(!is_external_link("diagram.png"));
/// ```
#[inline]
pub fn is_external_link(link: &str) -> bool {
    link.find(':').is_some_and(|pos| {
        pos > 0
            && link[..pos]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Build the URL path (leading `/`, percent-encoded segments) of a file
/// relative to the served root.
///
/// Returns `None` if `file` is not under `root`.
///
/// # Examples
/// ```ignore
/// url_for_relative(Path::new("/out"), Path::new("/out/intro/intro.html"))
///     == Some("/intro/intro.html".into())
/// ```
pub fn url_for_relative(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let mut url = String::new();
    for component in relative.components() {
        url.push('/');
        let segment = component.as_os_str().to_string_lossy();
        url.extend(utf8_percent_encode(&segment, SEGMENT));
    }
    if url.is_empty() {
        url.push('/');
    }
    Some(url)
}
