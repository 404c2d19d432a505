//! Content types for what ends up in the output tree.
//!
//! The preview server only ever sees rendered pages, diagram images and the
//! live-reload script; anything else is served as opaque bytes.

use std::path::Path;

pub mod types {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Content-Type header value for `path`, by extension, case-insensitively.
pub fn from_path(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return types::OCTET_STREAM;
    };

    match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => types::HTML,
        "js" => types::JAVASCRIPT,
        "txt" => types::PLAIN,
        "css" => "text/css; charset=utf-8",
        "json" => "application/json",
        // Formats plantuml can be told to emit
        "png" => "image/png",
        "svg" => "image/svg+xml",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => types::OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(from_path(Path::new("intro/intro.html")), types::HTML);
        assert_eq!(from_path(Path::new("intro/flow.PNG")), "image/png");
        assert_eq!(from_path(Path::new("sequence.svg")), "image/svg+xml");
        assert_eq!(from_path(Path::new("__livereload.js")), types::JAVASCRIPT);
        assert_eq!(from_path(Path::new("notes.xyz")), types::OCTET_STREAM);
        assert_eq!(from_path(Path::new("Makefile")), types::OCTET_STREAM);
    }
}
