//! Path and URL utilities.
//!
//! Pure functions for path manipulation. No side effects.
//!
//! - [`fs`]: Filesystem path normalization and output-path sanitizing
//! - [`route`]: URL utilities (`is_external_link`, `url_for_relative`)

pub mod fs;
pub mod route;

pub use fs::{is_hidden, normalize_path, strip_whitespace};
pub use route::{is_external_link, url_for_relative};
