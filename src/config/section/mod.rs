//! Configuration section definitions.
//!
//! Each module corresponds to a section in `mdpages.toml`:
//!
//! | Module   | TOML Section | Purpose                                 |
//! |----------|--------------|-----------------------------------------|
//! | `build`  | `[build]`    | Source/output roots, file suffixes      |
//! | `serve`  | `[serve]`    | Preview server and live-reload ports    |
//! | `watch`  | `[watch]`    | Debounce interval                       |
//! | `render` | `[render]`   | External diagram renderer command       |

mod build;
mod render;
mod serve;
mod watch;

pub use build::BuildSectionConfig;
pub use render::RenderConfig;
pub use serve::ServeConfig;
pub use watch::WatchConfig;
