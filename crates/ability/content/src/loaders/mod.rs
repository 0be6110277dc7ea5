//! Content loaders for reading runtime data from files.

pub mod attributes;
pub mod config;
pub mod timeline;

pub use attributes::{AttributeDef, AttributeTemplate, AttributeTemplateLoader};
pub use config::{ConfigLoader, ContentPaths, SimConfig};
pub use timeline::TimelineLoader;

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
