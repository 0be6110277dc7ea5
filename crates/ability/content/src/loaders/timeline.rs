//! Timeline catalog loader.

use std::collections::HashSet;
use std::path::Path;

use ability_core::{Timeline, TimelineRegistry};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::loaders::{LoadResult, read_file};

/// Timeline catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineCatalog {
    pub timelines: Vec<Timeline>,
}

/// Loader for timeline catalogs from RON files.
pub struct TimelineLoader;

impl TimelineLoader {
    /// Load timelines from a RON file.
    pub fn load(path: &Path) -> LoadResult<Vec<Timeline>> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    /// Parse a RON timeline catalog.
    pub fn parse(content: &str) -> LoadResult<Vec<Timeline>> {
        let catalog: TimelineCatalog = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse timeline catalog RON: {}", e))?;
        Ok(catalog.timelines)
    }

    /// Timelines compiled into the crate.
    pub fn embedded() -> LoadResult<Vec<Timeline>> {
        Self::parse(include_str!("../../data/timelines.ron"))
    }

    /// Builds a registry, rejecting catalogs that declare an id twice.
    ///
    /// Marker issues (markers past the end, repeated names) do not fail the
    /// load; the registry logs them as each timeline is registered.
    pub fn into_registry(timelines: Vec<Timeline>) -> LoadResult<TimelineRegistry> {
        let mut seen = HashSet::new();
        for timeline in &timelines {
            if !seen.insert(timeline.id.as_str()) {
                anyhow::bail!("Duplicate timeline id in catalog: {}", timeline.id);
            }
        }
        let mut registry = TimelineRegistry::new();
        for timeline in timelines {
            registry.register(timeline);
        }
        debug!(target: "ability_content", count = registry.len(), "timeline catalog loaded");
        Ok(registry)
    }

    /// Load a RON file straight into a registry.
    pub fn load_registry(path: &Path) -> LoadResult<TimelineRegistry> {
        Self::into_registry(Self::load(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CATALOG: &str = r#"(
        timelines: [
            (id: "jab", total_duration: 200, markers: [(name: "hit", at: 50)]),
            (id: "wait", total_duration: 100),
        ],
    )"#;

    #[test]
    fn parses_catalog_with_optional_markers() {
        let timelines = TimelineLoader::parse(CATALOG).unwrap();
        assert_eq!(timelines.len(), 2);
        assert_eq!(timelines[0].marker("hit").map(|m| m.at), Some(50));
        assert!(timelines[1].markers.is_empty());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let timelines = vec![Timeline::new("a", 10), Timeline::new("a", 20)];
        let err = TimelineLoader::into_registry(timelines).unwrap_err();
        assert!(err.to_string().contains("Duplicate timeline id"));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();
        let registry = TimelineLoader::load_registry(file.path()).unwrap();
        assert!(registry.contains("jab"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = TimelineLoader::load(Path::new("/nonexistent/timelines.ron")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/timelines.ron"));
    }

    #[test]
    fn embedded_catalog_is_valid() {
        let timelines = TimelineLoader::embedded().unwrap();
        assert!(timelines.iter().all(|t| t.validate().is_empty()));
        let registry = TimelineLoader::into_registry(timelines).unwrap();
        assert!(registry.contains("fireball"));
    }
}
