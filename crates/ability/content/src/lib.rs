//! Data-driven content for the ability runtime.
//!
//! Loaders read RON/TOML data files into `ability-core` types:
//! - Timeline catalogs (RON) → [`TimelineRegistry`](ability_core::TimelineRegistry)
//! - Attribute templates (RON) → [`AttributeSet`](ability_core::AttributeSet)
//! - Simulation configuration (TOML) → [`SimConfig`]
//!
//! Every loader also ships an embedded default catalog compiled in from
//! `data/`, so a simulation can run without any files on disk.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{
    AttributeDef, AttributeTemplate, AttributeTemplateLoader, ConfigLoader, ContentPaths,
    LoadResult, SimConfig, TimelineLoader,
};
