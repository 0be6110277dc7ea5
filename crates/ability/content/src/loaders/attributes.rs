//! Attribute template loader.

use std::path::Path;

use ability_core::{AttributeSet, RuntimeConfig};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// One attribute definition inside a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub name: String,
    pub base: f64,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

/// Named starting attributes for a class of actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeTemplate {
    pub id: String,
    pub attributes: Vec<AttributeDef>,
}

impl AttributeTemplate {
    /// Builds a fresh attribute set with every definition applied in order.
    pub fn build(&self, config: &RuntimeConfig) -> AttributeSet {
        let mut set = AttributeSet::with_config(config.clone());
        for def in &self.attributes {
            set.define_attribute(def.name.clone(), def.base, def.min, def.max);
        }
        set
    }
}

/// Attribute template catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeCatalog {
    pub templates: Vec<AttributeTemplate>,
}

/// Loader for attribute templates from RON files.
pub struct AttributeTemplateLoader;

impl AttributeTemplateLoader {
    /// Load templates from a RON file.
    pub fn load(path: &Path) -> LoadResult<Vec<AttributeTemplate>> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<Vec<AttributeTemplate>> {
        let catalog: AttributeCatalog = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse attribute catalog RON: {}", e))?;
        Ok(catalog.templates)
    }

    /// Templates compiled into the crate.
    pub fn embedded() -> LoadResult<Vec<AttributeTemplate>> {
        Self::parse(include_str!("../../data/attributes.ron"))
    }

    /// Looks up a template by id.
    pub fn find<'a>(
        templates: &'a [AttributeTemplate],
        id: &str,
    ) -> LoadResult<&'a AttributeTemplate> {
        templates
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| anyhow::anyhow!("Attribute template not found: {}", id))
    }
}
