use serde::{Deserialize, Serialize};

use crate::ids::{AbilityId, ActorId};

/// Identity of one granted ability, shared with its components and actions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityInfo {
    /// Instance id, unique per grant.
    pub id: AbilityId,
    /// Configuration the ability was built from. Several grants may share it.
    pub config_id: String,
    /// Actor holding the ability.
    pub owner: ActorId,
    /// Actor that caused the grant (e.g. the caster of a buff), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ActorId>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl AbilityInfo {
    pub fn new(id: AbilityId, config_id: impl Into<String>, owner: ActorId) -> Self {
        Self {
            id,
            config_id: config_id.into(),
            owner,
            source: None,
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: ActorId) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Key stamped on modifiers registered on behalf of this ability.
    pub fn source_key(&self) -> String {
        self.id.source_key()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
