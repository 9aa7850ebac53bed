use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Definition of one world region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionDefinition {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RegionDataError {
    #[error("failed to read region data: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid region data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("region {0} is defined more than once")]
    DuplicateId(u32),
    #[error("region {0} has an empty name")]
    EmptyName(u32),
}

/// All region definitions, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct RegionDb {
    entries: BTreeMap<u32, RegionDefinition>,
}

impl RegionDb {
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = RegionDefinition>,
    ) -> Result<Self, RegionDataError> {
        let mut entries = BTreeMap::new();
        for def in definitions {
            if def.name.trim().is_empty() {
                return Err(RegionDataError::EmptyName(def.id));
            }
            let id = def.id;
            if entries.insert(id, def).is_some() {
                return Err(RegionDataError::DuplicateId(id));
            }
        }
        Ok(Self { entries })
    }

    pub fn from_json_str(json: &str) -> Result<Self, RegionDataError> {
        let definitions: Vec<RegionDefinition> = serde_json::from_str(json)?;
        Self::from_definitions(definitions)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegionDataError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn entries(&self) -> impl Iterator<Item = &RegionDefinition> {
        self.entries.values()
    }

    pub fn get(&self, id: u32) -> Option<&RegionDefinition> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
