//! Feature ledger types.

use serde::{Deserialize, Serialize};

/// One tracked unit of work.
///
/// Every field defaults so that a partially written entry still parses.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Feature {
    pub id: String,
    pub title: String,
    pub status: String,
    pub tested: bool,
    pub last_commit: Option<String>,
}

/// The ordered feature list (`feature-list.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeatureList {
    pub features: Vec<Feature>,
}

impl FeatureList {
    /// Number of features marked tested.
    pub fn tested_count(&self) -> usize {
        self.features.iter().filter(|f| f.tested).count()
    }

    /// The most recently registered feature.
    pub fn last(&self) -> Option<&Feature> {
        self.features.last()
    }

    /// Find a feature by id.
    pub fn get(&self, id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }
}
