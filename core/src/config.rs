//! Runtime configuration: exclusion lists and the database taxonomy.
//!
//! The source system filtered administrative and test accounts inside its
//! SQL text. Here exclusions are a configuration input applied once, at
//! pipeline level, before normalization — never encoded in a query.
//!
//! A missing or unreadable configuration file is fatal: the run aborts
//! before any rollup is attempted.

use crate::classifier::Taxonomy;
use crate::types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExclusionConfig {
    /// Administrative/test account ids, dropped from both datasets.
    pub excluded_user_ids: BTreeSet<UserId>,
    /// Internal institution names, dropped from both datasets.
    pub excluded_institutions: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct StatsConfig {
    pub exclusions: ExclusionConfig,
    pub taxonomy: Taxonomy,
}

impl StatsConfig {
    /// Load configuration from `data_dir` (exclusions.json, taxonomy.json).
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let exclusions_path = format!("{data_dir}/exclusions.json");
        let raw = std::fs::read_to_string(&exclusions_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {exclusions_path}: {e}"))?;
        let exclusions: ExclusionConfig = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Cannot parse {exclusions_path}: {e}"))?;

        let taxonomy_path = format!("{data_dir}/taxonomy.json");
        let raw = std::fs::read_to_string(&taxonomy_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {taxonomy_path}: {e}"))?;
        let taxonomy: Taxonomy = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Cannot parse {taxonomy_path}: {e}"))?;

        Ok(Self {
            exclusions,
            taxonomy,
        })
    }

    /// Built-in defaults mirroring data/*.json. Used by tests.
    ///
    /// The excluded sets are the superset across the source revisions:
    /// earlier revisions excluded {1178, 1922, 367}; later ones added 274,
    /// 594, 896, 904 and the "probesys2 probesys" institution.
    pub fn default_builtin() -> Self {
        Self {
            exclusions: ExclusionConfig {
                excluded_user_ids: [1178, 1922, 367, 274, 594, 896, 904].into_iter().collect(),
                excluded_institutions: [
                    "EUROFIDAI",
                    "administrateur Drupal",
                    "probesys2 probesys",
                ]
                .into_iter()
                .map(String::from)
                .collect(),
            },
            taxonomy: Taxonomy::default_builtin(),
        }
    }
}
