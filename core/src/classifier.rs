//! Categorical normalization: database taxonomy, lookup mode, interaction
//! labels, month names.
//!
//! RULES:
//!   - Classification is first-match-wins over an ordered pattern list.
//!   - Matching is case-sensitive, exactly as the source data is.
//!   - The pattern list is configuration data (data/taxonomy.json), not
//!     inline logic: the taxonomy visibly evolved over time ("Green Bonds"
//!     arrived in a later revision) and must be editable without a rebuild.
//!   - An unmatched name classifies to None — never to an empty string.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lookup-mode label for historical code searches.
pub const SEARCH_CODE: &str = "Search_Code";
/// Lookup-mode label for direct data extractions.
pub const EXTRACT_DATA: &str = "Extract_Data";

/// Interaction label for type 1.
pub const PREVIEW: &str = "preview";
/// Interaction label for types 2 and 3 (both are downloads).
pub const DOWNLOAD: &str = "download";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

// ── Taxonomy configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Substring match anywhere in the raw name (`LIKE '%x%'`).
    Contains,
    /// Match anchored at the start of the raw name (`LIKE 'x%'`).
    Prefix,
}

/// One ordered classification rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabasePattern {
    pub kind: PatternKind,
    pub pattern: String,
    pub category: String,
}

impl DatabasePattern {
    fn matches(&self, raw_name: &str) -> bool {
        match self.kind {
            PatternKind::Contains => raw_name.contains(self.pattern.as_str()),
            PatternKind::Prefix => raw_name.starts_with(self.pattern.as_str()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Taxonomy {
    /// Ordered: the first matching pattern wins.
    pub database_patterns: Vec<DatabasePattern>,
    /// Raw names containing this marker are historical code lookups.
    pub lookup_marker: String,
}

impl Taxonomy {
    /// The taxonomy as observed in the latest revision of the source
    /// system, duplicates, shadowed branches and label typos included.
    /// ("IEurofidai Indices" is in the data; consolidating it into
    /// "Eurofidai Indices" is an open question, not this layer's call.)
    pub fn default_builtin() -> Self {
        fn contains(pattern: &str, category: &str) -> DatabasePattern {
            DatabasePattern {
                kind: PatternKind::Contains,
                pattern: pattern.to_string(),
                category: category.to_string(),
            }
        }
        fn prefix(pattern: &str, category: &str) -> DatabasePattern {
            DatabasePattern {
                kind: PatternKind::Prefix,
                pattern: pattern.to_string(),
                category: category.to_string(),
            }
        }

        Self {
            database_patterns: vec![
                contains("histo_actions", "Stocks"),
                contains("actions_", "Stocks"),
                contains("indices_telekurs", "Global\\Market Indices"),
                contains("histo_indices_telekurs", "Global\\Market Indices"),
                contains("indices_eurofidai", "Eurofidai Indices"),
                contains("histo_indices_eurofidai", "IEurofidai Indices"),
                contains("corres_code", "Code Mapping Table"),
                contains("fonds_mutuel_", "Mutual Funds"),
                contains("change", "Spot Exchange Rate"),
                contains("histo_ost", "Corporate Events"),
                prefix("ost", "Corporate Events"),
                contains("esg", "ESG"),
                contains("greenbonds", "Green Bonds"),
            ],
            lookup_marker: "histo".to_string(),
        }
    }

    /// Map a raw database identifier to its category. First match wins;
    /// no match is None (the row still counts in numeric rollups, it is
    /// only excluded from per-category breakdowns).
    pub fn classify_database(&self, raw_name: &str) -> Option<&str> {
        self.database_patterns
            .iter()
            .find(|p| p.matches(raw_name))
            .map(|p| p.category.as_str())
    }

    /// Historical code search vs direct data extraction.
    pub fn classify_lookup_mode(&self, raw_name: &str) -> &'static str {
        if raw_name.contains(self.lookup_marker.as_str()) {
            SEARCH_CODE
        } else {
            EXTRACT_DATA
        }
    }

    /// The closed set of category labels this taxonomy can produce.
    pub fn categories(&self) -> BTreeSet<&str> {
        self.database_patterns
            .iter()
            .map(|p| p.category.as_str())
            .collect()
    }
}

// ── Fixed mappings ───────────────────────────────────────────────────────────

/// Interaction code → label. 1 is a preview; 2 and 3 both count as a
/// download. Any other code is unclassified and the row is retained.
pub fn classify_interaction(code: i64) -> Option<&'static str> {
    match code {
        1 => Some(PREVIEW),
        2 | 3 => Some(DOWNLOAD),
        _ => None,
    }
}

/// Full English month name for 1..=12.
pub fn month_name(month: u32) -> Option<&'static str> {
    MONTH_NAMES.get(month.checked_sub(1)? as usize).copied()
}
