//! Source filter: which years and institutions a run covers.
//!
//! CLI flags arrive as loose strings (`--year 2023,2024`,
//! `--labo "IAE Lille;ESSEC"`) and are normalized into sets here, before
//! anything reaches the core. Empty sets mean "no restriction".

use crate::types::Year;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFilter {
    pub years: BTreeSet<Year>,
    pub institutions: BTreeSet<String>,
}

impl SourceFilter {
    /// No restriction on either dimension.
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse the CLI-level arguments: years separated by commas,
    /// institution names separated by semicolons. An unparsable year is a
    /// configuration error and aborts the run.
    pub fn parse(year_arg: Option<&str>, labo_arg: Option<&str>) -> anyhow::Result<Self> {
        let mut filter = SourceFilter::default();

        if let Some(years) = year_arg {
            for part in years.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                let year: Year = part.parse().map_err(|_| {
                    anyhow::anyhow!("--year expects an integer or a comma-separated list, got '{part}'")
                })?;
                filter.years.insert(year);
            }
        }

        if let Some(labos) = labo_arg {
            for part in labos.split(';') {
                let part = part.trim();
                if !part.is_empty() {
                    filter.institutions.insert(part.to_string());
                }
            }
        }

        Ok(filter)
    }

    pub fn matches_year(&self, year: Year) -> bool {
        self.years.is_empty() || self.years.contains(&year)
    }

    /// Case-sensitive, like everything else institution-name related.
    /// A row with no institution only passes an unrestricted filter.
    pub fn matches_institution(&self, name: Option<&str>) -> bool {
        if self.institutions.is_empty() {
            return true;
        }
        match name {
            Some(n) => self.institutions.contains(n),
            None => false,
        }
    }
}
