//! Catalog views over a completed pipeline run.
//!
//! Thin read-only lenses the reporting layer uses to enumerate who used
//! what. Institution lookup at construction is a case-sensitive exact
//! match — "iae lille" does not find "IAE Lille" — while the listing
//! helpers compare case-insensitively, both exactly as the source system
//! behaved.

use crate::{
    error::{StatsError, StatsResult},
    pipeline::PipelineRun,
    types::{UserId, Year},
};

/// An institution present in the joined dataset.
pub struct InstitutionView<'a> {
    run: &'a PipelineRun,
    name: String,
}

impl std::fmt::Debug for InstitutionView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstitutionView")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<'a> InstitutionView<'a> {
    /// Fails with UnknownInstitution when the exact name is absent.
    pub fn new(run: &'a PipelineRun, name: &str) -> StatsResult<Self> {
        if !run.joined.iter().any(|r| r.institution_name == name) {
            return Err(StatsError::UnknownInstitution {
                name: name.to_string(),
            });
        }
        Ok(Self {
            run,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Distinct user names, first-seen order.
    pub fn users(&self) -> Vec<String> {
        let needle = self.name.to_lowercase();
        let mut out: Vec<String> = Vec::new();
        for rec in &self.run.joined {
            if rec.institution_name.to_lowercase() == needle && !out.contains(&rec.user_name) {
                out.push(rec.user_name.clone());
            }
        }
        out
    }

    /// Distinct database categories used, first-seen order.
    pub fn databases(&self) -> Vec<String> {
        let needle = self.name.to_lowercase();
        let mut out: Vec<String> = Vec::new();
        for rec in &self.run.joined {
            if rec.institution_name.to_lowercase() != needle {
                continue;
            }
            if let Some(category) = &rec.database_category {
                if !out.contains(category) {
                    out.push(category.clone());
                }
            }
        }
        out
    }

    /// Distinct activity years, sorted.
    pub fn years(&self) -> Vec<Year> {
        let mut years: Vec<Year> = Vec::new();
        for rec in &self.run.joined {
            if rec.institution_name == self.name && !years.contains(&rec.year) {
                years.push(rec.year);
            }
        }
        years.sort_unstable();
        years
    }

    /// Filesystem-safe folder name: trimmed, commas dropped, spaces
    /// replaced by underscores.
    pub fn folder_name(&self) -> String {
        self.name.trim().replace(',', "").replace(' ', "_")
    }
}

/// A platform user, looked up by id.
pub struct UserView<'a> {
    run: &'a PipelineRun,
    user_id: UserId,
}

impl<'a> UserView<'a> {
    pub fn new(run: &'a PipelineRun, user_id: UserId) -> Self {
        Self { run, user_id }
    }

    /// Distinct database categories this user queried, first-seen order.
    pub fn databases(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for rec in &self.run.joined {
            if rec.user_id != self.user_id {
                continue;
            }
            if let Some(category) = &rec.database_category {
                if !out.contains(category) {
                    out.push(category.clone());
                }
            }
        }
        out
    }
}

/// A database category, looked up by label.
pub struct DatabaseView<'a> {
    run: &'a PipelineRun,
    category: String,
}

impl<'a> DatabaseView<'a> {
    pub fn new(run: &'a PipelineRun, category: &str) -> Self {
        Self {
            run,
            category: category.to_string(),
        }
    }

    /// Distinct user names who queried this category, first-seen order.
    pub fn users(&self) -> Vec<String> {
        let needle = self.category.to_lowercase();
        let mut out: Vec<String> = Vec::new();
        for rec in &self.run.joined {
            let matches = rec
                .database_category
                .as_deref()
                .is_some_and(|c| c.to_lowercase() == needle);
            if matches && !out.contains(&rec.user_name) {
                out.push(rec.user_name.clone());
            }
        }
        out
    }
}
