//! Pipeline orchestration — one run turns one immutable snapshot of raw
//! rows into the five canonical tables.
//!
//! EXECUTION ORDER (fixed, never reordered):
//!   1. Fetch usage + subscriber rows (single synchronous snapshot call)
//!   2. Apply exclusions (configuration, both datasets, before anything else)
//!   3. Normalize (row-local validation; a bad row never aborts the batch)
//!   4. Join
//!   5. Roll up
//!
//! Every stage produces new immutable values. A run owns its snapshot, so
//! concurrent runs need no locking.

use crate::{
    config::StatsConfig,
    error::{DataIntegrityWarning, StatsResult, ValidationError},
    filter::SourceFilter,
    joiner::{self, JoinedRecord},
    normalizer::{self, RawSubscriberRow, RawUsageRow, SubscriberRecord},
    rollup::{RollupEngine, RollupSet},
    source::UsageRecordSource,
};
use std::collections::BTreeSet;

pub struct StatsPipeline {
    config: StatsConfig,
}

/// The immutable result of one pipeline run: the joined dataset, the
/// subscriber set it was joined against, the five rollup tables, and the
/// per-run error/warning lists.
pub struct PipelineRun {
    pub joined: Vec<JoinedRecord>,
    pub subscribers: Vec<SubscriberRecord>,
    pub rollups: RollupSet,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<DataIntegrityWarning>,
}

impl PipelineRun {
    /// Distinct institutions present in the joined dataset, sorted.
    pub fn institutions(&self) -> BTreeSet<&str> {
        self.joined
            .iter()
            .map(|r| r.institution_name.as_str())
            .collect()
    }

    /// Distinct activity years in the joined dataset, sorted.
    pub fn years(&self) -> BTreeSet<i32> {
        self.joined.iter().map(|r| r.year).collect()
    }
}

impl StatsPipeline {
    pub fn new(config: StatsConfig) -> Self {
        Self { config }
    }

    pub fn run(
        &self,
        source: &dyn UsageRecordSource,
        filter: &SourceFilter,
    ) -> StatsResult<PipelineRun> {
        let raw_usage = source.fetch_usage(filter)?;
        let raw_subscribers = source.fetch_subscribers(filter)?;
        log::info!(
            "fetched {} usage rows, {} subscriber rows",
            raw_usage.len(),
            raw_subscribers.len(),
        );

        let raw_usage: Vec<RawUsageRow> = raw_usage
            .into_iter()
            .filter(|r| !self.usage_row_excluded(r))
            .collect();
        let raw_subscribers: Vec<RawSubscriberRow> = raw_subscribers
            .into_iter()
            .filter(|r| !self.subscriber_row_excluded(r))
            .collect();

        let mut errors: Vec<ValidationError> = Vec::new();
        let mut warnings: Vec<DataIntegrityWarning> = Vec::new();

        let mut usage = Vec::with_capacity(raw_usage.len());
        let mut unclassified: BTreeSet<String> = BTreeSet::new();
        for raw in &raw_usage {
            match normalizer::normalize(raw, &self.config.taxonomy) {
                Ok(rec) => {
                    if rec.database_category.is_none() {
                        unclassified.insert(rec.database_name.clone());
                    }
                    usage.push(rec);
                }
                Err(e) => {
                    log::warn!("rejected row: {e}");
                    errors.push(e);
                }
            }
        }
        for name in unclassified {
            log::warn!("unclassified database name: {name}");
            warnings.push(DataIntegrityWarning::new("unclassified_database", name));
        }

        let mut subscribers = Vec::with_capacity(raw_subscribers.len());
        for raw in &raw_subscribers {
            match normalizer::normalize_subscriber(raw) {
                Ok(rec) => subscribers.push(rec),
                Err(e) => {
                    log::warn!("rejected row: {e}");
                    errors.push(e);
                }
            }
        }

        let outcome = joiner::join(&usage, &subscribers);
        warnings.extend(outcome.warnings);

        let rollups = RollupEngine::new(&outcome.joined, &outcome.subscribers).build_all();
        log::info!(
            "run complete: {} joined rows, {} rejected rows, {} warnings",
            outcome.joined.len(),
            errors.len(),
            warnings.len(),
        );

        Ok(PipelineRun {
            joined: outcome.joined,
            subscribers: outcome.subscribers,
            rollups,
            errors,
            warnings,
        })
    }

    fn usage_row_excluded(&self, row: &RawUsageRow) -> bool {
        let exclusions = &self.config.exclusions;
        exclusions.excluded_user_ids.contains(&row.user_id)
            || row
                .institution_name
                .as_deref()
                .is_some_and(|name| exclusions.excluded_institutions.contains(name))
    }

    fn subscriber_row_excluded(&self, row: &RawSubscriberRow) -> bool {
        let exclusions = &self.config.exclusions;
        exclusions.excluded_user_ids.contains(&row.user_id)
            || row
                .institution_name
                .as_deref()
                .is_some_and(|name| exclusions.excluded_institutions.contains(name))
    }
}
