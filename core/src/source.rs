//! The data-source seam: where raw rows come from.
//!
//! Both collaborators return a finite, already-materialized sequence — no
//! pagination, no streaming. The pipeline treats the fetch as one
//! synchronous snapshot call.

use crate::{
    error::StatsResult,
    filter::SourceFilter,
    normalizer::{RawSubscriberRow, RawUsageRow},
};

pub trait UsageRecordSource {
    fn fetch_usage(&self, filter: &SourceFilter) -> StatsResult<Vec<RawUsageRow>>;
    fn fetch_subscribers(&self, filter: &SourceFilter) -> StatsResult<Vec<RawSubscriberRow>>;
}

/// Vec-backed source. Used by tests and by callers that already hold the
/// rows in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pub usage: Vec<RawUsageRow>,
    pub subscribers: Vec<RawSubscriberRow>,
}

impl MemorySource {
    pub fn new(usage: Vec<RawUsageRow>, subscribers: Vec<RawSubscriberRow>) -> Self {
        Self { usage, subscribers }
    }
}

impl UsageRecordSource for MemorySource {
    fn fetch_usage(&self, filter: &SourceFilter) -> StatsResult<Vec<RawUsageRow>> {
        Ok(self
            .usage
            .iter()
            .filter(|row| {
                let year = i32::try_from(row.year).unwrap_or(i32::MAX);
                filter.matches_year(year)
                    && filter.matches_institution(row.institution_name.as_deref())
            })
            .cloned()
            .collect())
    }

    fn fetch_subscribers(&self, filter: &SourceFilter) -> StatsResult<Vec<RawSubscriberRow>> {
        Ok(self
            .subscribers
            .iter()
            .filter(|row| filter.matches_institution(row.institution_name.as_deref()))
            .cloned()
            .collect())
    }
}
