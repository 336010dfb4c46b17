//! Subscription join: usage records enriched with subscriber lifecycle
//! facts.
//!
//! SEMANTICS (fixed, order matters):
//!   1. Exact duplicates are removed from both inputs, first occurrence kept.
//!   2. Conflicting subscriber statuses for one (user, institution) pair are
//!      resolved first-occurrence-wins and surfaced as a warning, never an
//!      error.
//!   3. Left outer join on user_id, usage side drives; a usage row with N
//!      matching subscriber rows yields N joined rows in subscriber input
//!      order.
//!   4. Rows with no resolvable institution are dropped — every record the
//!      rollup engine sees has one.
//!   5. Exact duplicates are removed again after the join.
//!
//! The joiner never re-sorts: output order is usage input order with ties
//! broken by subscriber row order, so identical inputs reproduce identical
//! output byte for byte.

use crate::{
    error::DataIntegrityWarning,
    normalizer::{SubscriberRecord, UsageRecord},
    types::{Month, UserId, Year},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// A usage record joined with its subscriber facts. The institution is
/// resolved (subscriber's when matched, the usage row's own otherwise) and
/// guaranteed present; lifecycle fields stay optional.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinedRecord {
    pub user_id: UserId,
    pub user_name: String,
    pub institution_name: String,
    pub year: Year,
    pub month: Month,
    pub month_key: String,
    pub month_name: String,
    pub date: NaiveDate,
    pub month_abbrev: String,
    pub database_name: String,
    pub database_category: Option<String>,
    pub lookup_mode: String,
    pub interaction_label: Option<String>,
    pub code_count: i64,

    pub date_created: Option<NaiveDate>,
    pub date_last_access: Option<NaiveDate>,
    pub status: Option<String>,
}

pub struct JoinOutcome {
    pub joined: Vec<JoinedRecord>,
    /// Subscriber set actually used for the join: exact-deduplicated,
    /// conflicting statuses resolved first-wins.
    pub subscribers: Vec<SubscriberRecord>,
    pub warnings: Vec<DataIntegrityWarning>,
}

/// Remove exact duplicates, keeping the first occurrence in input order.
pub fn dedup_exact<T: Clone + Eq + Hash>(rows: &[T]) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        if seen.insert(row.clone()) {
            out.push(row.clone());
        }
    }
    out
}

pub fn join(usage: &[UsageRecord], subscribers: &[SubscriberRecord]) -> JoinOutcome {
    let usage = dedup_exact(usage);
    let subscribers = dedup_exact(subscribers);
    let mut warnings = Vec::new();

    // Resolve status conflicts: first status seen per (user, institution)
    // wins, later rows carrying a different status are dropped.
    let mut first_status: HashMap<(UserId, Option<String>), Option<String>> = HashMap::new();
    let mut resolved: Vec<SubscriberRecord> = Vec::with_capacity(subscribers.len());
    for sub in subscribers {
        let key = (sub.user_id, sub.institution_name.clone());
        match first_status.get(&key) {
            Some(status) if *status != sub.status => {
                let warning = DataIntegrityWarning::new(
                    "duplicate_subscriber_status",
                    format!(
                        "user {} at {:?}: keeping status {:?}, dropping {:?}",
                        sub.user_id, sub.institution_name, status, sub.status
                    ),
                );
                log::warn!("{}: {}", warning.kind, warning.detail);
                warnings.push(warning);
            }
            Some(_) => resolved.push(sub),
            None => {
                first_status.insert(key, sub.status.clone());
                resolved.push(sub);
            }
        }
    }

    // Index subscriber rows per user, preserving input order.
    let mut by_user: HashMap<UserId, Vec<&SubscriberRecord>> = HashMap::new();
    for sub in &resolved {
        by_user.entry(sub.user_id).or_default().push(sub);
    }

    let mut joined = Vec::new();
    for rec in &usage {
        match by_user.get(&rec.user_id) {
            Some(matches) => {
                for sub in matches {
                    let institution = sub
                        .institution_name
                        .clone()
                        .or_else(|| rec.institution_name.clone());
                    if let Some(institution_name) = institution {
                        joined.push(make_joined(rec, institution_name, Some(sub)));
                    }
                }
            }
            None => {
                if let Some(institution_name) = rec.institution_name.clone() {
                    joined.push(make_joined(rec, institution_name, None));
                }
            }
        }
    }

    JoinOutcome {
        joined: dedup_exact(&joined),
        subscribers: resolved,
        warnings,
    }
}

fn make_joined(
    rec: &UsageRecord,
    institution_name: String,
    sub: Option<&SubscriberRecord>,
) -> JoinedRecord {
    JoinedRecord {
        user_id: rec.user_id,
        user_name: rec.user_name.clone(),
        institution_name,
        year: rec.year,
        month: rec.month,
        month_key: rec.month_key.clone(),
        month_name: rec.month_name.clone(),
        date: rec.date,
        month_abbrev: rec.month_abbrev.clone(),
        database_name: rec.database_name.clone(),
        database_category: rec.database_category.clone(),
        lookup_mode: rec.lookup_mode.clone(),
        interaction_label: rec.interaction_label.clone(),
        code_count: rec.code_count,
        date_created: sub.and_then(|s| s.date_created),
        date_last_access: sub.and_then(|s| s.date_last_access),
        status: sub.and_then(|s| s.status.clone()),
    }
}
