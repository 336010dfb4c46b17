//! The rollup engine — five canonical aggregates over the joined dataset.
//!
//! RULES:
//!   - Every operation is pure and deterministic for a given input
//!     sequence; tables are rebuilt in full each run, never patched.
//!   - The distinct-user key is (institution, user, year, month,
//!     month_name): a user who queried five databases in one month counts
//!     once.
//!   - Empty inputs produce empty tables, not errors. Callers branch on
//!     emptiness explicitly.
//!   - Null grouping keys (status, creation year, last-access year) are
//!     buckets of their own, sorted first, never dropped.
//!   - Sums and counts are i64; nothing is rounded anywhere.

use crate::{
    joiner::JoinedRecord,
    normalizer::SubscriberRecord,
    types::{Month, Year},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// ── Table rows ───────────────────────────────────────────────────────────────

/// Distinct active users across all institutions, per month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalMonthlyUsersRow {
    pub year: Year,
    pub month: Month,
    pub month_name: String,
    pub nb_users: i64,
}

/// Codes consumed per institution per month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionMonthlyCodesRow {
    pub institution_name: String,
    pub year: Year,
    pub month: Month,
    pub month_name: String,
    pub date: NaiveDate,
    pub month_abbrev: String,
    pub sum_codes: i64,
}

/// Distinct active users per institution per month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMonthlyActivityRow {
    pub institution_name: String,
    pub year: Year,
    pub month: Month,
    pub month_name: String,
    pub nb_active_users: i64,
}

/// Codes consumed per institution per database category per year.
/// Unclassified rows are excluded from this breakdown only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionDatabaseYearlyRow {
    pub institution_name: String,
    pub database_category: String,
    pub year: Year,
    pub sum_codes: i64,
}

/// Subscriber headcount per (institution, status).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberStatusRow {
    pub institution_name: Option<String>,
    pub status: Option<String>,
    pub nb_subscribers: i64,
}

/// Subscriber headcount per (institution, status, year), where the year is
/// either the creation year or the last-access year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberStatusYearRow {
    pub institution_name: Option<String>,
    pub status: Option<String>,
    pub year: Option<Year>,
    pub nb_subscribers: i64,
}

/// The five canonical tables of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupSet {
    pub global_monthly_users: Vec<GlobalMonthlyUsersRow>,
    pub per_institution_monthly_codes: Vec<InstitutionMonthlyCodesRow>,
    pub per_user_monthly_activity: Vec<UserMonthlyActivityRow>,
    pub per_institution_database_yearly: Vec<InstitutionDatabaseYearlyRow>,
    pub subscribers_by_status: Vec<SubscriberStatusRow>,
    pub subscribers_by_status_year_created: Vec<SubscriberStatusYearRow>,
    pub subscribers_by_status_year_last_access: Vec<SubscriberStatusYearRow>,
}

// ── Engine ───────────────────────────────────────────────────────────────────

pub struct RollupEngine<'a> {
    joined: &'a [JoinedRecord],
    subscribers: &'a [SubscriberRecord],
}

impl<'a> RollupEngine<'a> {
    pub fn new(joined: &'a [JoinedRecord], subscribers: &'a [SubscriberRecord]) -> Self {
        Self {
            joined,
            subscribers,
        }
    }

    pub fn build_all(&self) -> RollupSet {
        RollupSet {
            global_monthly_users: self.global_monthly_users(),
            per_institution_monthly_codes: self.per_institution_monthly_codes(),
            per_user_monthly_activity: self.per_user_monthly_activity(),
            per_institution_database_yearly: self.per_institution_database_yearly(),
            subscribers_by_status: self.subscribers_by_status(),
            subscribers_by_status_year_created: self
                .subscribers_by_status_year(|s| s.year_created),
            subscribers_by_status_year_last_access: self
                .subscribers_by_status_year(|s| s.year_last_access),
        }
    }

    /// Distinct (institution, user) pairs active per month, all
    /// institutions together. Sorted by month, then year — the reporting
    /// layer charts month curves with one line per year.
    pub fn global_monthly_users(&self) -> Vec<GlobalMonthlyUsersRow> {
        let mut seen: HashSet<(&str, &str, Year, Month, &str)> = HashSet::new();
        let mut counts: BTreeMap<(Year, Month, &str), i64> = BTreeMap::new();

        for rec in self.joined {
            let key = (
                rec.institution_name.as_str(),
                rec.user_name.as_str(),
                rec.year,
                rec.month,
                rec.month_name.as_str(),
            );
            if seen.insert(key) {
                *counts
                    .entry((rec.year, rec.month, rec.month_name.as_str()))
                    .or_insert(0) += 1;
            }
        }

        let mut rows: Vec<GlobalMonthlyUsersRow> = counts
            .into_iter()
            .map(|((year, month, month_name), nb_users)| GlobalMonthlyUsersRow {
                year,
                month,
                month_name: month_name.to_string(),
                nb_users,
            })
            .collect();
        rows.sort_by_key(|r| (r.month, r.year));
        rows
    }

    /// Sum of codes per institution per month, sorted
    /// (institution, year, month).
    pub fn per_institution_monthly_codes(&self) -> Vec<InstitutionMonthlyCodesRow> {
        struct MonthAgg<'r> {
            month_name: &'r str,
            date: NaiveDate,
            month_abbrev: &'r str,
            sum_codes: i64,
        }

        let mut groups: BTreeMap<(&str, Year, Month), MonthAgg<'_>> = BTreeMap::new();
        for rec in self.joined {
            let agg = groups
                .entry((rec.institution_name.as_str(), rec.year, rec.month))
                .or_insert_with(|| MonthAgg {
                    month_name: rec.month_name.as_str(),
                    date: rec.date,
                    month_abbrev: rec.month_abbrev.as_str(),
                    sum_codes: 0,
                });
            agg.sum_codes += rec.code_count;
        }

        groups
            .into_iter()
            .map(
                |((institution_name, year, month), agg)| InstitutionMonthlyCodesRow {
                    institution_name: institution_name.to_string(),
                    year,
                    month,
                    month_name: agg.month_name.to_string(),
                    date: agg.date,
                    month_abbrev: agg.month_abbrev.to_string(),
                    sum_codes: agg.sum_codes,
                },
            )
            .collect()
    }

    /// Distinct users per institution per month — the same dedup key as
    /// the global table, scoped per institution. Sorted
    /// (institution, year, month).
    pub fn per_user_monthly_activity(&self) -> Vec<UserMonthlyActivityRow> {
        let mut seen: HashSet<(&str, &str, Year, Month, &str)> = HashSet::new();
        let mut counts: BTreeMap<(&str, Year, Month, &str), i64> = BTreeMap::new();

        for rec in self.joined {
            let key = (
                rec.institution_name.as_str(),
                rec.user_name.as_str(),
                rec.year,
                rec.month,
                rec.month_name.as_str(),
            );
            if seen.insert(key) {
                *counts
                    .entry((
                        rec.institution_name.as_str(),
                        rec.year,
                        rec.month,
                        rec.month_name.as_str(),
                    ))
                    .or_insert(0) += 1;
            }
        }

        counts
            .into_iter()
            .map(
                |((institution_name, year, month, month_name), nb_active_users)| {
                    UserMonthlyActivityRow {
                        institution_name: institution_name.to_string(),
                        year,
                        month,
                        month_name: month_name.to_string(),
                        nb_active_users,
                    }
                },
            )
            .collect()
    }

    /// Sum of codes per institution per database category per year; month
    /// granularity is discarded and unclassified rows are left out. Sorted
    /// (institution, category, year).
    pub fn per_institution_database_yearly(&self) -> Vec<InstitutionDatabaseYearlyRow> {
        let mut groups: BTreeMap<(&str, &str, Year), i64> = BTreeMap::new();
        for rec in self.joined {
            let Some(category) = rec.database_category.as_deref() else {
                continue;
            };
            *groups
                .entry((rec.institution_name.as_str(), category, rec.year))
                .or_insert(0) += rec.code_count;
        }

        groups
            .into_iter()
            .map(
                |((institution_name, database_category, year), sum_codes)| {
                    InstitutionDatabaseYearlyRow {
                        institution_name: institution_name.to_string(),
                        database_category: database_category.to_string(),
                        year,
                        sum_codes,
                    }
                },
            )
            .collect()
    }

    /// Subscriber headcount per (institution, status). Null keys are their
    /// own bucket, sorted first.
    pub fn subscribers_by_status(&self) -> Vec<SubscriberStatusRow> {
        let mut counts: BTreeMap<(Option<&str>, Option<&str>), i64> = BTreeMap::new();
        for sub in self.subscribers {
            *counts
                .entry((sub.institution_name.as_deref(), sub.status.as_deref()))
                .or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|((institution_name, status), nb_subscribers)| SubscriberStatusRow {
                institution_name: institution_name.map(String::from),
                status: status.map(String::from),
                nb_subscribers,
            })
            .collect()
    }

    /// Subscriber headcount per (institution, status, year), keyed by the
    /// given lifecycle year. Sorted (institution, year, status), matching
    /// the presentation order of the historical exports.
    pub fn subscribers_by_status_year(
        &self,
        year_of: impl Fn(&SubscriberRecord) -> Option<Year>,
    ) -> Vec<SubscriberStatusYearRow> {
        let mut counts: BTreeMap<(Option<&str>, Option<Year>, Option<&str>), i64> =
            BTreeMap::new();
        for sub in self.subscribers {
            *counts
                .entry((
                    sub.institution_name.as_deref(),
                    year_of(sub),
                    sub.status.as_deref(),
                ))
                .or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(
                |((institution_name, year, status), nb_subscribers)| SubscriberStatusYearRow {
                    institution_name: institution_name.map(String::from),
                    status: status.map(String::from),
                    year,
                    nb_subscribers,
                },
            )
            .collect()
    }
}
