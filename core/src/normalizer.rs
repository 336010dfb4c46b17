//! Row validation and typing.
//!
//! RULE: this is the only boundary where raw data is checked. A record
//! that leaves the normalizer is fully typed and never mutated again.
//! A malformed row yields a ValidationError carrying the row's source
//! identity; the batch continues without it.

use crate::{
    classifier::{self, Taxonomy},
    error::ValidationError,
    types::{Month, UserId, Year},
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Years outside this range are data errors, not history.
const YEAR_MIN: Year = 1990;
const YEAR_MAX: Year = 2100;

const DATE_FORMAT: &str = "%Y-%m-%d";

// ── Raw rows (source output, loosely typed on purpose) ───────────────────────

/// One usage-log row as fetched from the store. Numeric fields are plain
/// i64 and institution may be missing; nothing is trusted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUsageRow {
    pub user_id: i64,
    pub user_name: String,
    pub institution_id: Option<i64>,
    pub institution_name: Option<String>,
    pub year: i64,
    pub month: i64,
    pub database_name: String,
    pub interaction_type: i64,
    pub code_count: i64,
    pub event_timestamp: String,
}

/// One subscriber-association row as fetched from the store. Dates are
/// unparsed strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSubscriberRow {
    pub user_id: i64,
    pub institution_name: Option<String>,
    pub date_created: Option<String>,
    pub date_last_access: Option<String>,
    pub status: Option<String>,
}

// ── Normalized records ───────────────────────────────────────────────────────

/// A validated usage event with every derived field attached. Created once,
/// never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageRecord {
    pub user_id: UserId,
    pub user_name: String,
    pub institution_id: Option<i64>,
    pub institution_name: Option<String>,
    pub year: Year,
    pub month: Month,
    pub database_name: String,
    pub interaction_type: i64,
    pub code_count: i64,
    pub event_timestamp: String,

    /// "YYYYMM", month zero-padded.
    pub month_key: String,
    /// Full English month name.
    pub month_name: String,
    /// First day of the month.
    pub date: NaiveDate,
    /// Abbreviated month + two-digit year, e.g. "Mar24".
    pub month_abbrev: String,
    pub interaction_label: Option<String>,
    pub database_category: Option<String>,
    pub lookup_mode: String,
}

/// A subscriber lifecycle record, dates parsed and years derived.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberRecord {
    pub user_id: UserId,
    pub institution_name: Option<String>,
    pub date_created: Option<NaiveDate>,
    pub date_last_access: Option<NaiveDate>,
    pub status: Option<String>,
    pub year_created: Option<Year>,
    pub year_last_access: Option<Year>,
}

// ── Normalization ────────────────────────────────────────────────────────────

/// Validate and type one usage row, attaching all derived fields.
pub fn normalize(raw: &RawUsageRow, taxonomy: &Taxonomy) -> Result<UsageRecord, ValidationError> {
    let row_id = format!("usage user={} at={}", raw.user_id, raw.event_timestamp);

    if raw.year < i64::from(YEAR_MIN) || raw.year > i64::from(YEAR_MAX) {
        return Err(ValidationError::new(row_id, "year", raw.year.to_string()));
    }
    let year = raw.year as Year;

    if !(1..=12).contains(&raw.month) {
        return Err(ValidationError::new(row_id, "month", raw.month.to_string()));
    }
    let month = raw.month as Month;

    if raw.code_count < 0 {
        return Err(ValidationError::new(
            row_id,
            "code_count",
            raw.code_count.to_string(),
        ));
    }

    let month_name = classifier::month_name(month)
        .ok_or_else(|| ValidationError::new(row_id.clone(), "month", month.to_string()))?;
    let date = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| ValidationError::new(row_id.clone(), "month", month.to_string()))?;

    Ok(UsageRecord {
        user_id: raw.user_id,
        user_name: raw.user_name.clone(),
        institution_id: raw.institution_id,
        institution_name: raw.institution_name.clone(),
        year,
        month,
        database_name: raw.database_name.clone(),
        interaction_type: raw.interaction_type,
        code_count: raw.code_count,
        event_timestamp: raw.event_timestamp.clone(),
        month_key: format!("{year}{month:02}"),
        month_name: month_name.to_string(),
        date,
        month_abbrev: date.format("%b%y").to_string(),
        interaction_label: classifier::classify_interaction(raw.interaction_type)
            .map(String::from),
        database_category: taxonomy
            .classify_database(&raw.database_name)
            .map(String::from),
        lookup_mode: taxonomy.classify_lookup_mode(&raw.database_name).to_string(),
    })
}

/// Validate and type one subscriber row. Null dates and status stay null;
/// a date that is present but malformed rejects the row.
pub fn normalize_subscriber(raw: &RawSubscriberRow) -> Result<SubscriberRecord, ValidationError> {
    let row_id = format!("subscriber user={}", raw.user_id);

    let date_created = parse_date(raw.date_created.as_deref(), &row_id, "date_created")?;
    let date_last_access =
        parse_date(raw.date_last_access.as_deref(), &row_id, "date_last_access")?;

    Ok(SubscriberRecord {
        user_id: raw.user_id,
        institution_name: raw.institution_name.clone(),
        date_created,
        date_last_access,
        status: raw.status.clone(),
        year_created: date_created.map(|d| d.year()),
        year_last_access: date_last_access.map(|d| d.year()),
    })
}

fn parse_date(
    value: Option<&str>,
    row_id: &str,
    field: &str,
) -> Result<Option<NaiveDate>, ValidationError> {
    match value {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Some)
            .map_err(|_| ValidationError::new(row_id, field, s)),
    }
}
