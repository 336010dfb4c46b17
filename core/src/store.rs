//! SQLite snapshot store.
//!
//! RULE: Only store.rs talks to the database.
//! The pipeline consumes rows through the UsageRecordSource trait — it
//! never executes SQL directly. Loaders and tests use the insert helpers.

use crate::{
    error::StatsResult,
    filter::SourceFilter,
    normalizer::{RawSubscriberRow, RawUsageRow},
    source::UsageRecordSource,
};
use rusqlite::{params, params_from_iter, Connection};

pub struct UsageStore {
    conn: Connection,
}

impl UsageStore {
    /// Open (or create) the snapshot database at `path`.
    pub fn open(path: &str) -> StatsResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> StatsResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> StatsResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_usage.sql"))?;
        Ok(())
    }

    // ── Loading ────────────────────────────────────────────────

    pub fn insert_usage_row(&self, row: &RawUsageRow) -> StatsResult<()> {
        self.conn.execute(
            "INSERT INTO usage_log (user_id, user_name, institution_id, institution_name,
                                    year, month, database_name, interaction_type,
                                    code_count, event_timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                row.user_id,
                row.user_name,
                row.institution_id,
                row.institution_name,
                row.year,
                row.month,
                row.database_name,
                row.interaction_type,
                row.code_count,
                row.event_timestamp,
            ],
        )?;
        Ok(())
    }

    pub fn insert_subscriber_row(&self, row: &RawSubscriberRow) -> StatsResult<()> {
        self.conn.execute(
            "INSERT INTO subscriber (user_id, institution_name, date_created,
                                     date_last_access, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                row.user_id,
                row.institution_name,
                row.date_created,
                row.date_last_access,
                row.status,
            ],
        )?;
        Ok(())
    }

    pub fn usage_row_count(&self) -> StatsResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM usage_log", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl UsageRecordSource for UsageStore {
    /// Fetch usage rows matching the filter, in the deterministic order
    /// the historical queries used. Year values are integers and joined
    /// directly into the IN list; institution names go through parameters.
    fn fetch_usage(&self, filter: &SourceFilter) -> StatsResult<Vec<RawUsageRow>> {
        let mut sql = String::from(
            "SELECT user_id, user_name, institution_id, institution_name,
                    year, month, database_name, interaction_type,
                    code_count, event_timestamp
             FROM usage_log",
        );
        let institutions: Vec<&String> = filter.institutions.iter().collect();
        push_where(&mut sql, filter, &institutions);
        sql.push_str(" ORDER BY year, month, event_timestamp, user_id, institution_name, id");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(institutions), |row| {
                Ok(RawUsageRow {
                    user_id: row.get(0)?,
                    user_name: row.get(1)?,
                    institution_id: row.get(2)?,
                    institution_name: row.get(3)?,
                    year: row.get(4)?,
                    month: row.get(5)?,
                    database_name: row.get(6)?,
                    interaction_type: row.get(7)?,
                    code_count: row.get(8)?,
                    event_timestamp: row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn fetch_subscribers(&self, filter: &SourceFilter) -> StatsResult<Vec<RawSubscriberRow>> {
        let mut sql = String::from(
            "SELECT user_id, institution_name, date_created, date_last_access, status
             FROM subscriber",
        );
        let institutions: Vec<&String> = filter.institutions.iter().collect();
        if !institutions.is_empty() {
            sql.push_str(&format!(
                " WHERE institution_name IN ({})",
                placeholders(institutions.len())
            ));
        }
        sql.push_str(" ORDER BY institution_name, user_id, id");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(institutions), |row| {
                Ok(RawSubscriberRow {
                    user_id: row.get(0)?,
                    institution_name: row.get(1)?,
                    date_created: row.get(2)?,
                    date_last_access: row.get(3)?,
                    status: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn push_where(sql: &mut String, filter: &SourceFilter, institutions: &[&String]) {
    let mut clauses: Vec<String> = Vec::new();
    if !filter.years.is_empty() {
        let years: Vec<String> = filter.years.iter().map(|y| y.to_string()).collect();
        clauses.push(format!("year IN ({})", years.join(",")));
    }
    if !institutions.is_empty() {
        clauses.push(format!(
            "institution_name IN ({})",
            placeholders(institutions.len())
        ));
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
}

fn placeholders(count: usize) -> String {
    let marks: Vec<String> = (1..=count).map(|i| format!("?{i}")).collect();
    marks.join(",")
}
