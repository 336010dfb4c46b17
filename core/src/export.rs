//! Pipe-separated CSV export of the derived tables.
//!
//! The reporting layer historically consumed `|`-delimited UTF-8 files
//! with a header row, one file per table; the file names below are the
//! ones it knows. Any serde-serializable row type goes through here.

use crate::{error::StatsResult, pipeline::PipelineRun};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

const DELIMITER: u8 = b'|';

pub const JOINED_FILE: &str = "stats_all_users_with_subscription_informations.csv";
pub const SUBSCRIBERS_FILE: &str = "raw_data_stats_daily_subscription.csv";
pub const GLOBAL_MONTHLY_USERS_FILE: &str = "stats_number_of_users_per_month.csv";
pub const INSTITUTION_MONTHLY_CODES_FILE: &str = "stats_number_of_codes_per_labo_and_month.csv";
pub const USER_MONTHLY_ACTIVITY_FILE: &str = "stats_number_of_users_per_labo_and_month.csv";
pub const INSTITUTION_DATABASE_YEARLY_FILE: &str = "stats_number_of_codes_per_labo_and_database.csv";
pub const SUBSCRIBERS_BY_STATUS_FILE: &str = "stats_number_of_subscribers_per_labo_and_status.csv";
pub const SUBSCRIBERS_BY_YEAR_CREATED_FILE: &str =
    "stats_number_of_subscribers_per_status_and_year_creation.csv";
pub const SUBSCRIBERS_BY_YEAR_LAST_ACCESS_FILE: &str =
    "stats_number_of_subscribers_per_status_and_year_last_access.csv";

/// Write one table to any writer. Column names come from the row struct's
/// field names.
pub fn write_table<T: Serialize, W: Write>(rows: &[T], writer: W) -> StatsResult<()> {
    let mut w = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_writer(writer);
    for row in rows {
        w.serialize(row)?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_table_to_path<T: Serialize>(rows: &[T], path: &Path) -> StatsResult<()> {
    let file = std::fs::File::create(path)?;
    write_table(rows, file)
}

/// Write the canonical file set of one run into `out_dir`.
pub fn export_run(run: &PipelineRun, out_dir: &Path) -> StatsResult<()> {
    std::fs::create_dir_all(out_dir)?;

    write_table_to_path(&run.joined, &out_dir.join(JOINED_FILE))?;
    write_table_to_path(&run.subscribers, &out_dir.join(SUBSCRIBERS_FILE))?;

    let rollups = &run.rollups;
    write_table_to_path(
        &rollups.global_monthly_users,
        &out_dir.join(GLOBAL_MONTHLY_USERS_FILE),
    )?;
    write_table_to_path(
        &rollups.per_institution_monthly_codes,
        &out_dir.join(INSTITUTION_MONTHLY_CODES_FILE),
    )?;
    write_table_to_path(
        &rollups.per_user_monthly_activity,
        &out_dir.join(USER_MONTHLY_ACTIVITY_FILE),
    )?;
    write_table_to_path(
        &rollups.per_institution_database_yearly,
        &out_dir.join(INSTITUTION_DATABASE_YEARLY_FILE),
    )?;
    write_table_to_path(
        &rollups.subscribers_by_status,
        &out_dir.join(SUBSCRIBERS_BY_STATUS_FILE),
    )?;
    write_table_to_path(
        &rollups.subscribers_by_status_year_created,
        &out_dir.join(SUBSCRIBERS_BY_YEAR_CREATED_FILE),
    )?;
    write_table_to_path(
        &rollups.subscribers_by_status_year_last_access,
        &out_dir.join(SUBSCRIBERS_BY_YEAR_LAST_ACCESS_FILE),
    )?;

    log::info!("exported run tables to {}", out_dir.display());
    Ok(())
}
