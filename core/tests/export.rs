use dailystats_core::config::StatsConfig;
use dailystats_core::export;
use dailystats_core::filter::SourceFilter;
use dailystats_core::normalizer::{RawSubscriberRow, RawUsageRow};
use dailystats_core::pipeline::StatsPipeline;
use dailystats_core::source::MemorySource;
use std::path::PathBuf;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn make_run() -> dailystats_core::pipeline::PipelineRun {
    let source = MemorySource::new(
        vec![RawUsageRow {
            user_id: 1,
            user_name: "alice".into(),
            institution_id: Some(1),
            institution_name: Some("IAE Lille".into()),
            year: 2024,
            month: 3,
            database_name: "histo_actions_fr".into(),
            interaction_type: 2,
            code_count: 5,
            event_timestamp: "2024-03-10 09:00:00".into(),
        }],
        vec![
            RawSubscriberRow {
                user_id: 1,
                institution_name: Some("IAE Lille".into()),
                date_created: Some("2020-01-15".into()),
                date_last_access: None,
                status: Some("valide".into()),
            },
            RawSubscriberRow {
                user_id: 2,
                institution_name: Some("IAE Lille".into()),
                date_created: None,
                date_last_access: None,
                status: None,
            },
        ],
    );
    StatsPipeline::new(StatsConfig::default_builtin())
        .run(&source, &SourceFilter::all())
        .unwrap()
}

fn scratch_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dailystats-{label}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

// ── Table serialization ──────────────────────────────────────────────────────

/// Pipe delimiter, header row from the struct field names, one line per
/// row — the shape the reporting layer has always consumed.
#[test]
fn tables_serialize_with_pipe_delimiter_and_header() {
    let run = make_run();

    let mut buf: Vec<u8> = Vec::new();
    export::write_table(&run.rollups.per_institution_monthly_codes, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();

    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("institution_name|year|month|month_name|date|month_abbrev|sum_codes")
    );
    assert_eq!(lines.next(), Some("IAE Lille|2024|3|March|2024-03-01|Mar24|5"));
    assert_eq!(lines.next(), None);
}

#[test]
fn null_buckets_serialize_as_empty_fields() {
    let run = make_run();

    let mut buf: Vec<u8> = Vec::new();
    export::write_table(&run.rollups.subscribers_by_status, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();

    assert!(text.starts_with("institution_name|status|nb_subscribers"));
    assert!(text.contains("IAE Lille||1"), "null status bucket missing: {text}");
    assert!(text.contains("IAE Lille|valide|1"));
}

// ── Full run export ──────────────────────────────────────────────────────────

#[test]
fn export_run_writes_the_canonical_file_set() {
    let run = make_run();
    let dir = scratch_dir("export");

    export::export_run(&run, &dir).unwrap();

    for file in [
        export::JOINED_FILE,
        export::SUBSCRIBERS_FILE,
        export::GLOBAL_MONTHLY_USERS_FILE,
        export::INSTITUTION_MONTHLY_CODES_FILE,
        export::USER_MONTHLY_ACTIVITY_FILE,
        export::INSTITUTION_DATABASE_YEARLY_FILE,
        export::SUBSCRIBERS_BY_STATUS_FILE,
        export::SUBSCRIBERS_BY_YEAR_CREATED_FILE,
        export::SUBSCRIBERS_BY_YEAR_LAST_ACCESS_FILE,
    ] {
        assert!(dir.join(file).is_file(), "missing export file {file}");
    }

    let _ = std::fs::remove_dir_all(&dir);
}

/// An empty rollup is a valid state: the file is still written (empty),
/// never skipped. Downstream consumers branch on emptiness themselves.
#[test]
fn empty_tables_still_export_a_file() {
    let source = MemorySource::new(vec![], vec![]);
    let run = StatsPipeline::new(StatsConfig::default_builtin())
        .run(&source, &SourceFilter::all())
        .unwrap();
    let dir = scratch_dir("export-empty");

    export::export_run(&run, &dir).unwrap();

    let text =
        std::fs::read_to_string(dir.join(export::GLOBAL_MONTHLY_USERS_FILE)).unwrap();
    assert_eq!(text.lines().count(), 0, "no rows serialized for an empty table");

    let _ = std::fs::remove_dir_all(&dir);
}
