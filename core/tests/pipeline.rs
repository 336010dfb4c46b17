use dailystats_core::config::StatsConfig;
use dailystats_core::filter::SourceFilter;
use dailystats_core::normalizer::{RawSubscriberRow, RawUsageRow};
use dailystats_core::pipeline::StatsPipeline;
use dailystats_core::source::MemorySource;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn usage_row(user_id: i64, user: &str, labo: &str, year: i64, month: i64, codes: i64) -> RawUsageRow {
    RawUsageRow {
        user_id,
        user_name: user.into(),
        institution_id: Some(1),
        institution_name: Some(labo.into()),
        year,
        month,
        database_name: "histo_actions_fr".into(),
        interaction_type: 2,
        code_count: codes,
        event_timestamp: format!("{year}-{month:02}-10 09:00:00"),
    }
}

fn subscriber_row(user_id: i64, labo: &str, status: &str) -> RawSubscriberRow {
    RawSubscriberRow {
        user_id,
        institution_name: Some(labo.into()),
        date_created: Some("2020-01-15".into()),
        date_last_access: Some("2024-02-01".into()),
        status: Some(status.into()),
    }
}

fn pipeline() -> StatsPipeline {
    StatsPipeline::new(StatsConfig::default_builtin())
}

// ── Exclusions ───────────────────────────────────────────────────────────────

/// Administrative accounts and internal institutions disappear before
/// normalization — they never reach any table.
#[test]
fn excluded_users_and_institutions_never_reach_rollups() {
    let source = MemorySource::new(
        vec![
            usage_row(1, "alice", "IAE Lille", 2024, 3, 5),
            usage_row(1178, "admin", "IAE Lille", 2024, 3, 500),
            usage_row(2, "bob", "EUROFIDAI", 2024, 3, 500),
        ],
        vec![
            subscriber_row(1, "IAE Lille", "valide"),
            subscriber_row(1178, "IAE Lille", "valide"),
            subscriber_row(3, "administrateur Drupal", "valide"),
        ],
    );

    let run = pipeline().run(&source, &SourceFilter::all()).unwrap();

    assert_eq!(run.joined.len(), 1);
    assert_eq!(run.joined[0].user_name, "alice");
    assert_eq!(run.subscribers.len(), 1);
    assert_eq!(run.subscribers[0].user_id, 1);

    let total: i64 = run
        .rollups
        .per_institution_monthly_codes
        .iter()
        .map(|r| r.sum_codes)
        .sum();
    assert_eq!(total, 5);
}

// ── Row-local validation ─────────────────────────────────────────────────────

/// A malformed row is rejected and recorded; the rest of the batch goes
/// through untouched.
#[test]
fn bad_rows_accumulate_errors_without_aborting() {
    let source = MemorySource::new(
        vec![
            usage_row(1, "alice", "IAE Lille", 2024, 13, 5),
            usage_row(2, "bob", "IAE Lille", 2024, 3, 7),
        ],
        vec![],
    );

    let run = pipeline().run(&source, &SourceFilter::all()).unwrap();

    assert_eq!(run.errors.len(), 1);
    assert_eq!(run.errors[0].field, "month");
    assert_eq!(run.joined.len(), 1);
    assert_eq!(run.joined[0].user_name, "bob");
}

/// One warning per distinct unclassified database name, however many rows
/// carry it.
#[test]
fn unclassified_database_warns_once_per_name() {
    let mut row_a = usage_row(1, "alice", "IAE Lille", 2024, 3, 5);
    row_a.database_name = "mystery_table".into();
    let mut row_b = usage_row(2, "bob", "IAE Lille", 2024, 4, 5);
    row_b.database_name = "mystery_table".into();

    let source = MemorySource::new(vec![row_a, row_b], vec![]);
    let run = pipeline().run(&source, &SourceFilter::all()).unwrap();

    let unclassified: Vec<_> = run
        .warnings
        .iter()
        .filter(|w| w.kind == "unclassified_database")
        .collect();
    assert_eq!(unclassified.len(), 1);
    assert_eq!(unclassified[0].detail, "mystery_table");
    assert_eq!(run.joined.len(), 2, "unclassified rows are retained");
}

/// Every joined record's category is one of the taxonomy's labels or
/// explicitly None — never an empty string.
#[test]
fn joined_categories_stay_inside_the_closed_set() {
    let mut odd = usage_row(3, "carol", "ESSEC", 2024, 5, 1);
    odd.database_name = "mystery_table".into();
    let source = MemorySource::new(
        vec![
            usage_row(1, "alice", "IAE Lille", 2024, 3, 5),
            usage_row(2, "bob", "ESSEC", 2024, 4, 7),
            odd,
        ],
        vec![],
    );

    let run = pipeline().run(&source, &SourceFilter::all()).unwrap();

    let config = StatsConfig::default_builtin();
    let categories = config.taxonomy.categories();
    for rec in &run.joined {
        match rec.database_category.as_deref() {
            None => {}
            Some(category) => {
                assert!(!category.is_empty(), "empty category is not a valid state");
                assert!(categories.contains(category), "unknown category {category}");
            }
        }
    }
}

// ── Filters ──────────────────────────────────────────────────────────────────

#[test]
fn year_filter_restricts_the_snapshot() {
    let source = MemorySource::new(
        vec![
            usage_row(1, "alice", "IAE Lille", 2023, 3, 5),
            usage_row(1, "alice", "IAE Lille", 2024, 3, 7),
        ],
        vec![],
    );
    let filter = SourceFilter::parse(Some("2024"), None).unwrap();

    let run = pipeline().run(&source, &filter).unwrap();

    assert_eq!(run.joined.len(), 1);
    assert_eq!(run.joined[0].year, 2024);
}

#[test]
fn institution_filter_restricts_both_datasets() {
    let source = MemorySource::new(
        vec![
            usage_row(1, "alice", "IAE Lille", 2024, 3, 5),
            usage_row(2, "bob", "ESSEC", 2024, 3, 7),
        ],
        vec![
            subscriber_row(1, "IAE Lille", "valide"),
            subscriber_row(2, "ESSEC", "valide"),
        ],
    );
    let filter = SourceFilter::parse(None, Some("IAE Lille")).unwrap();

    let run = pipeline().run(&source, &filter).unwrap();

    assert_eq!(run.institutions().len(), 1);
    assert_eq!(run.subscribers.len(), 1);
}

// ── Idempotence ──────────────────────────────────────────────────────────────

/// Re-running on an unchanged snapshot reproduces byte-identical rollups.
#[test]
fn reruns_are_byte_identical() {
    let source = MemorySource::new(
        vec![
            usage_row(1, "alice", "IAE Lille", 2024, 3, 5),
            usage_row(2, "bob", "ESSEC", 2023, 7, 11),
            usage_row(1, "alice", "IAE Lille", 2024, 4, 2),
        ],
        vec![
            subscriber_row(1, "IAE Lille", "valide"),
            subscriber_row(2, "ESSEC", "expire"),
        ],
    );
    let pipeline = pipeline();

    let first = pipeline.run(&source, &SourceFilter::all()).unwrap();
    let second = pipeline.run(&source, &SourceFilter::all()).unwrap();

    let a = serde_json::to_string(&first.rollups).unwrap();
    let b = serde_json::to_string(&second.rollups).unwrap();
    assert_eq!(a, b);
}
