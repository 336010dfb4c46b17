use dailystats_core::config::StatsConfig;
use dailystats_core::error::StatsError;
use dailystats_core::filter::SourceFilter;
use dailystats_core::normalizer::RawUsageRow;
use dailystats_core::pipeline::{PipelineRun, StatsPipeline};
use dailystats_core::source::MemorySource;
use dailystats_core::views::{DatabaseView, InstitutionView, UserView};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn usage_row(user_id: i64, user: &str, labo: &str, db: &str) -> RawUsageRow {
    RawUsageRow {
        user_id,
        user_name: user.into(),
        institution_id: Some(1),
        institution_name: Some(labo.into()),
        year: 2024,
        month: 3,
        database_name: db.into(),
        interaction_type: 2,
        code_count: 3,
        event_timestamp: "2024-03-10 09:00:00".into(),
    }
}

fn make_run() -> PipelineRun {
    let source = MemorySource::new(
        vec![
            usage_row(1, "alice", "IAE Lille", "histo_actions_fr"),
            usage_row(1, "alice", "IAE Lille", "esg_scores"),
            usage_row(2, "bob", "IAE Lille", "histo_actions_fr"),
            usage_row(3, "carol", "ESSEC", "greenbonds_eu"),
        ],
        vec![],
    );
    StatsPipeline::new(StatsConfig::default_builtin())
        .run(&source, &SourceFilter::all())
        .unwrap()
}

// ── Institution lookup ───────────────────────────────────────────────────────

/// Lookup is a case-sensitive exact match: "iae lille" must not find
/// "IAE Lille". (Known UX wart, preserved on purpose.)
#[test]
fn institution_lookup_is_case_sensitive() {
    let run = make_run();

    assert!(InstitutionView::new(&run, "IAE Lille").is_ok());

    let err = InstitutionView::new(&run, "iae lille").unwrap_err();
    match err {
        StatsError::UnknownInstitution { name } => assert_eq!(name, "iae lille"),
        other => panic!("expected UnknownInstitution, got {other}"),
    }
}

#[test]
fn unknown_institution_is_an_error_not_an_empty_view() {
    let run = make_run();
    assert!(InstitutionView::new(&run, "Sorbonne").is_err());
}

// ── Listings ─────────────────────────────────────────────────────────────────

#[test]
fn institution_users_are_distinct_in_first_seen_order() {
    let run = make_run();
    let view = InstitutionView::new(&run, "IAE Lille").unwrap();

    assert_eq!(view.users(), vec!["alice".to_string(), "bob".to_string()]);
}

#[test]
fn institution_databases_list_categories() {
    let run = make_run();
    let view = InstitutionView::new(&run, "IAE Lille").unwrap();

    assert_eq!(view.databases(), vec!["Stocks".to_string(), "ESG".to_string()]);
}

#[test]
fn institution_years_are_sorted() {
    let run = make_run();
    let view = InstitutionView::new(&run, "ESSEC").unwrap();

    assert_eq!(view.years(), vec![2024]);
}

#[test]
fn user_view_lists_queried_categories() {
    let run = make_run();
    let view = UserView::new(&run, 1);

    assert_eq!(view.databases(), vec!["Stocks".to_string(), "ESG".to_string()]);
}

/// Category lookup in listings is case-insensitive, unlike institution
/// construction — both behaviors inherited from the source system.
#[test]
fn database_view_lists_users_case_insensitively() {
    let run = make_run();

    let view = DatabaseView::new(&run, "stocks");
    assert_eq!(view.users(), vec!["alice".to_string(), "bob".to_string()]);
}

// ── Folder names ─────────────────────────────────────────────────────────────

#[test]
fn folder_name_is_filesystem_safe() {
    let source = MemorySource::new(
        vec![usage_row(1, "alice", " IAE Lille, Nord ", "actions_fr")],
        vec![],
    );
    let run = StatsPipeline::new(StatsConfig::default_builtin())
        .run(&source, &SourceFilter::all())
        .unwrap();

    let view = InstitutionView::new(&run, " IAE Lille, Nord ").unwrap();
    assert_eq!(view.folder_name(), "IAE_Lille_Nord");
}
