//! stats-runner: headless usage-statistics runner.
//!
//! Usage:
//!   stats-runner --db snapshot.db --out ./resultat
//!   stats-runner --db snapshot.db --year 2023,2024 --labo "IAE Lille;ESSEC"

use anyhow::Result;
use dailystats_core::{
    config::StatsConfig,
    export,
    filter::SourceFilter,
    pipeline::{PipelineRun, StatsPipeline},
    rollup::RollupSet,
    store::UsageStore,
    views::InstitutionView,
};
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = str_arg(&args, "--db", "stats.db");
    let out = str_arg(&args, "--out", "./resultat");
    let data_dir = str_arg(&args, "--data-dir", "./data");
    let year = opt_arg(&args, "--year");
    let labo = opt_arg(&args, "--labo");

    println!("stats-runner");
    println!("  db:        {db}");
    println!("  out:       {out}");
    println!("  data_dir:  {data_dir}");
    println!("  year:      {}", year.as_deref().unwrap_or("(all)"));
    println!("  labo:      {}", labo.as_deref().unwrap_or("(all)"));
    println!();

    let filter = SourceFilter::parse(year.as_deref(), labo.as_deref())?;
    let config = StatsConfig::load(data_dir)?;

    let store = UsageStore::open(db)?;
    store.migrate()?;

    let pipeline = StatsPipeline::new(config);
    let run = pipeline.run(&store, &filter)?;

    let out_dir = Path::new(out);
    export::export_run(&run, out_dir)?;
    export_institution_folders(&run, out_dir)?;

    print_summary(&run);
    Ok(())
}

/// One subfolder per institution holding its slice of the monthly-codes,
/// monthly-users and per-database tables.
fn export_institution_folders(run: &PipelineRun, out_dir: &Path) -> Result<()> {
    for name in run.institutions() {
        let view = InstitutionView::new(run, name)?;
        let dir = out_dir.join(view.folder_name());
        log::info!("writing institution folder {}", dir.display());
        std::fs::create_dir_all(&dir)?;

        let rollups = &run.rollups;
        let codes: Vec<_> = rollups
            .per_institution_monthly_codes
            .iter()
            .filter(|r| r.institution_name == name)
            .cloned()
            .collect();
        export::write_table_to_path(&codes, &dir.join("codes_per_month.csv"))?;

        let users: Vec<_> = rollups
            .per_user_monthly_activity
            .iter()
            .filter(|r| r.institution_name == name)
            .cloned()
            .collect();
        export::write_table_to_path(&users, &dir.join("users_per_month.csv"))?;

        let databases: Vec<_> = rollups
            .per_institution_database_yearly
            .iter()
            .filter(|r| r.institution_name == name)
            .cloned()
            .collect();
        export::write_table_to_path(&databases, &dir.join("codes_per_database.csv"))?;
    }
    Ok(())
}

fn print_summary(run: &PipelineRun) {
    let RollupSet {
        global_monthly_users,
        per_institution_monthly_codes,
        per_user_monthly_activity,
        per_institution_database_yearly,
        subscribers_by_status,
        ..
    } = &run.rollups;

    println!("=== RUN SUMMARY ===");
    println!("  joined rows:        {}", run.joined.len());
    println!("  institutions:       {}", run.institutions().len());
    println!("  subscriber rows:    {}", run.subscribers.len());
    println!("  monthly user rows:  {}", global_monthly_users.len());
    println!("  monthly code rows:  {}", per_institution_monthly_codes.len());
    println!("  user activity rows: {}", per_user_monthly_activity.len());
    println!("  database rows:      {}", per_institution_database_yearly.len());
    println!("  status rows:        {}", subscribers_by_status.len());
    println!("  rejected rows:      {}", run.errors.len());
    println!("  warnings:           {}", run.warnings.len());

    if !run.errors.is_empty() {
        println!();
        println!("=== REJECTED ROWS ===");
        for error in &run.errors {
            println!("  {error}");
        }
    }
}

fn str_arg<'a>(args: &'a [String], flag: &str, default: &'a str) -> &'a str {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .unwrap_or(default)
}

fn opt_arg(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].clone())
}
