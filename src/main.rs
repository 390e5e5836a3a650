use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};

use surprisal_prep::app::assemble_use_case::AssembleUseCase;
use surprisal_prep::app::design_matrix_use_case::DesignMatrixUseCase;
use surprisal_prep::app::eventlist_use_case::EventlistUseCase;
use surprisal_prep::app::regressor_use_case::RegressorUseCase;
use surprisal_prep::config::{Config, VariantPlan};
use surprisal_prep::infra::design_matrix_output_adapter::FileDesignMatrixOutputAdapter;
use surprisal_prep::infra::eventlist_output_adapter::FileEventlistOutputAdapter;
use surprisal_prep::infra::observation_output_adapter::FileObservationOutputAdapter;
use surprisal_prep::infra::regressor_output_adapter::FileRegressorOutputAdapter;
use surprisal_prep::logging;
use surprisal_prep::manifest::RunManifest;
use surprisal_prep::pipeline::StageReport;

#[derive(Parser)]
#[command(name = "surprisal_prep")]
#[command(about = "Event timing reconstruction and observation-table assembly for the surprisal EEG study")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $SURPRISAL_PREP_CONFIG, then config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for rolling JSON logs
    #[arg(long, global = true, default_value = "logs")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct VariantArgs {
    /// Data variant to process, as named in the config
    #[arg(long, default_value = "audio")]
    variant: String,

    /// Participant subset (comma-separated indices, e.g. 1,2,5)
    #[arg(long, value_delimiter = ',')]
    participants: Option<Vec<u32>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the word-level design matrix from prosody annotations and the master feature table
    DesignMatrix,
    /// Rebuild per-participant eventlists with one event per word onset
    Eventlist(VariantArgs),
    /// Export per-participant regressor files for the mass-univariate analysis
    Regressors(VariantArgs),
    /// Assemble the long-format observation table
    Assemble(VariantArgs),
}

fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let path = Config::locate(explicit);
    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using built-in defaults");
        let config = Config::default();
        config.validate()?;
        return Ok(config);
    }
    Config::load(&path).with_context(|| format!("Failed to load config from {}", path.display()))
}

fn resolve(config: &Config, args: &VariantArgs) -> Result<VariantPlan> {
    config
        .resolve_variant(&args.variant, args.participants.as_deref())
        .with_context(|| format!("Cannot resolve variant '{}'", args.variant))
}

fn print_summary(report: &StageReport) {
    println!("\n📊 Results for {}:", report.stage);
    println!("   Participants processed: {}", report.participants_processed.len());
    println!("   Participants skipped: {}", report.participants_skipped.len());
    println!("   Malformed rows: {}", report.malformed_rows.len());
    println!("   Rows written: {}", report.rows_written());
    for join in &report.joins {
        println!(
            "   Join {}: {} matched, {} unmatched, {} ambiguous",
            join.name, join.matched, join.unmatched, join.ambiguous
        );
    }
    for (reason, rows) in &report.dropped {
        println!("   Dropped ({}): {}", reason, rows);
    }
    for (kind, count) in &report.warnings {
        println!("   Warning ({}): {}", kind, count);
    }
    if !report.participants_skipped.is_empty() {
        println!("\n⚠️  Skipped participants:");
        for skipped in &report.participants_skipped {
            println!("   - {}: {}", skipped.participant, skipped.reason);
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config)?;
    let started_at = Utc::now();

    let (report, variant) = match cli.command {
        Commands::DesignMatrix => {
            println!("🧱 Building design matrix...");
            let output = FileDesignMatrixOutputAdapter::new(config.stimuli.design_matrix_path());
            let report = DesignMatrixUseCase::new(&config, Box::new(output))
                .run()
                .context("Design matrix build failed")?;
            (report, None)
        }
        Commands::Eventlist(args) => {
            println!("⏱️  Reconstructing eventlists ({})...", args.variant);
            let plan = resolve(&config, &args)?;
            let output = FileEventlistOutputAdapter::new(plan.data_root.clone(), plan.corrected_eventlist.clone());
            let report = EventlistUseCase::new(&config, &plan, Box::new(output))
                .run()
                .context("Eventlist reconstruction failed")?;
            (report, Some(plan.name))
        }
        Commands::Regressors(args) => {
            println!("📈 Exporting regressors ({})...", args.variant);
            let plan = resolve(&config, &args)?;
            let output = FileRegressorOutputAdapter::new(plan.data_root.clone(), plan.regressor_dir.clone());
            let report = RegressorUseCase::new(&config, &plan, Box::new(output))
                .run()
                .context("Regressor export failed")?;
            (report, Some(plan.name))
        }
        Commands::Assemble(args) => {
            println!("🧩 Assembling observation table ({})...", args.variant);
            let plan = resolve(&config, &args)?;
            let output = FileObservationOutputAdapter::new(plan.observation_table.clone(), plan.drop_columns.clone());
            let report = AssembleUseCase::new(&config, &plan, Box::new(output))
                .run()
                .context("Observation assembly failed")?;
            (report, Some(plan.name))
        }
    };

    print_summary(&report);
    let manifest = RunManifest::new(started_at, variant, report);
    let path = manifest
        .write(&config.manifest_dir)
        .context("Failed to write run manifest")?;
    info!(run_id = %manifest.run_id, "Run complete");
    println!("\n✅ Done. Manifest: {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let _guard = logging::init_logging(&cli.log_dir);

    if let Err(e) = run(cli) {
        error!("Run failed: {:#}", e);
        println!("❌ {:#}", e);
        return Err(e);
    }
    Ok(())
}
