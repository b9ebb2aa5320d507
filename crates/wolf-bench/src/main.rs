use std::path::PathBuf;

use clap::Parser;

use wolf_bench::config::{ResolvedOutputs, ScenarioConfig};
use wolf_bench::logging::init_logging;
use wolf_bench::replay::ReplayRunner;

/// Scenario replay harness for the role inference engine.
#[derive(Debug, Parser)]
#[command(
    name = "wolf-bench",
    author,
    version,
    about = "Deterministic replay of scripted werewolf scenarios"
)]
struct Cli {
    /// Path to the YAML scenario file.
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "crates/wolf-bench/scenarios/five_seer.yaml"
    )]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the RNG seed for local search.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the search time budget in milliseconds.
    #[arg(long, value_name = "MS")]
    time_budget_ms: Option<u64>,

    /// Fail on the first event the engine cannot apply.
    #[arg(long)]
    strict: bool,

    /// Exit after validating the configuration (nothing is replayed).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = ScenarioConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(seed) = cli.seed {
        config.engine.search.seed = seed;
    }

    if let Some(budget) = cli.time_budget_ms {
        config.engine.search.time_budget_ms = Some(budget);
    }

    if cli.strict {
        config.engine.strict = true;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let steps = config.steps.len();
    let checkpoints = config.checkpoint_count();

    println!(
        "Loaded scenario '{run_id}' ({} players, {steps} steps, {checkpoints} checkpoint{})",
        config.setup.players,
        if checkpoints == 1 { "" } else { "s" }
    );

    let logging_guard = init_logging(&config, &outputs)?;
    let runner = ReplayRunner::new(config, outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: replay skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Replay complete for '{run_id}': {} steps, {} events → {} rows at {}",
        summary.steps_run,
        summary.events_observed,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(seer) = summary.hidden_seer {
        println!("Hidden seer: {seer}");
    }
    if let Some(guard) = logging_guard.as_ref() {
        println!("Telemetry log: {}", guard.telemetry_path.display());
    }

    Ok(())
}
