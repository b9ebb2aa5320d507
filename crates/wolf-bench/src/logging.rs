//! JSON telemetry for a scenario replay.

use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{Level, info};
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{ResolvedOutputs, ScenarioConfig};

/// Keeps the background writer alive; dropping it flushes the telemetry file.
pub struct LoggingGuard {
    _guard: WorkerGuard,
    pub telemetry_path: PathBuf,
}

/// Routes every `tracing` event of the replay into the scenario's telemetry
/// file (`logging.file`, beside the summary unless absolute). Returns `None`
/// when structured logging is disabled.
///
/// `RUST_LOG` takes precedence over `logging.tracing_level`.
pub fn init_logging(
    config: &ScenarioConfig,
    outputs: &ResolvedOutputs,
) -> Result<Option<LoggingGuard>> {
    let logging = &config.logging;
    if !logging.enable_structured {
        return Ok(None);
    }

    let file = create_telemetry_file(outputs)?;
    let (writer, guard) = non_blocking::NonBlockingBuilder::default()
        .lossy(false)
        .finish(file);

    let level = logging.level().unwrap_or(Level::INFO);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .json()
        .with_current_span(true)
        .with_span_events(FmtSpan::NONE)
        .with_writer(writer)
        .finish();

    // A subscriber may already be installed when several replays share a process.
    let _ = tracing::subscriber::set_global_default(subscriber);
    info!(
        target: "wolf_bench::replay",
        run_id = %config.run_id,
        players = config.setup.players,
        me = %config.setup.me,
        my_role = %config.setup.my_role,
        steps = config.steps.len(),
        checkpoints = config.checkpoint_count(),
        "scenario telemetry enabled"
    );

    Ok(Some(LoggingGuard {
        _guard: guard,
        telemetry_path: outputs.telemetry.clone(),
    }))
}

fn create_telemetry_file(outputs: &ResolvedOutputs) -> Result<File> {
    let path = &outputs.telemetry;
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating telemetry directory at {}", dir.display()))?;
    }
    File::create(path).with_context(|| format!("creating telemetry file at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn scenario(dir: &std::path::Path, enabled: bool) -> ScenarioConfig {
        let yaml = format!(
            r#"
run_id: "telemetry_case"
setup:
  players: 5
  me: 0
  my_role: villager
steps:
  - step: search
outputs:
  jsonl: "{dir}/{{run_id}}/checkpoints.jsonl"
  summary_md: "{dir}/{{run_id}}/summary.md"
logging:
  enable_structured: {enabled}
"#,
            dir = dir.display(),
        );
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("valid");
        cfg
    }

    #[test]
    fn disabled_logging_leaves_no_file() {
        let dir = tempdir().expect("temp dir");
        let cfg = scenario(dir.path(), false);
        let outputs = cfg.resolved_outputs();
        assert!(init_logging(&cfg, &outputs).expect("init").is_none());
        assert!(!outputs.telemetry.exists());
    }

    #[test]
    fn telemetry_is_named_after_the_scenario() {
        let dir = tempdir().expect("temp dir");
        let cfg = scenario(dir.path(), true);
        let outputs = cfg.resolved_outputs();
        let guard = init_logging(&cfg, &outputs)
            .expect("init")
            .expect("structured logging enabled");
        assert_eq!(
            guard.telemetry_path,
            dir.path()
                .join("telemetry_case")
                .join("telemetry_case.telemetry.jsonl")
        );
        assert!(guard.telemetry_path.exists());
    }
}
