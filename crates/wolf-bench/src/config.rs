use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;
use wolf_core::game::GameEvent;
use wolf_core::model::{Agent, Role};
use wolf_core::{Engine, EngineConfig, GameSetup};

const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root scenario configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScenarioConfig {
    pub run_id: String,
    pub setup: GameSetup,
    #[serde(default)]
    pub engine: EngineConfig,
    pub steps: Vec<Step>,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ScenarioConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: ScenarioConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.outputs.validate(&self.run_id)?;
        self.logging.normalize();
        self.validate_telemetry_file()?;
        Engine::new(self.setup.clone(), self.engine).map_err(|err| {
            ValidationError::InvalidField {
                field: "setup".to_string(),
                message: err.to_string(),
            }
        })?;
        validate_steps(&self.steps, self.setup.players)?;
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    ///
    /// A relative telemetry file lands beside the Markdown summary.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        let summary_md = resolve_template(&self.run_id, &self.outputs.summary_md);
        let telemetry_file = resolve_template(&self.run_id, &self.logging.file);
        let telemetry = if telemetry_file.is_absolute() {
            telemetry_file
        } else {
            summary_md
                .parent()
                .map_or_else(|| telemetry_file.clone(), |dir| dir.join(&telemetry_file))
        };
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md,
            telemetry,
        }
    }

    fn validate_telemetry_file(&self) -> Result<(), ValidationError> {
        if self.logging.file.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "logging.file".to_string(),
                message: "path must not be empty".to_string(),
            });
        }
        let outputs = self.resolved_outputs();
        if outputs.telemetry == outputs.jsonl || outputs.telemetry == outputs.summary_md {
            return Err(ValidationError::InvalidField {
                field: "logging.file".to_string(),
                message: format!(
                    "{} would overwrite a replay output",
                    outputs.telemetry.display()
                ),
            });
        }
        Ok(())
    }

    pub fn checkpoint_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step, Step::Search { .. }))
            .count()
    }
}

/// One entry of the chronological scenario script.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Feed one observation to the engine.
    Event { event: GameEvent },
    /// Open a new day; `deaths` are the agents found dead in the morning.
    SetDay {
        day: u32,
        #[serde(default)]
        deaths: Vec<Agent>,
    },
    Kill { agent: Agent },
    Execute { agent: Agent },
    /// Record last night's attack target, or clear it.
    SetAttacked {
        #[serde(default)]
        agent: Option<Agent>,
    },
    /// Checkpoint: run a search and emit one JSONL row.
    Search {
        #[serde(default)]
        label: Option<String>,
    },
    /// End of game with every role revealed.
    Finish { roles: BTreeMap<Agent, Role> },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Event { .. } => "event",
            Step::SetDay { .. } => "set_day",
            Step::Kill { .. } => "kill",
            Step::Execute { .. } => "execute",
            Step::SetAttacked { .. } => "set_attacked",
            Step::Search { .. } => "search",
            Step::Finish { .. } => "finish",
        }
    }

    fn agents(&self) -> Vec<Agent> {
        match self {
            Step::Event { event } => event.agents(),
            Step::SetDay { deaths, .. } => deaths.clone(),
            Step::Kill { agent } | Step::Execute { agent } => vec![*agent],
            Step::SetAttacked { agent } => agent.iter().copied().collect(),
            Step::Search { .. } => Vec::new(),
            Step::Finish { roles } => roles.keys().copied().collect(),
        }
    }
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
    /// Telemetry file template; `{run_id}` is substituted.
    #[serde(default = "default_telemetry_file")]
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
            file: default_telemetry_file(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn default_telemetry_file() -> String {
    "{run_id}.telemetry.jsonl".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn validate_steps(steps: &[Step], players: usize) -> Result<(), ValidationError> {
    if !steps.iter().any(|step| matches!(step, Step::Search { .. })) {
        return Err(ValidationError::InvalidField {
            field: "steps".to_string(),
            message: "at least one search checkpoint must be specified".to_string(),
        });
    }

    for (index, step) in steps.iter().enumerate() {
        if let Some(agent) = step
            .agents()
            .into_iter()
            .find(|agent| agent.index() >= players)
        {
            return Err(ValidationError::InvalidField {
                field: format!("steps[{index}].{}", step.name()),
                message: format!("{agent} is not seated in a {players}-player village"),
            });
        }
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
    pub telemetry: PathBuf,
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use wolf_core::model::Species;

    const BASIC_YAML: &str = r#"
run_id: "five_seer"
setup:
  players: 5
  me: 0
  my_role: seer
engine:
  strict: true
  search:
    seed: 7
steps:
  - step: set_day
    day: 1
  - step: event
    event:
      kind: divined
      target: 3
      species: werewolf
  - step: event
    event:
      kind: comingout
      talker: 2
      role: seer
      day: 1
      turn: 1
  - step: search
    label: "after claims"
  - step: finish
    roles:
      0: seer
      1: villager
      2: possessed
      3: werewolf
      4: villager
outputs:
  jsonl: "bench/out/{run_id}/checkpoints.jsonl"
  summary_md: "bench/out/{run_id}/summary.md"
logging:
  enable_structured: true
  tracing_level: "debug"
"#;

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg: ScenarioConfig = serde_yaml::from_str(BASIC_YAML).expect("parse yaml");
        cfg.validate().expect("validate");

        assert!(cfg.engine.strict);
        assert_eq!(cfg.engine.search.seed, 7);
        assert_eq!(
            cfg.engine.search.capacity,
            wolf_core::assignment::SearchConfig::default().capacity
        );
        assert_eq!(cfg.setup.my_role, Role::Seer);
        assert_eq!(cfg.checkpoint_count(), 1);
        assert!(cfg.logging.enable_structured);
        assert_eq!(cfg.logging.level(), Some(Level::DEBUG));
        assert_eq!(
            cfg.steps[1],
            Step::Event {
                event: GameEvent::Divined {
                    target: Agent::new(3),
                    species: Species::Werewolf,
                }
            }
        );
        match &cfg.steps[4] {
            Step::Finish { roles } => assert_eq!(roles.get(&Agent::new(3)), Some(&Role::Werewolf)),
            other => panic!("unexpected step {other:?}"),
        }

        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.jsonl,
            PathBuf::from("bench/out/five_seer/checkpoints.jsonl")
        );
        assert_eq!(
            outputs.telemetry,
            PathBuf::from("bench/out/five_seer/five_seer.telemetry.jsonl")
        );
    }

    #[test]
    fn telemetry_file_follows_its_template() {
        let yaml = BASIC_YAML.replace(
            "  tracing_level: \"debug\"\n",
            "  tracing_level: \"debug\"\n  file: \"logs/{run_id}-trace.jsonl\"\n",
        );
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("valid");
        assert_eq!(
            cfg.resolved_outputs().telemetry,
            PathBuf::from("bench/out/five_seer/logs/five_seer-trace.jsonl")
        );
    }

    #[test]
    fn telemetry_file_may_not_shadow_the_checkpoints() {
        let yaml = BASIC_YAML.replace(
            "  tracing_level: \"debug\"\n",
            "  tracing_level: \"debug\"\n  file: \"checkpoints.jsonl\"\n",
        );
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("telemetry collides with jsonl");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "logging.file"
        ));
    }

    #[test]
    fn rejects_invalid_run_id() {
        let yaml = BASIC_YAML.replace("run_id: \"five_seer\"", "run_id: \"five seer\"");
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("invalid run id");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "run_id"
        ));
    }

    #[test]
    fn rejects_unsupported_population() {
        let yaml = BASIC_YAML.replace("players: 5", "players: 6");
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("six players are not a village");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "setup"
        ));
    }

    #[test]
    fn rejects_agents_outside_the_village() {
        let yaml = BASIC_YAML.replace("target: 3", "target: 9");
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("agent 9 is not seated");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "steps[1].event"
        ));
    }

    #[test]
    fn requires_a_search_checkpoint() {
        let yaml = BASIC_YAML.replace("  - step: search\n    label: \"after claims\"\n", "");
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("no checkpoint");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "steps"
        ));
    }

    #[test]
    fn outputs_resolve_template_multiple_occurrences() {
        let yaml = BASIC_YAML.replace(
            "bench/out/{run_id}/summary.md",
            "bench/out/{run_id}/{run_id}/summary.md",
        );
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("valid");
        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.summary_md,
            PathBuf::from("bench/out/five_seer/five_seer/summary.md")
        );
    }
}
