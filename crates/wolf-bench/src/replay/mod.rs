//! Drives one engine through a scripted scenario and records its beliefs at
//! every search checkpoint.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use wolf_core::assignment::{SearchMode, SearchOutcome};
use wolf_core::audit;
use wolf_core::game::GameView;
use wolf_core::model::{Agent, Role};
use wolf_core::{Engine, EngineError};

use crate::config::{ResolvedOutputs, ScenarioConfig, Step};

pub struct ReplayRunner {
    config: ScenarioConfig,
    outputs: ResolvedOutputs,
    engine: Engine,
    view: GameView,
}

#[derive(Debug, Clone)]
pub struct ReplaySummary {
    pub steps_run: usize,
    pub events_observed: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    /// Seer revealed at a `finish` step without ever having come out.
    pub hidden_seer: Option<Agent>,
}

/// One JSONL row per search checkpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CheckpointRow {
    pub run_id: String,
    pub step: usize,
    pub label: Option<String>,
    pub day: u32,
    pub alive: usize,
    pub mode: SearchMode,
    pub explored: usize,
    pub kept: usize,
    pub best: Option<BestHypothesis>,
    /// Alive agent (other than the holder) most likely to be a werewolf.
    pub suspect: Option<Agent>,
    pub beliefs: Vec<AgentBeliefs>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BestHypothesis {
    pub roles: Vec<Role>,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentBeliefs {
    pub agent: Agent,
    pub alive: bool,
    pub claim: Option<Role>,
    pub roles: BTreeMap<Role, f64>,
}

impl ReplayRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: ScenarioConfig, outputs: ResolvedOutputs) -> Result<Self, ReplayError> {
        let engine = Engine::new(config.setup.clone(), config.engine)?;
        let view = GameView::new(config.setup.players);
        Ok(Self {
            config,
            outputs,
            engine,
            view,
        })
    }

    pub fn run(mut self) -> Result<ReplaySummary, ReplayError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        // every replay is its own experiment batch
        audit::reset_hidden_seers();

        let file = File::create(&self.outputs.jsonl)?;
        let mut writer = BufWriter::new(file);
        let mut rng = StdRng::seed_from_u64(self.engine.config().search.seed);
        let mut rows = Vec::new();
        let mut events_observed = 0;
        let mut hidden_seer = None;

        let steps = std::mem::take(&mut self.config.steps);
        for (index, step) in steps.iter().enumerate() {
            match step {
                Step::Event { event } => {
                    self.engine.observe(event, &self.view)?;
                    events_observed += 1;
                }
                Step::SetDay { day, deaths } => {
                    self.view.begin_day(*day, deaths.clone());
                    debug!(
                        target: "wolf_bench::replay",
                        day,
                        deaths = deaths.len(),
                        "day opened"
                    );
                }
                Step::Kill { agent } | Step::Execute { agent } => {
                    if !self.view.mark_dead(*agent) {
                        warn!(
                            target: "wolf_bench::replay",
                            agent = %agent,
                            step = index,
                            "agent was already dead"
                        );
                    }
                }
                Step::SetAttacked { agent } => self.view.set_attacked(*agent),
                Step::Search { label } => {
                    let outcome = self.engine.search(&self.view, &mut rng)?;
                    let row = self.checkpoint(index, label.clone(), &outcome);
                    serde_json::to_writer(&mut writer, &row)?;
                    writer.write_all(b"\n")?;
                    info!(
                        target: "wolf_bench::replay",
                        step = index,
                        label = label.as_deref().unwrap_or(""),
                        explored = row.explored,
                        best_score = row.best.as_ref().map(|best| best.score),
                        "checkpoint written"
                    );
                    rows.push(row);
                }
                Step::Finish { roles } => match self.engine.finish(roles) {
                    Ok(found) => hidden_seer = found.or(hidden_seer),
                    Err(err) if self.engine.config().strict => return Err(err.into()),
                    // already logged by the engine
                    Err(_) => {}
                },
            }
        }
        writer.flush()?;

        write_markdown(
            &self.outputs.summary_md,
            &self.config.run_id,
            &self.engine,
            &rows,
            hidden_seer,
        )?;

        Ok(ReplaySummary {
            steps_run: steps.len(),
            events_observed,
            rows_written: rows.len(),
            jsonl_path: self.outputs.jsonl,
            summary_path: self.outputs.summary_md,
            hidden_seer,
        })
    }

    fn checkpoint(
        &self,
        step: usize,
        label: Option<String>,
        outcome: &SearchOutcome,
    ) -> CheckpointRow {
        let village = self.engine.village();
        let me = self.engine.me();
        let candidates: Vec<Agent> = self
            .view
            .alive_agents()
            .filter(|agent| *agent != me)
            .collect();
        let beliefs = Agent::all(village.player_count())
            .map(|agent| AgentBeliefs {
                agent,
                alive: self.view.is_alive(agent),
                claim: self.engine.ledger().claim_of(agent),
                roles: village
                    .composition()
                    .iter()
                    .map(|(role, _)| (*role, outcome.probabilities().probability(agent, *role)))
                    .collect(),
            })
            .collect();

        CheckpointRow {
            run_id: self.config.run_id.clone(),
            step,
            label,
            day: self.view.day(),
            alive: self.view.alive_count(),
            mode: outcome.mode(),
            explored: outcome.explored(),
            kept: outcome.ranked().len(),
            best: outcome.best().map(|best| BestHypothesis {
                roles: best.roles().to_vec(),
                score: best.score(),
            }),
            suspect: outcome.most_likely(Role::Werewolf, &candidates),
            beliefs,
        }
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), ReplayError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_markdown(
    path: &Path,
    run_id: &str,
    engine: &Engine,
    rows: &[CheckpointRow],
    hidden_seer: Option<Agent>,
) -> Result<(), ReplayError> {
    let mut out = String::new();
    out.push_str(&format!("# Replay Summary: {run_id}\n\n"));
    out.push_str(&format!(
        "Holder: {} as {} ({} players)\n\n",
        engine.me(),
        engine.my_role(),
        engine.village().player_count()
    ));

    out.push_str("| Step | Label | Day | Alive | Mode | Explored | Best | Score | Suspect |\n");
    out.push_str("|------|-------|-----|-------|------|----------|------|-------|---------|\n");
    for row in rows {
        let (best, score) = match &row.best {
            Some(best) => (
                best.roles.iter().map(|role| role.initial()).collect::<String>(),
                format!("{:.2}", best.score),
            ),
            None => ("-".to_string(), "-inf".to_string()),
        };
        out.push_str(&format!(
            "| {step} | {label} | {day} | {alive} | {mode:?} | {explored} | {best} | {score} | {suspect} |\n",
            step = row.step,
            label = row.label.as_deref().unwrap_or(""),
            day = row.day,
            alive = row.alive,
            mode = row.mode,
            explored = row.explored,
            suspect = row
                .suspect
                .map(|agent| agent.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ));
    }

    if let Some(last) = rows.last() {
        let roles: Vec<Role> = engine
            .village()
            .composition()
            .iter()
            .map(|(role, _)| *role)
            .collect();
        out.push_str("\n## Final beliefs\n\n| Agent | Alive | Claim |");
        for role in &roles {
            out.push_str(&format!(" {role} |"));
        }
        out.push_str("\n|-------|-------|-------|");
        for _ in &roles {
            out.push_str("------|");
        }
        out.push('\n');
        for belief in &last.beliefs {
            out.push_str(&format!(
                "| {} | {} | {} |",
                belief.agent,
                if belief.alive { "Yes" } else { "No" },
                belief
                    .claim
                    .map(|role| role.to_string())
                    .unwrap_or_else(|| "-".to_string())
            ));
            for role in &roles {
                let probability = belief.roles.get(role).copied().unwrap_or(0.0);
                out.push_str(&format!(" {:.1}% |", probability * 100.0));
            }
            out.push('\n');
        }
    }

    if let Some(seer) = hidden_seer {
        out.push_str(&format!("\nHidden seer: {seer} never came out.\n"));
    }

    fs::write(path, out)?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize checkpoint row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
}
