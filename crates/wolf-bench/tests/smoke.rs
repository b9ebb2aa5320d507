use std::fs;
use std::path::Path;

use tempfile::tempdir;
use wolf_bench::config::ScenarioConfig;
use wolf_bench::replay::{ReplayError, ReplayRunner};

fn load_config(output_dir: &Path, strict: bool, extra_steps: &str) -> ScenarioConfig {
    let yaml = format!(
        r#"
run_id: "test_smoke"
setup:
  players: 5
  me: 0
  my_role: seer
engine:
  strict: {strict}
  search:
    seed: 4242
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
    label: "day 1"
  - step: execute
    agent: 4
  - step: set_day
    day: 2
    deaths: [1]
  - step: event
    event:
      kind: attacked
      target: 1
  - step: search
    label: "day 2"
{extra_steps}
outputs:
  jsonl: "{jsonl}"
  summary_md: "{summary}"
logging:
  enable_structured: false
"#,
        jsonl = output_dir.join("checkpoints.jsonl").display(),
        summary = output_dir.join("summary.md").display(),
    );

    let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("valid yaml");
    cfg.validate().expect("config validates");
    cfg
}

#[test]
fn replay_writes_one_row_per_checkpoint() {
    let dir = tempdir().expect("temp dir");
    let config = load_config(dir.path(), false, "");
    let outputs = config.resolved_outputs();

    let runner = ReplayRunner::new(config, outputs).expect("runner created");
    let summary = runner.run().expect("replay completes");

    assert_eq!(summary.steps_run, 8);
    assert_eq!(summary.events_observed, 3);
    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.hidden_seer, None);

    let jsonl = fs::read_to_string(&summary.jsonl_path).expect("jsonl readable");
    let rows: Vec<serde_json::Value> = jsonl
        .lines()
        .map(|line| serde_json::from_str(line).expect("row decodes to JSON"))
        .collect();
    assert_eq!(rows.len(), 2);

    for row in &rows {
        assert_eq!(row["run_id"], "test_smoke");
        assert_eq!(row["mode"], "exhaustive");
        let best = row["best"]["roles"].as_array().expect("best hypothesis");
        assert_eq!(best[0], "seer");
        assert_eq!(best[3], "werewolf");
        let wolf = row["beliefs"][3]["roles"]["werewolf"]
            .as_f64()
            .expect("probability");
        assert!((wolf - 1.0).abs() < 1e-9);
    }

    let morning = &rows[1];
    assert_eq!(morning["day"], 2);
    assert_eq!(morning["alive"], 3);
    assert_eq!(morning["beliefs"][1]["alive"], false);
    assert_eq!(morning["beliefs"][2]["claim"], "seer");
    assert_eq!(morning["suspect"], 3);

    let markdown = fs::read_to_string(&summary.summary_path).expect("summary readable");
    assert!(markdown.contains("# Replay Summary: test_smoke"));
    assert!(markdown.contains("| day 2 |"));
    assert!(markdown.contains("## Final beliefs"));
}

#[test]
fn replay_reports_a_seer_that_never_came_out() {
    let dir = tempdir().expect("temp dir");
    let finish = r#"  - step: finish
    roles:
      0: villager
      1: seer
      2: possessed
      3: werewolf
      4: villager
"#;
    let config = load_config(dir.path(), false, finish);
    let outputs = config.resolved_outputs();

    let summary = ReplayRunner::new(config, outputs)
        .expect("runner created")
        .run()
        .expect("replay completes");
    assert_eq!(summary.hidden_seer, Some(wolf_core::model::Agent::new(1)));

    let markdown = fs::read_to_string(&summary.summary_path).expect("summary readable");
    assert!(markdown.contains("Hidden seer: Agent[02]"));
}

#[test]
fn strict_replay_fails_when_the_reveal_has_no_seer() {
    let dir = tempdir().expect("temp dir");
    let finish = r#"  - step: finish
    roles:
      0: villager
"#;
    let config = load_config(dir.path(), true, finish);
    let outputs = config.resolved_outputs();

    let err = ReplayRunner::new(config, outputs)
        .expect("runner created")
        .run()
        .expect_err("missing seer is fatal in strict mode");
    assert!(matches!(err, ReplayError::Engine(_)));
}
