//! Command handlers for the fxl CLI.

use std::fs;
use std::process::exit;

use anyhow::{Context, Result};

use fxl_engine::ScenarioExecutor;
use fxl_model::{RunStatus, Scenario};
use fxl_sim::{PaperSession, ResponderConfig};
use fxl_store::ScenarioStore;
use fxl_validate::ComplianceConfig;

/// Execute `fxl run <file>`: load the scenario, run it against a fresh paper
/// session, print the outcome. Exits non-zero when the run fails so shell
/// pipelines can gate on it.
pub async fn run_scenario(file: &str, silent: bool, no_limits: bool) -> Result<()> {
    let raw = fs::read_to_string(file).with_context(|| format!("read scenario file {file}"))?;
    let scenario: Scenario =
        serde_json::from_str(&raw).with_context(|| format!("parse scenario file {file}"))?;

    let responder = if silent {
        ResponderConfig::silent()
    } else {
        ResponderConfig::ack_only()
    };
    let compliance = if no_limits {
        ComplianceConfig::wide_open()
    } else {
        ComplianceConfig::default()
    };

    let session_id = format!("sess-{}", scenario.id);
    let mut executor =
        ScenarioExecutor::standard(PaperSession::new(session_id, responder), compliance);
    let result = executor.execute(&scenario).await;

    println!(
        "scenario={} status={:?} duration_ms={}",
        result.scenario_id,
        result.status,
        (result.finished_at - result.started_at).num_milliseconds()
    );
    for failure in &result.failures {
        println!("failure: {failure}");
    }

    if result.status != RunStatus::Passed {
        exit(1);
    }
    Ok(())
}

/// Execute `fxl list`: print id and name of every stored scenario.
pub fn list_scenarios(dir: &str) -> Result<()> {
    let store = ScenarioStore::new(dir)?;
    let scenarios = store.list()?;
    if scenarios.is_empty() {
        println!("no scenarios in {dir}");
        return Ok(());
    }
    for s in scenarios {
        println!("{}\t{} ({} steps)", s.id, s.name, s.sequence.len());
    }
    Ok(())
}

/// Execute `fxl show <id>`: print one stored scenario as pretty JSON.
pub fn show_scenario(id: &str, dir: &str) -> Result<()> {
    let store = ScenarioStore::new(dir)?;
    match store.load(id)? {
        Some(scenario) => {
            println!("{}", serde_json::to_string_pretty(&scenario)?);
            Ok(())
        }
        None => {
            eprintln!("scenario not found: {id}");
            exit(2);
        }
    }
}
