//! Shared runtime state for fxl-daemon.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use fxl_engine::RunRegistry;
use fxl_sim::ResponderConfig;
use fxl_store::ScenarioStore;
use fxl_validate::ComplianceConfig;

/// Static build metadata included in the health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Cloneable (Arc) handle shared across all Axum handlers.
pub struct AppState {
    pub build: BuildInfo,
    pub store: ScenarioStore,
    pub registry: Arc<RunRegistry>,
    /// Compliance limits applied to every run started through the daemon.
    pub compliance: ComplianceConfig,
    /// Scripted behavior of the paper session each run talks to.
    pub responder: ResponderConfig,
}

impl AppState {
    pub fn new(scenario_dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            build: BuildInfo {
                service: "fxl-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            store: ScenarioStore::new(scenario_dir)?,
            registry: Arc::new(RunRegistry::default()),
            compliance: ComplianceConfig::default(),
            responder: ResponderConfig::ack_only(),
        })
    }

    /// Test constructor: permissive compliance so route tests are not
    /// sensitive to the wall clock.
    pub fn for_tests(scenario_dir: impl AsRef<Path>) -> Result<Self> {
        let mut state = Self::new(scenario_dir)?;
        state.compliance = ComplianceConfig::wide_open();
        Ok(state)
    }
}
