//! Run registry: concurrent run records and the bounded worker pool.
//!
//! Multiple scenario runs may execute concurrently; each run owns its own
//! simulator and lifecycle tracker, so the registry map is the only state
//! shared across runs. Concurrency is bounded by a semaphore: acquiring a
//! permit is the only queueing point, and a timed-out or failed run releases
//! its permit like any other.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, Semaphore};
use tracing::{error, info};
use uuid::Uuid;

use fxl_model::{RunResult, RunStatus, Scenario};
use fxl_sim::SessionSimulator;

use crate::executor::ScenarioExecutor;

/// Default worker pool size.
pub const DEFAULT_MAX_CONCURRENT_RUNS: usize = 10;

// ---------------------------------------------------------------------------
// ExecutionRecord
// ---------------------------------------------------------------------------

/// Registry view of one run: RUNNING until the executor returns, then the
/// terminal status plus the ordered failure list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub run_id: Uuid,
    pub scenario_id: String,
    pub status: RunStatus,
    pub failures: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExecutionRecord {
    fn running(run_id: Uuid, scenario_id: String) -> Self {
        Self {
            run_id,
            scenario_id,
            status: RunStatus::Running,
            failures: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    fn complete(&mut self, result: &RunResult) {
        self.status = result.status;
        self.failures = result.failures.clone();
        self.finished_at = Some(result.finished_at);
    }
}

// ---------------------------------------------------------------------------
// RunRegistry
// ---------------------------------------------------------------------------

pub struct RunRegistry {
    runs: RwLock<HashMap<Uuid, ExecutionRecord>>,
    permits: Arc<Semaphore>,
}

impl RunRegistry {
    pub fn new(max_concurrent_runs: usize) -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
            permits: Arc::new(Semaphore::new(max_concurrent_runs)),
        }
    }

    pub async fn get(&self, run_id: Uuid) -> Option<ExecutionRecord> {
        self.runs.read().await.get(&run_id).cloned()
    }

    pub async fn list(&self) -> Vec<ExecutionRecord> {
        let mut records: Vec<_> = self.runs.read().await.values().cloned().collect();
        records.sort_by_key(|r| r.started_at);
        records
    }

    /// Execute synchronously under a worker-pool permit and return the
    /// finished record.
    pub async fn execute<S>(
        &self,
        scenario: Scenario,
        mut executor: ScenarioExecutor<S>,
    ) -> ExecutionRecord
    where
        S: SessionSimulator,
    {
        let run_id = Uuid::new_v4();
        let mut record = ExecutionRecord::running(run_id, scenario.id.clone());
        self.runs.write().await.insert(run_id, record.clone());

        // The semaphore is never closed, but a closed-pool result must still
        // terminate the run rather than wedge it in RUNNING.
        match self.permits.acquire().await {
            Ok(_permit) => {
                let result = executor.execute(&scenario).await;
                record.complete(&result);
            }
            Err(_) => {
                error!(%run_id, "worker pool closed; failing run");
                record.status = RunStatus::Failed;
                record.failures.push("worker pool closed".to_string());
                record.finished_at = Some(Utc::now());
            }
        }

        self.runs.write().await.insert(run_id, record.clone());
        record
    }

    /// Spawn the run on the worker pool and return its id. The RUNNING
    /// record is inserted before this returns, so the id is immediately
    /// queryable.
    pub async fn execute_detached<S>(
        self: &Arc<Self>,
        scenario: Scenario,
        mut executor: ScenarioExecutor<S>,
    ) -> Uuid
    where
        S: SessionSimulator + 'static,
    {
        let run_id = Uuid::new_v4();
        let record = ExecutionRecord::running(run_id, scenario.id.clone());
        self.runs.write().await.insert(run_id, record.clone());
        let registry = Arc::clone(self);

        tokio::spawn(async move {
            let mut record = record;
            match registry.permits.acquire().await {
                Ok(_permit) => {
                    let result = executor.execute(&scenario).await;
                    record.complete(&result);
                }
                Err(_) => {
                    error!(%run_id, "worker pool closed; failing run");
                    record.status = RunStatus::Failed;
                    record.failures.push("worker pool closed".to_string());
                    record.finished_at = Some(Utc::now());
                }
            }

            info!(%run_id, status = ?record.status, "detached run finished");
            registry.runs.write().await.insert(run_id, record);
        });

        run_id
    }
}

impl Default for RunRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_RUNS)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use fxl_model::{Step, StepAction};
    use fxl_sim::{PaperSession, ResponderConfig};
    use fxl_validate::ComplianceConfig;

    fn quick_scenario(id: &str) -> Scenario {
        Scenario {
            id: id.to_string(),
            name: "registry test".to_string(),
            description: String::new(),
            config: Default::default(),
            sequence: vec![Step::new(StepAction::VerifySessionState)
                .with_param("expectedState", "LOGGED_ON")],
        }
    }

    fn executor() -> ScenarioExecutor<PaperSession> {
        ScenarioExecutor::standard(
            PaperSession::new("sess-reg", ResponderConfig::ack_only()),
            ComplianceConfig::wide_open(),
        )
    }

    #[tokio::test]
    async fn sync_execution_records_a_terminal_status() {
        let registry = RunRegistry::default();
        let record = registry.execute(quick_scenario("scn-1"), executor()).await;
        assert_eq!(record.status, RunStatus::Passed);
        assert!(record.finished_at.is_some());

        let fetched = registry.get(record.run_id).await.unwrap();
        assert_eq!(fetched.status, RunStatus::Passed);
    }

    #[tokio::test]
    async fn detached_execution_is_queryable_by_run_id() {
        let registry = Arc::new(RunRegistry::default());
        let run_id = registry
            .execute_detached(quick_scenario("scn-2"), executor())
            .await;

        // The RUNNING record is visible immediately.
        assert!(registry.get(run_id).await.is_some());

        // Poll until the spawned run lands its terminal record.
        let mut status = None;
        for _ in 0..50 {
            if let Some(rec) = registry.get(run_id).await {
                if rec.status.is_terminal() {
                    status = Some(rec.status);
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(status, Some(RunStatus::Passed));
    }

    #[tokio::test]
    async fn unknown_run_id_is_none() {
        let registry = RunRegistry::default();
        assert!(registry.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn concurrent_runs_do_not_share_trackers() {
        // Two runs using the same client order id must both pass: the
        // duplicate-id rule is per-run, not per-registry.
        let registry = Arc::new(RunRegistry::default());
        let scenario = |id: &str| Scenario {
            id: id.to_string(),
            name: "isolation".to_string(),
            description: String::new(),
            config: Default::default(),
            sequence: vec![Step::new(StepAction::SendNewOrder).with_param("clOrdID", "shared-id")],
        };

        let a = registry.execute(scenario("scn-a"), executor()).await;
        let b = registry.execute(scenario("scn-b"), executor()).await;
        assert_eq!(a.status, RunStatus::Passed, "{:?}", a.failures);
        assert_eq!(b.status, RunStatus::Passed, "{:?}", b.failures);
    }

    #[tokio::test]
    async fn list_returns_runs_in_start_order() {
        let registry = RunRegistry::default();
        registry.execute(quick_scenario("first"), executor()).await;
        registry.execute(quick_scenario("second"), executor()).await;
        let records = registry.list().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].scenario_id, "first");
        assert_eq!(records[1].scenario_id, "second");
    }
}
