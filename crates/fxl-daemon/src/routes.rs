//! Axum router and all HTTP handlers for fxl-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, warn};
use uuid::Uuid;

use fxl_engine::ScenarioExecutor;
use fxl_model::Scenario;
use fxl_sim::PaperSession;

use crate::api_types::{ErrorResponse, ExecuteAccepted, ExecuteQuery, HealthResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/scenarios", get(list_scenarios).post(create_scenario))
        .route(
            "/v1/scenarios/:id",
            get(get_scenario).delete(delete_scenario),
        )
        .route("/v1/scenarios/:id/execute", post(execute_scenario))
        .route("/v1/runs/:id", get(get_run))
        .with_state(state)
}

fn internal_error(e: anyhow::Error) -> Response {
    warn!(error = %e, "internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

fn not_found(what: &str, id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("{what} not found: {id}"),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/scenarios
// ---------------------------------------------------------------------------

pub(crate) async fn list_scenarios(State(st): State<Arc<AppState>>) -> Response {
    match st.store.list() {
        Ok(scenarios) => (StatusCode::OK, Json(scenarios)).into_response(),
        Err(e) => internal_error(e),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/scenarios
// ---------------------------------------------------------------------------

pub(crate) async fn create_scenario(
    State(st): State<Arc<AppState>>,
    Json(mut scenario): Json<Scenario>,
) -> Response {
    if scenario.id.trim().is_empty() {
        scenario.id = Uuid::new_v4().to_string();
    }

    match st.store.save(&scenario) {
        Ok(()) => {
            info!(scenario_id = %scenario.id, name = %scenario.name, "scenario created");
            (StatusCode::CREATED, Json(scenario)).into_response()
        }
        Err(e) => internal_error(e),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/scenarios/{id}
// ---------------------------------------------------------------------------

pub(crate) async fn get_scenario(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match st.store.load(&id) {
        Ok(Some(scenario)) => (StatusCode::OK, Json(scenario)).into_response(),
        Ok(None) => not_found("scenario", &id),
        Err(e) => internal_error(e),
    }
}

// ---------------------------------------------------------------------------
// DELETE /v1/scenarios/{id}
// ---------------------------------------------------------------------------

pub(crate) async fn delete_scenario(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match st.store.delete(&id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found("scenario", &id),
        Err(e) => internal_error(e),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/scenarios/{id}/execute
// ---------------------------------------------------------------------------

/// Execute a stored scenario against a fresh paper session.
///
/// `?mode=async` returns `202 Accepted` with the run id immediately; the
/// default sync mode blocks until the run is terminal and returns the full
/// execution record. Either way each run owns an independent simulator and
/// lifecycle tracker.
pub(crate) async fn execute_scenario(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ExecuteQuery>,
) -> Response {
    let scenario = match st.store.load(&id) {
        Ok(Some(s)) => s,
        Ok(None) => return not_found("scenario", &id),
        Err(e) => return internal_error(e),
    };

    let session_id = format!("sess-{}", scenario.id);
    let executor = ScenarioExecutor::standard(
        PaperSession::new(session_id, st.responder.clone()),
        st.compliance.clone(),
    );

    match query.mode.as_deref() {
        Some("async") => {
            let run_id = st.registry.execute_detached(scenario, executor).await;
            info!(%run_id, scenario_id = %id, "scenario execution accepted");
            (StatusCode::ACCEPTED, Json(ExecuteAccepted { run_id })).into_response()
        }
        _ => {
            let record = st.registry.execute(scenario, executor).await;
            info!(run_id = %record.run_id, status = ?record.status, "scenario executed");
            (StatusCode::OK, Json(record)).into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// GET /v1/runs/{id}
// ---------------------------------------------------------------------------

pub(crate) async fn get_run(State(st): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let Ok(run_id) = id.parse::<Uuid>() else {
        return not_found("run", &id);
    };
    match st.registry.get(run_id).await {
        Some(record) => (StatusCode::OK, Json(record)).into_response(),
        None => not_found("run", &id),
    }
}
