//! Axum-based HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use gatecheck_engine::VerificationEngine;
use gatecheck_types::{EventId, UserId, VerificationId};

use crate::error::RpcError;
use crate::handlers::{
    HealthResponse, HistoryQuery, HistoryResponse, SupportDecisionRequest,
    SupportDecisionResponse, VerificationReport, VerifyRequest,
};
use crate::metrics::EngineMetrics;

/// Shared state handed to every handler.
pub struct AppState {
    pub engine: VerificationEngine,
    pub metrics: EngineMetrics,
}

/// The HTTP server, configured with a bind address and shared state.
pub struct RpcServer {
    addr: SocketAddr,
    state: Arc<AppState>,
}

impl RpcServer {
    pub fn new(addr: SocketAddr, engine: VerificationEngine, metrics: EngineMetrics) -> Self {
        Self {
            addr,
            state: Arc::new(AppState { engine, metrics }),
        }
    }

    /// The routes this server exposes, for embedding and tests.
    pub fn router(&self) -> Router {
        router(Arc::clone(&self.state))
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn start_with_shutdown(
        &self,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), RpcError> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;
        tracing::info!(addr = %self.addr, "rpc server listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;
        Ok(())
    }

    /// Bind and serve until the task is dropped.
    pub async fn start(&self) -> Result<(), RpcError> {
        self.start_with_shutdown(std::future::pending()).await
    }
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/verify", post(verify))
        .route("/support-decision", post(support_decision))
        .route("/history", get(history))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// POST /verify — decide one check-in attempt.
///
/// Always answers 200 with a report. An engine failure converts to the
/// fail-closed `Error` report here; it never surfaces as an HTTP error,
/// so a broken store cannot be mistaken for an accepted check-in.
async fn verify(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyRequest>,
) -> Json<VerificationReport> {
    let started = Instant::now();
    let attempt = request.attempt();
    let report = match state.engine.verify(
        UserId::new(request.user_id),
        EventId::new(request.event_id),
        &attempt,
    ) {
        Ok(outcome) => {
            state.metrics.observe_outcome(&outcome);
            VerificationReport::from_outcome(&outcome)
        }
        Err(err) => {
            tracing::warn!(
                user = request.user_id,
                event = request.event_id,
                error = %err,
                "verification failed, answering closed"
            );
            state.metrics.observe_failure();
            VerificationReport::failure(&err)
        }
    };
    state
        .metrics
        .verify_latency_ms
        .observe(started.elapsed().as_secs_f64() * 1_000.0);
    Json(report)
}

/// POST /support-decision — record a human ruling on a decided record.
async fn support_decision(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SupportDecisionRequest>,
) -> Result<Json<SupportDecisionResponse>, RpcError> {
    let outcome = state.engine.record_support_decision(
        VerificationId::new(request.verification_id),
        request.decision,
        request.notes,
    )?;
    state.metrics.observe_support(&outcome);
    Ok(Json(SupportDecisionResponse::from_outcome(&outcome)))
}

/// GET /history — decided records, newest first.
async fn history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, RpcError> {
    let records = state.engine.verification_history(&query.filter())?;
    Ok(Json(HistoryResponse::from_records(&records)))
}

/// GET /health — liveness probe.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// GET /metrics — Prometheus text exposition.
async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.encode(),
    )
}
