//! HTTP API for the GateCheck verification engine.
//!
//! Provides endpoints for:
//! - Check-in verification (`POST /verify`)
//! - Support rulings on decided records (`POST /support-decision`)
//! - Verification history queries (`GET /history`)
//! - Liveness and Prometheus metrics (`GET /health`, `GET /metrics`)
//!
//! `/verify` never returns an HTTP error for an engine failure: the
//! fail-closed conversion to an `Error` report happens here, at the
//! boundary, so callers always get a report they can act on.

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod server;

pub use error::RpcError;
pub use metrics::EngineMetrics;
pub use server::RpcServer;
