//! Prometheus backend for the task run reconciler.
//!
//! [`PrometheusMetrics`] implements [`tkr_core::metrics::MetricsBackend`]. The crate
//! ships no HTTP server; the daemon exposes [`PrometheusMetrics::encode_text`] on
//! `/metrics`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tkr_core::prelude::ReconcilerContext;
//! use tkr_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let ctx = ReconcilerContext::default().with_metrics(Arc::new(metrics.clone()));
//!
//! let body = metrics.encode_text()?;
//! # let _ = (ctx, body);
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `tkr_pods_created_total` - Counter
//! - `tkr_runs_completed_total{outcome}` - Counter
//! - `tkr_run_duration_seconds{outcome}` - Histogram
//! - `tkr_run_retries_total` - Counter
//! - `tkr_reconcile_errors_total{error_kind}` - Counter
mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
