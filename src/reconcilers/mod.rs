//! Reconcilers for managed InfluxDB objects
//!
//! Reconcilers are responsible for:
//! - Looking up the observed state
//! - Planning corrective actions
//! - Dispatching them, or simulating them under dry-run

pub mod user;

pub use user::{reconcile, ReconcileOptions, ReconcileOutcome};
