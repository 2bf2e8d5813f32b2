//! Prometheus metrics for the InfluxDB user reconciler
//!
//! Runs are one-shot, so metrics are exported by writing a textfile for the
//! node exporter's textfile collector rather than by serving HTTP.

mod prometheus;

pub use prometheus::*;
