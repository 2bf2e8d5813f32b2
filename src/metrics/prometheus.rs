//! Prometheus metrics definitions and textfile export

use std::io::Write;
use std::path::Path;

use prometheus::{
    register_counter_vec, register_gauge, register_histogram, CounterVec, Encoder, Gauge,
    Histogram, TextEncoder,
};
use tracing::info;

use crate::error::{Error, Result};

lazy_static::lazy_static! {
    /// Total number of reconciliation runs by outcome
    pub static ref RECONCILIATIONS: CounterVec = register_counter_vec!(
        "influxdb_user_reconciliations_total",
        "Total number of reconciliation runs by outcome",
        &["outcome"]
    ).unwrap();

    /// Mutating calls by operation and whether they were sent or simulated
    pub static ref MUTATIONS: CounterVec = register_counter_vec!(
        "influxdb_user_mutations_total",
        "Total number of user mutations by operation and mode",
        &["operation", "mode"]
    ).unwrap();

    /// Reconciliation duration histogram
    pub static ref RECONCILE_DURATION: Histogram = register_histogram!(
        "influxdb_user_reconcile_duration_seconds",
        "Duration of reconciliations in seconds",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();

    /// Unix time of the last finished run
    pub static ref LAST_RUN_TIMESTAMP: Gauge = register_gauge!(
        "influxdb_user_last_run_timestamp_seconds",
        "Unix timestamp of the last reconciliation run"
    ).unwrap();
}

/// Encode the default registry in the text exposition format
pub fn render() -> Result<Vec<u8>> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;
    Ok(buffer)
}

/// Write all metrics to `path`, replacing it atomically
pub fn write_textfile(path: &Path) -> Result<()> {
    let buffer = render()?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    let mut file = std::fs::File::create(tmp_path)?;
    file.write_all(&buffer)?;
    file.sync_all()?;
    std::fs::rename(tmp_path, path)?;

    info!(path = %path.display(), "Wrote metrics textfile");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textfile_contains_registered_metrics() {
        RECONCILIATIONS.with_label_values(&["unchanged"]).inc();
        LAST_RUN_TIMESTAMP.set(1.0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("influxdb_user.prom");
        write_textfile(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("influxdb_user_reconciliations_total"));
        assert!(contents.contains("influxdb_user_last_run_timestamp_seconds"));
        assert!(!dir.path().join("influxdb_user.prom.tmp").exists());
    }
}
