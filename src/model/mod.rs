//! Desired-state types for the InfluxDB user reconciler

mod config;
mod connection;
mod user;

pub use config::*;
pub use connection::*;
pub use user::*;

use schemars::schema_for;

/// Generate the JSON schema of the YAML configuration file
pub fn generate_schema() -> crate::Result<String> {
    let schema = schema_for!(ConfigFile);
    Ok(serde_json::to_string_pretty(&schema)?)
}
