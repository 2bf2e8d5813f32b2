//! Config schema generator
//!
//! Prints the JSON schema of the reconciler's YAML configuration file.
//!
//! Usage: cargo run --bin schemagen > schema/influxdb-user.schema.json

use influxdb_user_reconciler::model::generate_schema;

fn main() -> anyhow::Result<()> {
    println!("{}", generate_schema()?);
    Ok(())
}
