//! InfluxDB user reconciler
//!
//! Declaratively manages one InfluxDB 1.x user: given the desired presence,
//! password and admin flag it inspects the server's user list and issues
//! only the statements needed to converge it.

pub mod adapters;
pub mod error;
pub mod metrics;
pub mod model;
pub mod reconcilers;
pub mod report;

pub use error::{Error, ErrorKind, Result};
