//! Adapters between the reconciler and the InfluxDB HTTP API
//!
//! The reconciler only talks to the [`UserAdmin`] trait; [`InfluxClient`]
//! implements it over the 1.x `/query` endpoint.

mod influxdb;
mod influxql;

pub use influxdb::*;
pub use influxql::*;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::Password;

/// The subset of a remote user record relevant to reconciliation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservedUser {
    pub name: String,
    pub admin: bool,
}

impl ObservedUser {
    pub fn new(name: impl Into<String>, admin: bool) -> Self {
        Self {
            name: name.into(),
            admin,
        }
    }
}

/// User administration primitives offered by the server
#[async_trait]
pub trait UserAdmin: Send + Sync {
    async fn list_users(&self) -> Result<Vec<ObservedUser>>;

    async fn create_user(&self, name: &str, password: &Password, admin: bool) -> Result<()>;

    async fn drop_user(&self, name: &str) -> Result<()>;

    /// Set the admin privilege to exactly `admin`, whichever direction that is
    async fn set_admin(&self, name: &str, admin: bool) -> Result<()>;

    async fn set_password(&self, name: &str, password: &Password) -> Result<()>;
}
