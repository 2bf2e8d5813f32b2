//! InfluxDB 1.x HTTP client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::adapters::{influxql, ObservedUser, UserAdmin};
use crate::error::{Error, Result};
use crate::model::{ConnectionSpec, Password};

/// Build the HTTP client once at startup.
///
/// Failing here means the runtime lacks what the client needs (for example a
/// usable TLS backend), so nothing has been sent to the server yet.
pub fn probe_http_capability(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("influxdb-user-reconciler/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::dependency_missing(format!("HTTP client unavailable: {}", e)))
}

/// Client bound to one server and one set of connecting credentials
#[derive(Clone, Debug)]
pub struct InfluxClient {
    http: Client,
    base_url: String,
    username: String,
    password: Password,
}

impl InfluxClient {
    /// Bind to the server described by `conn` and check it answers `/ping`
    pub async fn connect(http: Client, conn: &ConnectionSpec) -> Result<Self> {
        let client = Self {
            http,
            base_url: conn.base_url(),
            username: conn.connect_user.clone(),
            password: conn.connect_password.clone(),
        };
        client.ping().await?;
        info!(url = %client.base_url, user = %client.username, "Connected to InfluxDB");
        Ok(client)
    }

    async fn ping(&self) -> Result<()> {
        let response = self
            .http
            .get(format!("{}/ping", self.base_url))
            .basic_auth(&self.username, Some(self.password.expose()))
            .send()
            .await
            .map_err(|e| Error::connection(format!("{} unreachable: {}", self.base_url, e)))?;

        let status = response.status();
        if is_auth_failure(status) {
            return Err(Error::connection(format!(
                "credentials for '{}' rejected by {}",
                self.username, self.base_url
            )));
        }
        if !status.is_success() {
            return Err(Error::connection(format!(
                "ping to {} returned {}",
                self.base_url, status
            )));
        }
        if let Some(version) = response.headers().get("X-Influxdb-Version") {
            debug!(version = ?version, "Server version");
        }
        Ok(())
    }

    /// Run one statement; `operation` names it in errors
    async fn query(&self, method: Method, statement: &str, operation: &str) -> Result<QueryResponse> {
        let url = format!("{}/query", self.base_url);
        let request = self
            .http
            .request(method.clone(), url)
            .basic_auth(&self.username, Some(self.password.expose()));
        let params = [("q", statement)];
        let request = if method == Method::GET {
            request.query(&params)
        } else {
            request.form(&params)
        };

        let response = request
            .send()
            .await
            .map_err(|e| Error::connection(format!("{} unreachable: {}", self.base_url, e)))?;

        let status = response.status();
        if is_auth_failure(status) {
            return Err(Error::connection(format!(
                "credentials for '{}' rejected by {}",
                self.username, self.base_url
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::remote(operation, format!("failed to read response: {}", e)))?;

        let parsed = match serde_json::from_str::<QueryResponse>(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(Error::remote(operation, format!("HTTP {}: {}", status, body.trim())));
            }
            Err(e) => {
                return Err(Error::remote(operation, format!("malformed response: {}", e)));
            }
        };

        if let Some(message) = parsed.first_error() {
            return Err(Error::remote(operation, message));
        }
        if !status.is_success() {
            return Err(Error::remote(operation, format!("HTTP {}", status)));
        }
        Ok(parsed)
    }

    async fn execute(&self, statement: String, operation: &str) -> Result<()> {
        self.query(Method::POST, &statement, operation).await?;
        debug!(operation = operation, "Statement accepted");
        Ok(())
    }
}

fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

#[async_trait]
impl UserAdmin for InfluxClient {
    async fn list_users(&self) -> Result<Vec<ObservedUser>> {
        let response = self
            .query(Method::GET, influxql::SHOW_USERS, "show users")
            .await?;
        response.users()
    }

    async fn create_user(&self, name: &str, password: &Password, admin: bool) -> Result<()> {
        self.execute(influxql::create_user(name, password, admin), "create user")
            .await
    }

    async fn drop_user(&self, name: &str) -> Result<()> {
        self.execute(influxql::drop_user(name), "drop user").await
    }

    async fn set_admin(&self, name: &str, admin: bool) -> Result<()> {
        let operation = if admin { "grant admin" } else { "revoke admin" };
        self.execute(influxql::set_admin(name, admin), operation).await
    }

    async fn set_password(&self, name: &str, password: &Password) -> Result<()> {
        self.execute(influxql::set_password(name, password), "set password")
            .await
    }
}

/// Body of a `/query` response
#[derive(Debug, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<StatementResult>,

    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatementResult {
    #[serde(default)]
    pub series: Vec<Series>,

    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Series {
    #[serde(default)]
    pub columns: Vec<String>,

    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl QueryResponse {
    fn first_error(&self) -> Option<String> {
        self.error
            .clone()
            .or_else(|| self.results.iter().find_map(|r| r.error.clone()))
    }

    /// Decode the rows of a `SHOW USERS` result, preserving server order
    pub fn users(&self) -> Result<Vec<ObservedUser>> {
        let mut users = Vec::new();
        for series in self.results.iter().flat_map(|r| r.series.iter()) {
            let user_idx = column_index(series, "user")?;
            let admin_idx = column_index(series, "admin")?;

            for row in &series.values {
                let name = row
                    .get(user_idx)
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::remote("show users", "row without a user name"))?;
                let admin = row
                    .get(admin_idx)
                    .and_then(Value::as_bool)
                    .ok_or_else(|| {
                        Error::remote("show users", format!("row for '{}' without admin flag", name))
                    })?;
                users.push(ObservedUser::new(name, admin));
            }
        }
        Ok(users)
    }
}

fn column_index(series: &Series, column: &str) -> Result<usize> {
    series
        .columns
        .iter()
        .position(|c| c == column)
        .ok_or_else(|| Error::remote("show users", format!("missing '{}' column", column)))
}
