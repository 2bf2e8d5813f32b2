//! InfluxDB user reconciler CLI
//!
//! Builds the configuration from a YAML file and/or flags, probes the HTTP
//! client, connects, reconciles one user and prints a JSON result document
//! on stdout.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use influxdb_user_reconciler::{
    adapters::{probe_http_capability, InfluxClient},
    metrics,
    model::{DuplicatePolicy, Overrides, Password, ReconcileConfig, UserState},
    reconcilers::{self, ReconcileOptions, ReconcileOutcome},
    report, ErrorKind,
};

/// Exit code for an invalid invocation
const EXIT_USAGE: u8 = 2;

#[derive(Parser)]
#[command(name = "influxdb-user")]
#[command(about = "Converge an InfluxDB user to its desired state", long_about = None)]
struct Cli {
    /// YAML configuration file; flags and env vars override its values
    #[arg(long, env = "INFLUXDB_USER_CONFIG")]
    config: Option<PathBuf>,

    /// Server address
    #[arg(long, env = "INFLUXDB_HOST")]
    host: Option<String>,

    /// Server port [default: 8086]
    #[arg(long, env = "INFLUXDB_PORT")]
    port: Option<u16>,

    /// User to connect as [default: root]
    #[arg(long, env = "INFLUXDB_CONNECT_USER")]
    connect_user: Option<String>,

    /// Password to connect with [default: root]
    #[arg(long, env = "INFLUXDB_CONNECT_PASSWORD", hide_env_values = true)]
    connect_password: Option<String>,

    /// Transport timeout in seconds [default: 10]
    #[arg(long, env = "INFLUXDB_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// User to manage
    #[arg(long)]
    user: Option<String>,

    /// Password to set on create or reset
    #[arg(long, env = "INFLUXDB_USER_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Desired presence [default: present]
    #[arg(long, value_enum)]
    state: Option<UserState>,

    /// Desired admin privilege
    #[arg(long, num_args = 0..=1, default_missing_value = "true", action = ArgAction::Set)]
    admin: Option<bool>,

    /// Set the password even if the user already exists
    #[arg(long, num_args = 0..=1, default_missing_value = "true", action = ArgAction::Set)]
    reset_password: Option<bool>,

    /// Handling of duplicate user records [default: fail]
    #[arg(long, value_enum)]
    on_duplicate: Option<DuplicatePolicy>,

    /// Report what would change without changing it
    #[arg(long)]
    dry_run: bool,

    /// Write Prometheus metrics to this file after the run
    #[arg(long, env = "INFLUXDB_USER_METRICS_FILE")]
    metrics_file: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            port: self.port,
            connect_user: self.connect_user.clone(),
            connect_password: self.connect_password.clone().map(Password::from),
            timeout_secs: self.timeout_secs,
            user: self.user.clone(),
            password: self.password.clone().map(Password::from),
            state: self.state,
            admin: self.admin,
            reset_password: self.reset_password,
            on_duplicate: self.on_duplicate,
        }
    }

    fn load_config(&self) -> anyhow::Result<ReconcileConfig> {
        let layers = match &self.config {
            Some(path) => {
                let file = Overrides::from_file(path)
                    .with_context(|| format!("loading {}", path.display()))?;
                self.overrides().or(file)
            }
            None => self.overrides(),
        };
        Ok(layers.into_config()?)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing();

    let result = run(&cli).await;

    if let Some(path) = &cli.metrics_file {
        if let Err(e) = metrics::write_textfile(path) {
            error!(error = %e, "Failed to write metrics textfile");
        }
    }

    match result {
        Ok(outcome) => {
            println!("{}", report::success(&outcome));
            ExitCode::SUCCESS
        }
        Err(e) => {
            let kind = report::failure_kind(&e);
            error!(error = %format!("{:#}", e), kind = ?kind, "Reconciliation failed");
            println!("{}", report::failure(&e));
            if kind == ErrorKind::ConfigError {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<ReconcileOutcome> {
    let config = cli.load_config()?;
    let conn = &config.connection;

    info!(
        host = %conn.host,
        port = conn.port,
        user = %config.user.name,
        state = ?config.user.state,
        dry_run = cli.dry_run,
        "Starting InfluxDB user reconciliation"
    );

    let http = probe_http_capability(conn.timeout())?;
    let client = InfluxClient::connect(http, conn).await?;

    let options = ReconcileOptions {
        on_duplicate: config.on_duplicate,
        dry_run: cli.dry_run,
    };
    let outcome = reconcilers::reconcile(&client, &config.user, options).await?;
    Ok(outcome)
}

/// Initialize tracing subscriber on stderr; stdout carries the result document
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();
}
