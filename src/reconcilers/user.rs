//! InfluxDB user reconciler
//!
//! Converges one user account towards its desired state:
//! - Lookup of the observed record by exact name
//! - Planning of at most two corrective actions
//! - Dispatch of those actions, or a simulated dispatch under dry-run

use std::time::Instant;

use tracing::{info, instrument, warn};

use crate::adapters::{ObservedUser, UserAdmin};
use crate::error::{Error, Result};
use crate::metrics;
use crate::model::{DuplicatePolicy, Password, UserSpec, UserState};

/// Result of matching the user list against the target name
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserLookup {
    NotFound,
    Found(ObservedUser),
    Ambiguous(Vec<ObservedUser>),
}

/// Select the records named exactly `name`
pub fn lookup_user(users: Vec<ObservedUser>, name: &str) -> UserLookup {
    let mut matches: Vec<ObservedUser> = users.into_iter().filter(|u| u.name == name).collect();
    match matches.len() {
        0 => UserLookup::NotFound,
        1 => UserLookup::Found(matches.remove(0)),
        _ => UserLookup::Ambiguous(matches),
    }
}

impl UserLookup {
    /// Collapse the lookup to "exists or not" under `policy`
    pub fn resolve(self, name: &str, policy: DuplicatePolicy) -> Result<Option<ObservedUser>> {
        match self {
            UserLookup::NotFound => Ok(None),
            UserLookup::Found(user) => Ok(Some(user)),
            UserLookup::Ambiguous(users) => {
                warn!(user = %name, count = users.len(), policy = ?policy, "Duplicate user records");
                match policy {
                    DuplicatePolicy::Fail => Err(Error::Consistency {
                        name: name.to_string(),
                        count: users.len(),
                    }),
                    DuplicatePolicy::First => Ok(users.into_iter().next()),
                    DuplicatePolicy::Absent => Ok(None),
                }
            }
        }
    }
}

/// A single mutating call against the server
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserAction {
    Create {
        name: String,
        password: Password,
        admin: bool,
    },
    Drop {
        name: String,
    },
    SetAdmin {
        name: String,
        admin: bool,
    },
    SetPassword {
        name: String,
        password: Password,
    },
}

impl UserAction {
    /// Stable label used in logs and metrics
    pub fn operation(&self) -> &'static str {
        match self {
            UserAction::Create { .. } => "create",
            UserAction::Drop { .. } => "drop",
            UserAction::SetAdmin { .. } => "set_admin",
            UserAction::SetPassword { .. } => "set_password",
        }
    }

    async fn dispatch(&self, client: &dyn UserAdmin) -> Result<()> {
        match self {
            UserAction::Create {
                name,
                password,
                admin,
            } => client.create_user(name, password, *admin).await,
            UserAction::Drop { name } => client.drop_user(name).await,
            UserAction::SetAdmin { name, admin } => client.set_admin(name, *admin).await,
            UserAction::SetPassword { name, password } => {
                client.set_password(name, password).await
            }
        }
    }
}

/// Compute the actions that bring `observed` to `spec`.
///
/// A presence change (create or drop) is never combined with admin or
/// password changes.
pub fn plan(spec: &UserSpec, observed: Option<&ObservedUser>) -> Vec<UserAction> {
    let mut actions = Vec::new();
    match (spec.state, observed) {
        (UserState::Present, None) => actions.push(UserAction::Create {
            name: spec.name.clone(),
            password: spec.password.clone(),
            admin: spec.admin,
        }),
        (UserState::Present, Some(existing)) => {
            if existing.admin != spec.admin {
                actions.push(UserAction::SetAdmin {
                    name: spec.name.clone(),
                    admin: spec.admin,
                });
            }
            if spec.reset_password {
                actions.push(UserAction::SetPassword {
                    name: spec.name.clone(),
                    password: spec.password.clone(),
                });
            }
        }
        (UserState::Absent, Some(_)) => actions.push(UserAction::Drop {
            name: spec.name.clone(),
        }),
        (UserState::Absent, None) => {}
    }
    actions
}

/// Dispatch `actions` in order, stopping at the first failure.
///
/// Under `dry_run` nothing is sent. A failure after earlier actions reached
/// the server is wrapped in [`Error::PartiallyApplied`].
pub async fn apply(client: &dyn UserAdmin, actions: &[UserAction], dry_run: bool) -> Result<()> {
    let mode = if dry_run { "simulated" } else { "applied" };
    let mut applied = Vec::new();
    for action in actions {
        if dry_run {
            info!(operation = action.operation(), "Dry run, would apply");
        } else {
            if let Err(e) = action.dispatch(client).await {
                if applied.is_empty() {
                    return Err(e);
                }
                warn!(operation = action.operation(), applied = ?applied, "Action failed after partial apply");
                return Err(Error::PartiallyApplied {
                    applied,
                    source: Box::new(e),
                });
            }
            applied.push(action.operation());
            info!(operation = action.operation(), "Applied");
        }
        metrics::MUTATIONS
            .with_label_values(&[action.operation(), mode])
            .inc();
    }
    Ok(())
}

/// Per-run options
#[derive(Clone, Copy, Debug, Default)]
pub struct ReconcileOptions {
    pub on_duplicate: DuplicatePolicy,
    pub dry_run: bool,
}

/// What a run did
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// True iff at least one action was dispatched, or would have been under dry-run
    pub changed: bool,
    pub operations: Vec<&'static str>,
}

/// Fetch the current user list and converge it towards `spec`
#[instrument(skip(client, spec), fields(user = %spec.name, state = ?spec.state, dry_run = options.dry_run))]
pub async fn reconcile(
    client: &dyn UserAdmin,
    spec: &UserSpec,
    options: ReconcileOptions,
) -> Result<ReconcileOutcome> {
    let started = Instant::now();
    let result = run(client, spec, options).await;

    metrics::RECONCILE_DURATION.observe(started.elapsed().as_secs_f64());
    let outcome_label = match &result {
        Ok(outcome) if outcome.changed => "changed",
        Ok(_) => "unchanged",
        Err(_) => "failed",
    };
    metrics::RECONCILIATIONS
        .with_label_values(&[outcome_label])
        .inc();
    metrics::LAST_RUN_TIMESTAMP.set(chrono::Utc::now().timestamp() as f64);

    result
}

async fn run(
    client: &dyn UserAdmin,
    spec: &UserSpec,
    options: ReconcileOptions,
) -> Result<ReconcileOutcome> {
    spec.validate()?;

    let users = client.list_users().await?;
    let observed = lookup_user(users, &spec.name).resolve(&spec.name, options.on_duplicate)?;

    info!(
        exists = observed.is_some(),
        admin = observed.as_ref().map(|u| u.admin),
        "Observed user state"
    );

    let actions = plan(spec, observed.as_ref());
    apply(client, &actions, options.dry_run).await?;

    let outcome = ReconcileOutcome {
        changed: !actions.is_empty(),
        operations: actions.iter().map(UserAction::operation).collect(),
    };
    info!(changed = outcome.changed, operations = ?outcome.operations, "Reconciled user");
    Ok(outcome)
}
