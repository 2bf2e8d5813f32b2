//! JSON result documents printed by the CLI

use serde_json::{json, Value};

use crate::error::{Error, ErrorKind};
use crate::reconcilers::ReconcileOutcome;

pub fn success(outcome: &ReconcileOutcome) -> Value {
    json!({ "changed": outcome.changed })
}

/// Kind of a failure; errors from outside the crate count as invocation errors
pub fn failure_kind(err: &anyhow::Error) -> ErrorKind {
    err.downcast_ref::<Error>()
        .map(Error::kind)
        .unwrap_or(ErrorKind::ConfigError)
}

/// Failure document; `changed` reflects actions that reached the server first
pub fn failure(err: &anyhow::Error) -> Value {
    let kind = failure_kind(err);
    let changed = err.downcast_ref::<Error>().is_some_and(Error::changed);
    json!({
        "failed": true,
        "changed": changed,
        "msg": format!("{:#}", err),
        "kind": kind,
        "attempted": kind.attempted(),
    })
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn success_document() {
        let outcome = ReconcileOutcome {
            changed: true,
            operations: vec!["create"],
        };
        assert_eq!(success(&outcome), json!({ "changed": true }));
    }

    #[test]
    fn partial_apply_is_reported_as_changed() {
        let err: anyhow::Error = Error::PartiallyApplied {
            applied: vec!["set_admin"],
            source: Box::new(Error::remote("set password", "rejected")),
        }
        .into();
        let doc = failure(&err);
        assert_eq!(doc["failed"], true);
        assert_eq!(doc["changed"], true);
        assert_eq!(doc["kind"], "remote_operation_error");
    }

    #[test]
    fn plain_failure_is_unchanged() {
        let err: anyhow::Error = Error::connection("refused").into();
        let doc = failure(&err);
        assert_eq!(doc["changed"], false);
        assert_eq!(doc["kind"], "connection_error");
        assert_eq!(doc["attempted"], true);
    }

    #[test]
    fn context_keeps_kind() {
        let err = Err::<(), _>(Error::config("host is required"))
            .context("loading influx.yaml")
            .unwrap_err();
        let doc = failure(&err);
        assert_eq!(doc["kind"], "config_error");
        assert!(doc["msg"].as_str().unwrap().contains("host is required"));
    }
}
