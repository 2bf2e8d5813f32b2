//! Desired user state

use std::fmt;

use clap::ValueEnum;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Secret string that never prints its contents
#[derive(Clone, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the raw secret for transmission
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Desired presence of the managed user
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, JsonSchema, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UserState {
    #[default]
    Present,
    Absent,
}

/// Desired state of one InfluxDB user
#[derive(Clone, Debug)]
pub struct UserSpec {
    pub name: String,
    pub password: Password,
    pub state: UserState,
    pub admin: bool,
    pub reset_password: bool,
}

impl UserSpec {
    /// Desired spec for a present, non-admin user
    pub fn present(name: impl Into<String>, password: impl Into<Password>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            state: UserState::Present,
            admin: false,
            reset_password: false,
        }
    }

    /// Desired spec for a user that must not exist
    pub fn absent(name: impl Into<String>, password: impl Into<Password>) -> Self {
        Self {
            state: UserState::Absent,
            ..Self::present(name, password)
        }
    }

    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    pub fn with_reset_password(mut self, reset_password: bool) -> Self {
        self.reset_password = reset_password;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("user name must not be empty"));
        }
        Ok(())
    }
}

/// How to treat a user list containing the target name more than once
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, JsonSchema, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Abort the run with a consistency error
    #[default]
    Fail,
    /// Use the first record in server order
    First,
    /// Treat the user as absent
    Absent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_debug_is_redacted() {
        let spec = UserSpec::present("alice", "hunter2");
        let rendered = format!("{:?}", spec);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("Password(***)"));
    }

    #[test]
    fn empty_name_fails_validation() {
        let spec = UserSpec::present("  ", "p1");
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("user name"));
    }

    #[test]
    fn state_parses_lowercase() {
        let state: UserState = serde_yaml::from_str("absent").unwrap();
        assert_eq!(state, UserState::Absent);
    }
}
