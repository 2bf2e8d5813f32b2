//! Top-level reconciler configuration and layering
//!
//! Settings arrive in layers (YAML file, env vars, flags). Each layer is an
//! all-optional [`Overrides`]; layers are merged first and required fields
//! are checked once on the merged result.

use std::path::Path;

use schemars::JsonSchema;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{
    ConnectionSpec, DuplicatePolicy, Password, UserSpec, UserState, DEFAULT_CONNECT_PASSWORD,
    DEFAULT_CONNECT_USER, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS,
};

/// Complete configuration for one reconciliation run
#[derive(Clone, Debug)]
pub struct ReconcileConfig {
    pub connection: ConnectionSpec,
    pub user: UserSpec,
    pub on_duplicate: DuplicatePolicy,
}

impl ReconcileConfig {
    pub fn new(connection: ConnectionSpec, user: UserSpec) -> Self {
        Self {
            connection,
            user,
            on_duplicate: DuplicatePolicy::default(),
        }
    }

    /// Load a YAML file that holds every required setting itself
    pub fn from_file(path: &Path) -> Result<Self> {
        Overrides::from_file(path)?.into_config()
    }

    pub fn validate(&self) -> Result<()> {
        self.connection.validate()?;
        self.user.validate()?;
        Ok(())
    }
}

/// Layout of the YAML configuration file
#[derive(Clone, Debug, Default, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub connection: ConnectionSection,

    pub user: UserSection,

    /// Handling of duplicate usernames in the server's user list [default: fail]
    pub on_duplicate: Option<DuplicatePolicy>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionSection {
    /// Server address, without scheme or port
    pub host: Option<String>,

    /// Server port [default: 8086]
    pub port: Option<u16>,

    /// User to connect as, distinct from the managed user [default: root]
    pub connect_user: Option<String>,

    /// Password of the connecting user [default: root]
    pub connect_password: Option<Password>,

    /// Transport timeout in seconds [default: 10]
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct UserSection {
    /// Username to manage
    pub name: Option<String>,

    /// Password used on create and when a reset is requested
    pub password: Option<Password>,

    /// Desired presence [default: present]
    pub state: Option<UserState>,

    /// Desired admin privilege [default: false]
    pub admin: Option<bool>,

    /// Set the password even when the user already exists [default: false]
    pub reset_password: Option<bool>,
}

impl From<ConfigFile> for Overrides {
    fn from(file: ConfigFile) -> Self {
        let ConfigFile {
            connection,
            user,
            on_duplicate,
        } = file;
        Overrides {
            host: connection.host,
            port: connection.port,
            connect_user: connection.connect_user,
            connect_password: connection.connect_password,
            timeout_secs: connection.timeout_secs,
            user: user.name,
            password: user.password,
            state: user.state,
            admin: user.admin,
            reset_password: user.reset_password,
            on_duplicate,
        }
    }
}

/// One layer of individually supplied settings
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub connect_user: Option<String>,
    pub connect_password: Option<Password>,
    pub timeout_secs: Option<u64>,
    pub user: Option<String>,
    pub password: Option<Password>,
    pub state: Option<UserState>,
    pub admin: Option<bool>,
    pub reset_password: Option<bool>,
    pub on_duplicate: Option<DuplicatePolicy>,
}

impl Overrides {
    /// Read a YAML configuration file as a layer; missing settings stay unset
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let file: ConfigFile = serde_yaml::from_str(&raw)?;
        Ok(file.into())
    }

    /// Merge with a lower-precedence layer; values set here win
    pub fn or(self, lower: Overrides) -> Overrides {
        Overrides {
            host: self.host.or(lower.host),
            port: self.port.or(lower.port),
            connect_user: self.connect_user.or(lower.connect_user),
            connect_password: self.connect_password.or(lower.connect_password),
            timeout_secs: self.timeout_secs.or(lower.timeout_secs),
            user: self.user.or(lower.user),
            password: self.password.or(lower.password),
            state: self.state.or(lower.state),
            admin: self.admin.or(lower.admin),
            reset_password: self.reset_password.or(lower.reset_password),
            on_duplicate: self.on_duplicate.or(lower.on_duplicate),
        }
    }

    /// Resolve defaults, check required settings and validate
    pub fn into_config(self) -> Result<ReconcileConfig> {
        let host = self.host.ok_or_else(|| Error::config("host is required"))?;
        let name = self.user.ok_or_else(|| Error::config("user is required"))?;
        let password = self
            .password
            .ok_or_else(|| Error::config("password is required"))?;

        let connection = ConnectionSpec {
            host,
            port: self.port.unwrap_or(DEFAULT_PORT),
            connect_user: self
                .connect_user
                .unwrap_or_else(|| DEFAULT_CONNECT_USER.to_string()),
            connect_password: self
                .connect_password
                .unwrap_or_else(|| Password::new(DEFAULT_CONNECT_PASSWORD)),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        let user = UserSpec {
            name,
            password,
            state: self.state.unwrap_or_default(),
            admin: self.admin.unwrap_or(false),
            reset_password: self.reset_password.unwrap_or(false),
        };

        let config = ReconcileConfig {
            connection,
            user,
            on_duplicate: self.on_duplicate.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const FULL_YAML: &str = r#"
connection:
  host: db1
  port: 8087
user:
  name: alice
  password: p1
  admin: true
on_duplicate: first
"#;

    fn yaml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_yaml_file() {
        let file = yaml_file(FULL_YAML);

        let config = ReconcileConfig::from_file(file.path()).unwrap();
        assert_eq!(config.connection.host, "db1");
        assert_eq!(config.connection.port, 8087);
        assert_eq!(config.connection.connect_user, "root");
        assert_eq!(config.user.name, "alice");
        assert_eq!(config.user.state, UserState::Present);
        assert!(config.user.admin);
        assert!(!config.user.reset_password);
        assert_eq!(config.on_duplicate, DuplicatePolicy::First);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ReconcileConfig::from_file(Path::new("/nonexistent/influx.yaml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let file = yaml_file("connection:\n  hostname: db1\n");
        let err = Overrides::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }

    #[test]
    fn password_from_flags_completes_file_without_password() {
        let file = yaml_file("connection:\n  host: db1\nuser:\n  name: alice\n");
        let from_file = Overrides::from_file(file.path()).unwrap();

        let flags = Overrides {
            password: Some("from-env".into()),
            ..Default::default()
        };
        let config = flags.or(from_file).into_config().unwrap();
        assert_eq!(config.connection.host, "db1");
        assert_eq!(config.user.name, "alice");
        assert_eq!(config.user.password.expose(), "from-env");
    }

    #[test]
    fn file_without_password_alone_is_incomplete() {
        let file = yaml_file("connection:\n  host: db1\nuser:\n  name: alice\n");
        let err = ReconcileConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn overrides_require_host_user_and_password() {
        let err = Overrides {
            user: Some("alice".into()),
            password: Some("p1".into()),
            ..Default::default()
        }
        .into_config()
        .unwrap_err();
        assert!(err.to_string().contains("host"));

        let err = Overrides {
            host: Some("db1".into()),
            user: Some("alice".into()),
            ..Default::default()
        }
        .into_config()
        .unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn overrides_take_precedence_over_file() {
        let file = yaml_file(FULL_YAML);
        let config = Overrides {
            port: Some(9999),
            admin: Some(false),
            state: Some(UserState::Absent),
            ..Default::default()
        }
        .or(Overrides::from_file(file.path()).unwrap())
        .into_config()
        .unwrap();

        assert_eq!(config.connection.host, "db1");
        assert_eq!(config.connection.port, 9999);
        assert!(!config.user.admin);
        assert_eq!(config.user.state, UserState::Absent);
        assert_eq!(config.on_duplicate, DuplicatePolicy::First);
    }

    #[test]
    fn merged_config_is_validated() {
        let file = yaml_file(FULL_YAML);
        let err = Overrides {
            host: Some("db1:8086".into()),
            ..Default::default()
        }
        .or(Overrides::from_file(file.path()).unwrap())
        .into_config()
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
