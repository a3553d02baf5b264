//! Service settings for the hookway gateway.

use std::{collections::BTreeMap, env, fmt, net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use hookway_core::GatewayError;
use hookway_store::{StoreConfig, DEFAULT_API_SERVER};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "hookway.toml";

/// Opaque string settings that are taken from the environment as is.
///
/// figment would otherwise read `12345` as an integer, `true` as a bool, and
/// `{...}` as a dict.
const VERBATIM_VARS: &[&str] =
    &["WORKSPACE", "CONFIG", "CONFIG_PATH", "STORE_API_KEY", "AWS_SESSION_TOKEN"];

/// Where the path configuration document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Document given verbatim.
    Inline(String),
    /// Name of a parameter in the remote parameter store.
    Parameter(String),
}

/// Service settings with defaults, file, and environment overrides.
///
/// Settings are loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Settings file (`hookway.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// `WORKSPACE`, `STORE_API_KEY` and one of `CONFIG` / `CONFIG_PATH` have no
/// usable default and must be provided.
///
/// # Example
///
/// ```no_run
/// use hookway_api::Settings;
///
/// let settings = Settings::load().expect("Failed to load settings");
///
/// println!("Gateway will bind to {}:{}", settings.host, settings.port);
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct Settings {
    // Routing
    /// Workspace used by paths that name none.
    ///
    /// Environment variable: `WORKSPACE`
    #[serde(default, alias = "WORKSPACE")]
    pub workspace: String,
    /// Inline path configuration document.
    ///
    /// Environment variable: `CONFIG` (read verbatim)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    /// Parameter name of the path configuration document.
    ///
    /// Environment variable: `CONFIG_PATH`
    #[serde(default, alias = "CONFIG_PATH", skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,

    // Server
    /// Server bind address.
    ///
    /// Environment variable: `HOST`
    #[serde(default = "default_host", alias = "HOST")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `PORT`
    #[serde(default = "default_port", alias = "PORT")]
    pub port: u16,
    /// HTTP request timeout in seconds.
    ///
    /// Environment variable: `REQUEST_TIMEOUT`
    #[serde(default = "default_request_timeout", alias = "REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    // Document store
    /// Base URL of the document store API.
    ///
    /// Environment variable: `STORE_API_SERVER`
    #[serde(default = "default_store_api_server", alias = "STORE_API_SERVER")]
    pub store_api_server: String,
    /// Document store API key.
    ///
    /// Environment variable: `STORE_API_KEY`
    #[serde(default, alias = "STORE_API_KEY")]
    pub store_api_key: String,
    /// Timeout for one document store call in seconds.
    ///
    /// Environment variable: `STORE_TIMEOUT`
    #[serde(default = "default_store_timeout", alias = "STORE_TIMEOUT")]
    pub store_timeout: u64,

    // Parameter store
    /// Endpoint of the local parameter store extension.
    ///
    /// Environment variable: `PARAMETERS_ENDPOINT`
    #[serde(default = "default_parameters_endpoint", alias = "PARAMETERS_ENDPOINT")]
    pub parameters_endpoint: String,
    /// Token presented to the parameter store extension.
    ///
    /// Environment variable: `AWS_SESSION_TOKEN`
    #[serde(default, alias = "AWS_SESSION_TOKEN", skip_serializing_if = "Option::is_none")]
    pub aws_session_token: Option<String>,

    // Logging
    /// Log filter.
    ///
    /// Environment variable: `RUST_LOG`
    #[serde(default = "default_log_level", alias = "RUST_LOG")]
    pub rust_log: String,
}

impl Settings {
    /// Load settings from defaults, settings file, and environment variable
    /// overrides, then validate them.
    ///
    /// Identifiers, credentials and `CONFIG` bypass figment's value parsing,
    /// so a numeric key or a JSON document is kept byte for byte.
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed("").ignore(VERBATIM_VARS))
            .merge(Serialized::defaults(verbatim_env()));

        let settings: Self = figment.extract().context("Failed to load settings")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Where to read the path configuration document from.
    ///
    /// An inline document wins over a parameter name. Empty values count as
    /// absent.
    pub fn config_source(&self) -> Result<ConfigSource, GatewayError> {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

        non_empty(&self.config)
            .map(ConfigSource::Inline)
            .or_else(|| non_empty(&self.config_path).map(ConfigSource::Parameter))
            .ok_or_else(|| GatewayError::config("either CONFIG or CONFIG_PATH must be set"))
    }

    /// Parse server socket address from host and port settings.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Timeout applied to every inbound request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Convert to the document store client configuration.
    pub fn to_store_config(&self) -> StoreConfig {
        StoreConfig {
            api_server: self.store_api_server.clone(),
            api_key: self.store_api_key.clone(),
            timeout: Duration::from_secs(self.store_timeout),
            ..StoreConfig::default()
        }
    }

    /// Validate settings values.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.workspace.trim().is_empty() {
            return Err(GatewayError::config("WORKSPACE must be set"));
        }

        self.config_source()?;

        if self.store_api_key.is_empty() {
            return Err(GatewayError::config("STORE_API_KEY must be set"));
        }

        if self.port == 0 {
            return Err(GatewayError::config("port must be greater than 0"));
        }

        if self.request_timeout == 0 || self.store_timeout == 0 {
            return Err(GatewayError::config("timeouts must be greater than 0"));
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workspace: String::new(),
            config: None,
            config_path: None,
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            store_api_server: default_store_api_server(),
            store_api_key: String::new(),
            store_timeout: default_store_timeout(),
            parameters_endpoint: default_parameters_endpoint(),
            aws_session_token: None,
            rust_log: default_log_level(),
        }
    }
}

/// Raw values of the [`VERBATIM_VARS`] that are set, keyed by field name.
fn verbatim_env() -> BTreeMap<String, String> {
    VERBATIM_VARS
        .iter()
        .filter_map(|var| env::var(var).ok().map(|value| (var.to_ascii_lowercase(), value)))
        .collect()
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("workspace", &self.workspace)
            .field("config", &self.config.as_ref().map(|c| format!("<{} bytes>", c.len())))
            .field("config_path", &self.config_path)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("request_timeout", &self.request_timeout)
            .field("store_api_server", &self.store_api_server)
            .field("store_api_key", &"***")
            .field("store_timeout", &self.store_timeout)
            .field("parameters_endpoint", &self.parameters_endpoint)
            .field("aws_session_token", &self.aws_session_token.as_ref().map(|_| "***"))
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_store_api_server() -> String {
    DEFAULT_API_SERVER.to_string()
}

fn default_store_timeout() -> u64 {
    30
}

fn default_parameters_endpoint() -> String {
    "http://localhost:2773".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use hookway_core::FailureKind;

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "WORKSPACE",
        "CONFIG",
        "CONFIG_PATH",
        "HOST",
        "PORT",
        "REQUEST_TIMEOUT",
        "STORE_API_SERVER",
        "STORE_API_KEY",
        "STORE_TIMEOUT",
        "PARAMETERS_ENDPOINT",
        "AWS_SESSION_TOKEN",
    ];

    struct TestEnvGuard {
        _lock: std::sync::MutexGuard<'static, ()>,
        originals: HashMap<String, Option<String>>,
    }

    impl TestEnvGuard {
        /// Takes the lock and clears every settings variable.
        fn new() -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let mut originals = HashMap::new();
            for var in VARS {
                originals.insert((*var).to_string(), env::var(var).ok());
                env::remove_var(var);
            }
            Self { _lock: lock, originals }
        }

        fn set_var(&mut self, key: &str, value: &str) {
            self.originals.entry(key.to_string()).or_insert_with(|| env::var(key).ok());
            env::set_var(key, value);
        }
    }

    impl Drop for TestEnvGuard {
        fn drop(&mut self) {
            for (var, original) in &self.originals {
                match original {
                    Some(value) => env::set_var(var, value),
                    None => env::remove_var(var),
                }
            }
        }
    }

    fn valid_settings() -> Settings {
        Settings {
            workspace: "commons".into(),
            config: Some("{}".into()),
            store_api_key: "key".into(),
            ..Settings::default()
        }
    }

    #[test]
    fn defaults_need_required_values() {
        let error = Settings::default().validate().unwrap_err();
        assert_eq!(error.kind(), FailureKind::ConfigInvalid);
        assert!(valid_settings().validate().is_ok());
    }

    #[test]
    fn loads_from_environment() {
        let mut guard = TestEnvGuard::new();
        guard.set_var("WORKSPACE", "commons");
        guard.set_var("CONFIG_PATH", "/hookway/config");
        guard.set_var("STORE_API_KEY", "secret-key");
        guard.set_var("PORT", "9090");
        guard.set_var("STORE_TIMEOUT", "5");

        let settings = Settings::load().expect("Settings should load from env");

        assert_eq!(settings.workspace, "commons");
        assert_eq!(settings.port, 9090);
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.store_api_server, DEFAULT_API_SERVER);
        assert_eq!(settings.to_store_config().timeout, Duration::from_secs(5));
        assert_eq!(
            settings.config_source().unwrap(),
            ConfigSource::Parameter("/hookway/config".into())
        );
    }

    #[test]
    fn inline_config_is_read_verbatim() {
        let document = r#"{"/path": {"collection": "c", "auth": {"type": "noop"}}}"#;

        let mut guard = TestEnvGuard::new();
        guard.set_var("WORKSPACE", "commons");
        guard.set_var("CONFIG", document);
        guard.set_var("STORE_API_KEY", "secret-key");

        let settings = Settings::load().expect("Settings should load inline config");

        assert_eq!(settings.config_source().unwrap(), ConfigSource::Inline(document.into()));
    }

    #[test]
    fn numeric_looking_values_load_as_strings() {
        let mut guard = TestEnvGuard::new();
        guard.set_var("WORKSPACE", "12345");
        guard.set_var("CONFIG", "{}");
        guard.set_var("STORE_API_KEY", "0987654321");
        guard.set_var("AWS_SESSION_TOKEN", "true");

        let settings = Settings::load().expect("Settings should keep opaque values as strings");

        assert_eq!(settings.workspace, "12345");
        assert_eq!(settings.store_api_key, "0987654321");
        assert_eq!(settings.aws_session_token.as_deref(), Some("true"));
        assert_eq!(settings.config_source().unwrap(), ConfigSource::Inline("{}".into()));
    }

    #[test]
    fn numeric_parameter_name_is_kept() {
        let mut guard = TestEnvGuard::new();
        guard.set_var("WORKSPACE", "commons");
        guard.set_var("CONFIG_PATH", "42");
        guard.set_var("STORE_API_KEY", "secret-key");

        let settings = Settings::load().expect("Settings should load a numeric parameter name");

        assert_eq!(settings.config_source().unwrap(), ConfigSource::Parameter("42".into()));
    }

    #[test]
    fn missing_workspace_fails_to_load() {
        let mut guard = TestEnvGuard::new();
        guard.set_var("CONFIG", "{}");
        guard.set_var("STORE_API_KEY", "secret-key");

        let error = Settings::load().unwrap_err();
        assert!(error.to_string().contains("WORKSPACE"));
    }

    #[test]
    fn inline_config_wins_over_parameter() {
        let settings = Settings {
            config: Some("{}".into()),
            config_path: Some("/hookway/config".into()),
            ..valid_settings()
        };

        assert_eq!(settings.config_source().unwrap(), ConfigSource::Inline("{}".into()));
    }

    #[test]
    fn empty_sources_count_as_absent() {
        let settings = Settings {
            config: Some(String::new()),
            config_path: Some("/hookway/config".into()),
            ..valid_settings()
        };
        assert_eq!(
            settings.config_source().unwrap(),
            ConfigSource::Parameter("/hookway/config".into())
        );

        let settings = Settings { config: Some(String::new()), config_path: None, ..valid_settings() };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn invalid_values_fail_validation() {
        let settings = Settings { port: 0, ..valid_settings() };
        assert!(settings.validate().is_err());

        let settings = Settings { store_api_key: String::new(), ..valid_settings() };
        assert!(settings.validate().is_err());

        let settings = Settings { workspace: "  ".into(), ..valid_settings() };
        assert!(settings.validate().is_err());

        let settings = Settings { store_timeout: 0, ..valid_settings() };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn debug_masks_credentials() {
        let settings = Settings {
            store_api_key: "super-secret".into(),
            aws_session_token: Some("session-token".into()),
            ..valid_settings()
        };

        let debug = format!("{settings:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("session-token"));
    }

    #[test]
    fn socket_address_parsing() {
        let settings = Settings { host: "0.0.0.0".into(), port: 9000, ..valid_settings() };

        let addr = settings.parse_server_addr().expect("Should parse socket address");

        assert_eq!(addr.ip().to_string(), "0.0.0.0");
        assert_eq!(addr.port(), 9000);
    }
}
