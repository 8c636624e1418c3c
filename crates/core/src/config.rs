use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub segmentation: SegmentationConfig,
    pub recommendation: RecommendationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SegmentationConfig {
    /// Only orders in this status count towards RFM features.
    pub qualifying_status: String,
    pub thresholds_path: PathBuf,
    pub normal_profile_path: PathBuf,
    pub outlier_profile_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct RecommendationConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub qualifying_status: Option<String>,
    pub thresholds_path: Option<PathBuf>,
    pub normal_profile_path: Option<PathBuf>,
    pub outlier_profile_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
    #[error("could not read model artifact `{path}`: {source}")]
    ReadArtifact { path: PathBuf, source: std::io::Error },
    #[error("could not parse model artifact `{path}`: {source}")]
    ParseArtifact { path: PathBuf, source: serde_json::Error },
    #[error("invalid model artifact `{path}`: {reason}")]
    InvalidArtifact { path: PathBuf, reason: String },
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://fitlens.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
            },
            segmentation: SegmentationConfig {
                qualifying_status: "delivered".to_string(),
                thresholds_path: PathBuf::from("models/thresholds.json"),
                normal_profile_path: PathBuf::from("models/normal_profile.json"),
                outlier_profile_path: PathBuf::from("models/outlier_profile.json"),
            },
            recommendation: RecommendationConfig { default_limit: 5, max_limit: 50 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("fitlens.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(segmentation) = patch.segmentation {
            if let Some(status) = segmentation.qualifying_status {
                self.segmentation.qualifying_status = status;
            }
            if let Some(path) = segmentation.thresholds_path {
                self.segmentation.thresholds_path = path;
            }
            if let Some(path) = segmentation.normal_profile_path {
                self.segmentation.normal_profile_path = path;
            }
            if let Some(path) = segmentation.outlier_profile_path {
                self.segmentation.outlier_profile_path = path;
            }
        }

        if let Some(recommendation) = patch.recommendation {
            if let Some(default_limit) = recommendation.default_limit {
                self.recommendation.default_limit = default_limit;
            }
            if let Some(max_limit) = recommendation.max_limit {
                self.recommendation.max_limit = max_limit;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("FITLENS_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("FITLENS_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("FITLENS_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("FITLENS_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("FITLENS_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("FITLENS_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("FITLENS_SERVER_PORT") {
            self.server.port = parse_u16("FITLENS_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("FITLENS_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("FITLENS_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("FITLENS_SEGMENTATION_QUALIFYING_STATUS") {
            self.segmentation.qualifying_status = value;
        }
        if let Some(value) = read_env("FITLENS_SEGMENTATION_THRESHOLDS_PATH") {
            self.segmentation.thresholds_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("FITLENS_SEGMENTATION_NORMAL_PROFILE_PATH") {
            self.segmentation.normal_profile_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("FITLENS_SEGMENTATION_OUTLIER_PROFILE_PATH") {
            self.segmentation.outlier_profile_path = PathBuf::from(value);
        }

        if let Some(value) = read_env("FITLENS_RECOMMENDATION_DEFAULT_LIMIT") {
            self.recommendation.default_limit =
                parse_usize("FITLENS_RECOMMENDATION_DEFAULT_LIMIT", &value)?;
        }
        if let Some(value) = read_env("FITLENS_RECOMMENDATION_MAX_LIMIT") {
            self.recommendation.max_limit =
                parse_usize("FITLENS_RECOMMENDATION_MAX_LIMIT", &value)?;
        }

        let log_level =
            read_env("FITLENS_LOGGING_LEVEL").or_else(|| read_env("FITLENS_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("FITLENS_LOGGING_FORMAT").or_else(|| read_env("FITLENS_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(status) = overrides.qualifying_status {
            self.segmentation.qualifying_status = status;
        }
        if let Some(path) = overrides.thresholds_path {
            self.segmentation.thresholds_path = path;
        }
        if let Some(path) = overrides.normal_profile_path {
            self.segmentation.normal_profile_path = path;
        }
        if let Some(path) = overrides.outlier_profile_path {
            self.segmentation.outlier_profile_path = path;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_segmentation(&self.segmentation)?;
        validate_recommendation(&self.recommendation)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("fitlens.toml"), PathBuf::from("config/fitlens.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_segmentation(segmentation: &SegmentationConfig) -> Result<(), ConfigError> {
    if segmentation.qualifying_status.trim().is_empty() {
        return Err(ConfigError::Validation(
            "segmentation.qualifying_status must not be empty".to_string(),
        ));
    }

    let paths = [
        ("segmentation.thresholds_path", &segmentation.thresholds_path),
        ("segmentation.normal_profile_path", &segmentation.normal_profile_path),
        ("segmentation.outlier_profile_path", &segmentation.outlier_profile_path),
    ];
    for (key, path) in paths {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!("{key} must not be empty")));
        }
    }

    if segmentation.normal_profile_path == segmentation.outlier_profile_path {
        return Err(ConfigError::Validation(
            "segmentation.normal_profile_path and segmentation.outlier_profile_path must differ"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_recommendation(recommendation: &RecommendationConfig) -> Result<(), ConfigError> {
    if recommendation.default_limit == 0 || recommendation.max_limit == 0 {
        return Err(ConfigError::Validation(
            "recommendation limits must be greater than zero".to_string(),
        ));
    }

    if recommendation.default_limit > recommendation.max_limit {
        return Err(ConfigError::Validation(
            "recommendation.default_limit must not exceed recommendation.max_limit".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    segmentation: Option<SegmentationPatch>,
    recommendation: Option<RecommendationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SegmentationPatch {
    qualifying_status: Option<String>,
    thresholds_path: Option<PathBuf>,
    normal_profile_path: Option<PathBuf>,
    outlier_profile_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationPatch {
    default_limit: Option<usize>,
    max_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.segmentation.qualifying_status == "delivered", "default status")?;
        ensure(config.recommendation.default_limit == 5, "default limit should be 5")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "default format")?;
        Ok(())
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_FITLENS_MODEL_DIR", "/srv/models");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("fitlens.toml");
            fs::write(
                &path,
                r#"
[segmentation]
thresholds_path = "${TEST_FITLENS_MODEL_DIR}/thresholds.json"
normal_profile_path = "${TEST_FITLENS_MODEL_DIR}/normal.json"
outlier_profile_path = "${TEST_FITLENS_MODEL_DIR}/outlier.json"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.segmentation.thresholds_path == PathBuf::from("/srv/models/thresholds.json"),
                "thresholds path should be interpolated from environment",
            )?;
            ensure(
                config.segmentation.outlier_profile_path
                    == PathBuf::from("/srv/models/outlier.json"),
                "outlier profile path should be interpolated from environment",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_FITLENS_MODEL_DIR"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FITLENS_LOG_LEVEL", "warn");
        env::set_var("FITLENS_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["FITLENS_LOG_LEVEL", "FITLENS_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FITLENS_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("FITLENS_SEGMENTATION_QUALIFYING_STATUS", "shipped");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("fitlens.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[segmentation]
qualifying_status = "completed"

[recommendation]
default_limit = 8

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.segmentation.qualifying_status == "shipped",
                "env qualifying status should win over file and defaults",
            )?;
            ensure(config.recommendation.default_limit == 8, "file limit should apply")?;
            Ok(())
        })();

        clear_vars(&["FITLENS_DATABASE_URL", "FITLENS_SEGMENTATION_QUALIFYING_STATUS"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FITLENS_RECOMMENDATION_DEFAULT_LIMIT", "80");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("default_limit")
            );
            ensure(has_message, "validation failure should mention default_limit")
        })();

        clear_vars(&["FITLENS_RECOMMENDATION_DEFAULT_LIMIT"]);
        result
    }

    #[test]
    fn non_sqlite_database_url_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("mongodb://localhost:27017".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        ensure(
            matches!(
                result,
                Err(ConfigError::Validation(ref message)) if message.contains("database.url")
            ),
            "mongodb url should fail validation",
        )
    }

    #[test]
    fn invalid_numeric_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FITLENS_SERVER_PORT", "not-a-port");
        let result = AppConfig::load(LoadOptions::default());
        clear_vars(&["FITLENS_SERVER_PORT"]);

        ensure(
            matches!(
                result,
                Err(ConfigError::InvalidEnvOverride { ref key, .. })
                    if key == "FITLENS_SERVER_PORT"
            ),
            "invalid port should surface as env override error",
        )
    }
}
