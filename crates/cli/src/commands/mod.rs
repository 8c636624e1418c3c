pub mod doctor;
pub mod migrate;
pub mod recommend;
pub mod segment;
pub mod segments;

use fitlens_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use fitlens_db::{connect_with_config, migrations, DbPool};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

/// Error class, message and process exit code of a failed step.
pub(crate) type CommandFailure = (&'static str, String, u8);

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::failure_with_data(command, error_class, message, exit_code, None)
    }

    pub fn failure_with_data(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub(crate) fn from_failure(
        command: &str,
        (error_class, message, exit_code): CommandFailure,
    ) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }
}

/// Exit code for an application error class; stable across commands.
pub fn exit_code_for(error_class: &str) -> u8 {
    match error_class {
        "configuration" | "config_validation" => 2,
        "runtime_init" => 3,
        "db_connectivity" | "persistence" => 4,
        "migration" => 5,
        "data" => 6,
        "not_found" => 7,
        "service_unavailable" => 8,
        "conflict" => 9,
        _ => 10,
    }
}

pub(crate) fn load_config(overrides: ConfigOverrides) -> Result<AppConfig, CommandFailure> {
    AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() }).map_err(|error| {
        (
            "config_validation",
            format!("configuration issue: {error}"),
            exit_code_for("config_validation"),
        )
    })
}

pub(crate) fn build_runtime() -> Result<tokio::runtime::Runtime, CommandFailure> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        (
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            exit_code_for("runtime_init"),
        )
    })
}

/// Connects and applies pending migrations so every command sees the current schema.
pub(crate) async fn open_database(config: &AppConfig) -> Result<DbPool, CommandFailure> {
    let pool = connect_with_config(&config.database).await.map_err(|error| {
        ("db_connectivity", error.to_string(), exit_code_for("db_connectivity"))
    })?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), exit_code_for("migration")))?;
    Ok(pool)
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
