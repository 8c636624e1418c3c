use fitlens_core::config::ConfigOverrides;
use fitlens_db::repositories::{SegmentRepository, SqlSegmentRepository};

use crate::commands::{build_runtime, exit_code_for, load_config, open_database, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config(ConfigOverrides::default()) {
        Ok(config) => config,
        Err(failure) => return CommandResult::from_failure("segments", failure),
    };

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(failure) => return CommandResult::from_failure("segments", failure),
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let summary = SqlSegmentRepository::new(pool.clone())
            .summary()
            .await
            .map_err(|error| ("persistence", error.to_string(), exit_code_for("persistence")));
        pool.close().await;
        summary
    });

    let summary = match result {
        Ok(summary) => summary,
        Err(failure) => return CommandResult::from_failure("segments", failure),
    };

    let customers: u64 = summary.iter().map(|row| row.customer_count).sum();
    CommandResult::success_with_data(
        "segments",
        format!("{} clusters covering {customers} customers", summary.len()),
        serde_json::to_value(&summary).ok(),
    )
}

