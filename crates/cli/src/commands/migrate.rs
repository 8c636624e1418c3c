use crate::commands::{build_runtime, load_config, open_database, CommandFailure, CommandResult};
use fitlens_core::config::ConfigOverrides;

pub fn run() -> CommandResult {
    let config = match load_config(ConfigOverrides::default()) {
        Ok(config) => config,
        Err(failure) => return CommandResult::from_failure("migrate", failure),
    };

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(failure) => return CommandResult::from_failure("migrate", failure),
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        pool.close().await;
        Ok::<(), CommandFailure>(())
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(failure) => CommandResult::from_failure("migrate", failure),
    }
}
