use fitlens_core::config::ConfigOverrides;
use fitlens_db::repositories::{SqlOrderRepository, SqlSegmentRepository};
use fitlens_db::SegmentationJob;

use crate::commands::{
    build_runtime, exit_code_for, load_config, open_database, CommandFailure, CommandResult,
};

pub fn run(qualifying_status: Option<String>) -> CommandResult {
    let overrides = ConfigOverrides { qualifying_status, ..ConfigOverrides::default() };
    let config = match load_config(overrides) {
        Ok(config) => config,
        Err(failure) => return CommandResult::from_failure("segment", failure),
    };

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(failure) => return CommandResult::from_failure("segment", failure),
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let orders = SqlOrderRepository::new(pool.clone());
        let segments = SqlSegmentRepository::new(pool.clone());
        let outcome = SegmentationJob::new(&orders, &segments, &config.segmentation).run().await;
        pool.close().await;
        Ok::<_, CommandFailure>(outcome)
    });

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(failure) => return CommandResult::from_failure("segment", failure),
    };
    let data = serde_json::to_value(&outcome).ok();

    match outcome.error_class.as_deref() {
        None => CommandResult::success_with_data("segment", outcome.message.clone(), data),
        Some(error_class) => CommandResult::failure_with_data(
            "segment",
            error_class,
            outcome.message.clone(),
            exit_code_for(error_class),
            data,
        ),
    }
}
