use fitlens_core::config::ConfigOverrides;
use fitlens_core::errors::ApplicationError;
use fitlens_core::recommend::CatalogIndex;
use fitlens_db::repositories::{ProductCatalogRepository, SqlProductCatalogRepository};
use serde_json::json;

use crate::commands::{build_runtime, exit_code_for, load_config, open_database, CommandResult};

fn application_failure(error: ApplicationError) -> (&'static str, String, u8) {
    let error_class = error.error_class();
    (error_class, error.to_string(), exit_code_for(error_class))
}

pub fn run(sku: &str, limit: Option<usize>) -> CommandResult {
    let config = match load_config(ConfigOverrides::default()) {
        Ok(config) => config,
        Err(failure) => return CommandResult::from_failure("recommend", failure),
    };
    let limit = limit
        .unwrap_or(config.recommendation.default_limit)
        .min(config.recommendation.max_limit);

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(failure) => return CommandResult::from_failure("recommend", failure),
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let rows = SqlProductCatalogRepository::new(pool.clone()).list_raw().await;
        pool.close().await;

        let rows = rows.map_err(|error| application_failure(error.into()))?;
        let index = CatalogIndex::build(&rows).map_err(|error| application_failure(error.into()))?;
        index.recommend(sku, limit).map_err(|error| application_failure(error.into()))
    });

    match result {
        Ok(recommendations) => CommandResult::success_with_data(
            "recommend",
            format!("{} recommendations for `{sku}`", recommendations.len()),
            Some(json!({ "source_sku": sku, "recommendations": recommendations })),
        ),
        Err(failure) => CommandResult::from_failure("recommend", failure),
    }
}
