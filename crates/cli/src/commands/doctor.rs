use fitlens_core::config::{AppConfig, LoadOptions};
use fitlens_core::recommend::CatalogIndex;
use fitlens_core::segmentation::artifacts::{load_model_set, load_thresholds};
use fitlens_db::repositories::{ProductCatalogRepository, SqlProductCatalogRepository};
use fitlens_db::{connect_with_config, migrations, ping};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    fn passed(&self) -> bool {
        self.overall_status == CheckStatus::Pass
    }
}

/// Returns the rendered report and whether every check passed.
pub fn run(json_output: bool) -> (String, bool) {
    let report = build_report();
    let passed = report.passed();

    if json_output {
        let rendered = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return (rendered, passed);
    }

    (render_human(&report), passed)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_model_artifacts(&config));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["model_artifacts", "database_connectivity", "product_catalog"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_model_artifacts(config: &AppConfig) -> DoctorCheck {
    let loaded = load_thresholds(&config.segmentation.thresholds_path)
        .and_then(|_| load_model_set(&config.segmentation));

    match loaded {
        Ok(models) => DoctorCheck {
            name: "model_artifacts",
            status: CheckStatus::Pass,
            details: format!(
                "thresholds loaded; normal profile has {} clusters, outlier profile has {}",
                models.normal.cluster_count(),
                models.outlier.cluster_count()
            ),
        },
        Err(error) => DoctorCheck {
            name: "model_artifacts",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                },
                DoctorCheck {
                    name: "product_catalog",
                    status: CheckStatus::Skipped,
                    details: "skipped because the async runtime did not start".to_string(),
                },
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck {
                        name: "database_connectivity",
                        status: CheckStatus::Fail,
                        details: format!("failed to connect to database: {error}"),
                    },
                    DoctorCheck {
                        name: "product_catalog",
                        status: CheckStatus::Skipped,
                        details: "skipped because the database is unreachable".to_string(),
                    },
                ];
            }
        };

        let connectivity = match ping(&pool).await {
            Ok(()) => DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Pass,
                details: format!("connected using `{}`", config.database.url),
            },
            Err(error) => DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: format!("database query failed: {error}"),
            },
        };

        let catalog = check_product_catalog(&pool).await;
        pool.close().await;
        vec![connectivity, catalog]
    })
}

async fn check_product_catalog(pool: &fitlens_db::DbPool) -> DoctorCheck {
    if let Err(error) = migrations::run_pending(pool).await {
        return DoctorCheck {
            name: "product_catalog",
            status: CheckStatus::Fail,
            details: format!("schema is not current: {error}"),
        };
    }

    let rows = match SqlProductCatalogRepository::new(pool.clone()).list_raw().await {
        Ok(rows) => rows,
        Err(error) => {
            return DoctorCheck {
                name: "product_catalog",
                status: CheckStatus::Fail,
                details: error.to_string(),
            };
        }
    };

    match CatalogIndex::build(&rows) {
        Ok(index) => {
            let cleaning = index.cleaning();
            DoctorCheck {
                name: "product_catalog",
                status: CheckStatus::Pass,
                details: format!(
                    "{} of {} catalog rows usable for similarity",
                    cleaning.kept_rows, cleaning.input_rows
                ),
            }
        }
        Err(error) => DoctorCheck {
            name: "product_catalog",
            status: CheckStatus::Fail,
            details: format!("similarity matrix cannot be built: {error}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
