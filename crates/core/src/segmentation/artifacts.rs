//! Loading of externally trained segmentation artifacts.
//!
//! Each population profile ships as one JSON file holding both its scaler and
//! its cluster model, so the two can only ever be loaded together.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::clusters::{KMeansModel, ModelPair, ModelSet, StandardScaler};
use super::{Bounds, ThresholdConfig};
use crate::config::{ConfigError, SegmentationConfig};

#[derive(Debug, Deserialize)]
struct ProfileArtifact {
    scaler: StandardScaler,
    model: KMeansModel,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadArtifact { path: path.to_path_buf(), source })?;
    serde_json::from_str(&raw)
        .map_err(|source| ConfigError::ParseArtifact { path: path.to_path_buf(), source })
}

fn invalid(path: &Path, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidArtifact { path: path.to_path_buf(), reason: reason.into() }
}

fn check_bounds(path: &Path, name: &str, bounds: &Bounds) -> Result<(), ConfigError> {
    if !bounds.lower.is_finite() || !bounds.upper.is_finite() {
        return Err(invalid(path, format!("{name} bounds must be finite")));
    }
    if bounds.lower > bounds.upper {
        return Err(invalid(path, format!("{name}.lower must not exceed {name}.upper")));
    }
    Ok(())
}

pub fn load_thresholds(path: &Path) -> Result<ThresholdConfig, ConfigError> {
    let thresholds: ThresholdConfig = read_json(path)?;
    check_bounds(path, "frequency", &thresholds.frequency)?;
    check_bounds(path, "sales", &thresholds.sales)?;
    Ok(thresholds)
}

pub fn load_model_pair(path: &Path) -> Result<ModelPair, ConfigError> {
    let artifact: ProfileArtifact = read_json(path)?;

    let mut scaler_values = artifact.scaler.mean.iter().chain(artifact.scaler.scale.iter());
    if scaler_values.any(|value| !value.is_finite()) {
        return Err(invalid(path, "scaler parameters must be finite"));
    }
    if artifact.model.centroids.is_empty() {
        return Err(invalid(path, "cluster model has no centroids"));
    }
    if artifact.model.centroids.iter().flatten().any(|value| !value.is_finite()) {
        return Err(invalid(path, "cluster centroids must be finite"));
    }

    Ok(ModelPair::new(artifact.scaler, artifact.model))
}

pub fn load_model_set(config: &SegmentationConfig) -> Result<ModelSet, ConfigError> {
    Ok(ModelSet {
        normal: load_model_pair(&config.normal_profile_path)?,
        outlier: load_model_pair(&config.outlier_profile_path)?,
    })
}
