//! Loading and saving model specs.
//!
//! A path is either a single `.mlmodel` file or an `.mlpackage` directory,
//! whose `Manifest.json` names the root model file under `Data/`.

use crate::spec::ModelSpec;
use anyhow::{Context, anyhow, bail};
use bytes::Bytes;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const MANIFEST: &str = "Manifest.json";
const PACKAGE_DATA_DIR: &str = "Data";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageManifest {
    root_model_identifier: String,

    #[serde(default)]
    item_info_entries: BTreeMap<String, ItemInfo>,
}

#[derive(Debug, Deserialize)]
struct ItemInfo {
    path: String,
}

pub fn load_spec(path: &Path) -> anyhow::Result<ModelSpec> {
    let model_path = resolve_model_path(path)?;
    let bytes = fs::read(&model_path)
        .with_context(|| format!("read model file {}", model_path.display()))?;
    let len = bytes.len();

    let spec = ModelSpec::decode(Bytes::from(bytes))
        .with_context(|| format!("decode model spec {}", model_path.display()))?;

    info!(
        path = %model_path.display(),
        bytes = len,
        specification_version = spec.specification_version()?,
        "loaded model spec"
    );
    Ok(spec)
}

pub fn save_spec(spec: &ModelSpec, path: &Path) -> anyhow::Result<()> {
    if is_package(path) {
        bail!(
            "saving into a model package is not supported: {}",
            path.display()
        );
    }
    let bytes = spec.encode_to_vec();
    fs::write(path, &bytes).with_context(|| format!("write model file {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "saved model spec");
    Ok(())
}

fn is_package(path: &Path) -> bool {
    path.is_dir()
        || path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("mlpackage"))
}

/// The file that actually holds the `Model` message.
pub fn resolve_model_path(path: &Path) -> anyhow::Result<PathBuf> {
    if !path.is_dir() {
        return Ok(path.to_path_buf());
    }

    let manifest_path = path.join(MANIFEST);
    let text = fs::read_to_string(&manifest_path)
        .with_context(|| format!("read package manifest {}", manifest_path.display()))?;
    let manifest: PackageManifest = serde_json::from_str(&text)
        .with_context(|| format!("parse package manifest {}", manifest_path.display()))?;

    let root = manifest
        .item_info_entries
        .get(&manifest.root_model_identifier)
        .ok_or_else(|| {
            anyhow!(
                "package manifest {} has no entry for root model {}",
                manifest_path.display(),
                manifest.root_model_identifier
            )
        })?;

    Ok(path.join(PACKAGE_DATA_DIR).join(&root.path))
}
