//! Service Locator
//!
//! Finds the compose file that declares a given service. Only the files
//! directly inside the search directory are considered, in file-name order.
//! A file that cannot be read or parsed is skipped with a warning so one
//! broken declaration never blocks an unrelated deployment.

use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const DECLARATION_EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// Returns the first declaration file in `dir` that defines `service`
pub fn locate(dir: &Path, service: &str) -> Option<PathBuf> {
    let candidates = match declaration_files(dir) {
        Ok(files) => files,
        Err(e) => {
            warn!("Cannot list deployment files in {}: {}", dir.display(), e);
            return None;
        }
    };

    for file in candidates {
        match declares_service(&file, service) {
            Ok(true) => {
                debug!("Service '{}' declared in {}", service, file.display());
                return Some(file);
            }
            Ok(false) => {}
            Err(e) => warn!("Error while parsing deployment file {}: {}", file.display(), e),
        }
    }

    None
}

/// Lists `*.yml` / `*.yaml` regular files in `dir`, sorted by name
fn declaration_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_declaration = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| DECLARATION_EXTENSIONS.contains(&ext));

        if is_declaration && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Shape problems found while inspecting one declaration file
#[derive(Debug, thiserror::Error)]
enum DeclarationError {
    #[error(transparent)]
    Read(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] serde_yaml::Error),
    #[error("'services' is not a mapping")]
    ServicesNotMapping,
}

/// `true` when `services.<service>` is a non-empty mapping
fn declares_service(file: &Path, service: &str) -> Result<bool, DeclarationError> {
    let contents = std::fs::read_to_string(file)?;
    let document: Value = serde_yaml::from_str(&contents)?;

    let services = match document.get("services") {
        Some(Value::Mapping(services)) => services,
        Some(_) => return Err(DeclarationError::ServicesNotMapping),
        None => return Ok(false),
    };

    Ok(matches!(services.get(service), Some(Value::Mapping(entry)) if !entry.is_empty()))
}
