//! Deployment Registry
//!
//! Maps request hostnames to deployment descriptors. The backing YAML file is
//! a sequence of records:
//!
//! ```yaml
//! - domain: example.org
//!   root: /home/deploy/example
//!   subpath: compose
//! ```
//!
//! It is re-read for every request so operators can edit it without a restart.

use hoist_core::domain::deployment::DeploymentDescriptor;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Registry error type
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The document is not a sequence of mappings
    #[error("configuration must be an array of hash")]
    Shape,

    #[error("unknown domain {0}")]
    UnknownDomain(String),

    #[error("root missing for host {0}")]
    RootMissing(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Reads and parses the configuration document without checking its shape
pub fn read_document(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path).map_err(|source| RegistryError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_yaml::from_str(&contents).map_err(|source| RegistryError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// `true` for documents that carry nothing: null, "", [] or {}
pub fn is_blank(document: &Value) -> bool {
    match document {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Sequence(seq) => seq.is_empty(),
        Value::Mapping(map) => map.is_empty(),
        _ => false,
    }
}

/// Ordered collection of per-host records
#[derive(Debug, Clone)]
pub struct DeploymentRegistry {
    entries: Vec<Mapping>,
}

impl DeploymentRegistry {
    /// Loads the registry from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_value(read_document(path)?)
    }

    /// Builds the registry from an already parsed document
    pub fn from_value(document: Value) -> Result<Self> {
        let Value::Sequence(items) = document else {
            return Err(RegistryError::Shape);
        };

        let entries = items
            .into_iter()
            .map(|item| match item {
                Value::Mapping(map) => Ok(map),
                _ => Err(RegistryError::Shape),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Finds the descriptor for `hostname`
    ///
    /// First entry whose `domain` equals `hostname` exactly wins. A matching
    /// entry without a `root` is reported as [`RegistryError::RootMissing`].
    pub fn resolve(&self, hostname: &str) -> Result<DeploymentDescriptor> {
        let entry = self
            .entries
            .iter()
            .find(|entry| string_field(entry, "domain") == Some(hostname))
            .ok_or_else(|| RegistryError::UnknownDomain(hostname.to_string()))?;

        let root = string_field(entry, "root")
            .filter(|root| !root.is_empty())
            .ok_or_else(|| RegistryError::RootMissing(hostname.to_string()))?;

        Ok(DeploymentDescriptor {
            domain: hostname.to_string(),
            root: PathBuf::from(root),
            subpath: string_field(entry, "subpath").map(String::from),
        })
    }
}

fn string_field<'a>(entry: &'a Mapping, key: &str) -> Option<&'a str> {
    entry.get(key).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(yaml: &str) -> Result<DeploymentRegistry> {
        DeploymentRegistry::from_value(serde_yaml::from_str(yaml).unwrap())
    }

    #[test]
    fn test_resolve_exact_domain() {
        let registry = registry(
            r#"
- domain: example.com
  root: /home/deploy/com
- domain: example.org
  root: /home/deploy/org
  subpath: compose
"#,
        )
        .unwrap();

        let descriptor = registry.resolve("example.org").unwrap();
        assert_eq!(descriptor.domain, "example.org");
        assert_eq!(descriptor.root, PathBuf::from("/home/deploy/org"));
        assert_eq!(descriptor.subpath.as_deref(), Some("compose"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_first_match_wins() {
        let registry = registry(
            r#"
- domain: example.org
  root: /first
- domain: example.org
  root: /second
"#,
        )
        .unwrap();

        assert_eq!(
            registry.resolve("example.org").unwrap().root,
            PathBuf::from("/first")
        );
    }

    #[test]
    fn test_unknown_domain_is_case_sensitive() {
        let registry = registry("- domain: example.org\n  root: /srv\n").unwrap();

        let err = registry.resolve("Example.org").unwrap_err();
        assert!(matches!(err, RegistryError::UnknownDomain(ref host) if host == "Example.org"));
        assert_eq!(err.to_string(), "unknown domain Example.org");
    }

    #[test]
    fn test_root_missing() {
        let registry = registry("- domain: example.org\n  subpath: compose\n").unwrap();

        let err = registry.resolve("example.org").unwrap_err();
        assert_eq!(err.to_string(), "root missing for host example.org");
    }

    #[test]
    fn test_shape_must_be_sequence_of_mappings() {
        let single = registry("domain: example.org\nroot: /srv\n").unwrap_err();
        assert!(matches!(single, RegistryError::Shape));
        assert_eq!(single.to_string(), "configuration must be an array of hash");

        assert!(matches!(
            registry("- example.org\n- other.org\n"),
            Err(RegistryError::Shape)
        ));
        assert!(matches!(registry("just a string"), Err(RegistryError::Shape)));
    }

    #[test]
    fn test_is_blank() {
        for yaml in ["", "~", "[]", "{}", "''"] {
            assert!(is_blank(&serde_yaml::from_str(yaml).unwrap()), "{yaml:?}");
        }
        assert!(!is_blank(&serde_yaml::from_str("- a").unwrap()));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stages.yml");
        std::fs::write(&path, "- domain: example.org\n  root: /srv\n").unwrap();

        let registry = DeploymentRegistry::load(&path).unwrap();
        assert_eq!(registry.len(), 1);

        let missing = DeploymentRegistry::load(&dir.path().join("missing.yml"));
        assert!(matches!(missing, Err(RegistryError::Read { .. })));

        std::fs::write(&path, "- domain: [unclosed\n").unwrap();
        assert!(matches!(
            DeploymentRegistry::load(&path),
            Err(RegistryError::Parse { .. })
        ));
    }
}
