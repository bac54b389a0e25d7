//! Deployment domain types

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A validated "redeploy this service with this image" request
///
/// Only exists for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    pub service: String,
    pub image: String,
}

/// Raw payload carried inside a deployment token
///
/// `service` and `image` are optional here so that a correctly signed token
/// missing one of them can be reported precisely instead of as a bad token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentClaims {
    #[serde(
        default,
        deserialize_with = "text_only",
        skip_serializing_if = "Option::is_none"
    )]
    pub service: Option<String>,
    #[serde(
        default,
        deserialize_with = "text_only",
        skip_serializing_if = "Option::is_none"
    )]
    pub image: Option<String>,
    /// Issued-at, seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiry, seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Keeps string values; numbers, maps and nulls read as absent
fn text_only<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Field {
        Text(String),
        Other(IgnoredAny),
    }

    Ok(match Field::deserialize(deserializer)? {
        Field::Text(text) => Some(text),
        Field::Other(_) => None,
    })
}

/// Field absent, empty or not a string in an otherwise valid token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Service,
    Image,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingField::Service => write!(f, "service"),
            MissingField::Image => write!(f, "image"),
        }
    }
}

impl DeploymentClaims {
    /// Converts the claims into a request, service checked first
    pub fn into_request(self) -> Result<DeploymentRequest, MissingField> {
        let service = non_empty(self.service).ok_or(MissingField::Service)?;
        let image = non_empty(self.image).ok_or(MissingField::Image)?;

        Ok(DeploymentRequest { service, image })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Per-host deployment location
///
/// Maps the hostname a request arrives on to the directory holding that
/// host's compose declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentDescriptor {
    pub domain: String,
    pub root: PathBuf,
    pub subpath: Option<String>,
}

impl DeploymentDescriptor {
    /// Directory scanned for service declarations
    ///
    /// `root/subpath`, or `root` itself when no subpath is configured.
    pub fn search_dir(&self) -> PathBuf {
        match self.subpath.as_deref() {
            Some(sub) if !sub.is_empty() => self.root.join(sub),
            _ => self.root.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(service: Option<&str>, image: Option<&str>) -> DeploymentClaims {
        DeploymentClaims {
            service: service.map(String::from),
            image: image.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_into_request_complete() {
        let req = claims(Some("web"), Some("jwilder/dockerize:latest"))
            .into_request()
            .unwrap();

        assert_eq!(req.service, "web");
        assert_eq!(req.image, "jwilder/dockerize:latest");
    }

    #[test]
    fn test_into_request_reports_service_first() {
        assert_eq!(
            claims(None, None).into_request(),
            Err(MissingField::Service)
        );
        assert_eq!(
            claims(Some("web"), None).into_request(),
            Err(MissingField::Image)
        );
    }

    #[test]
    fn test_empty_fields_count_as_missing() {
        assert_eq!(
            claims(Some(""), Some("a/b")).into_request(),
            Err(MissingField::Service)
        );
        assert_eq!(
            claims(Some("web"), Some("")).into_request(),
            Err(MissingField::Image)
        );
    }

    #[test]
    fn test_search_dir() {
        let mut descriptor = DeploymentDescriptor {
            domain: "example.org".to_string(),
            root: PathBuf::from("/home/deploy/example"),
            subpath: Some("compose".to_string()),
        };
        assert_eq!(
            descriptor.search_dir(),
            PathBuf::from("/home/deploy/example/compose")
        );

        descriptor.subpath = Some(String::new());
        assert_eq!(descriptor.search_dir(), PathBuf::from("/home/deploy/example"));

        descriptor.subpath = None;
        assert_eq!(descriptor.search_dir(), PathBuf::from("/home/deploy/example"));
    }
}
