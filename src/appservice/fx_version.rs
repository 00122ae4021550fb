//! `linuxFxVersion` encoding
//!
//! The API packs the runtime selection into one string, `{TAG}|{version}`,
//! e.g. `Node|18`, `DOTNET-ISOLATED|6.0` or
//! `DOCKER|myregistry.azurecr.io/app:latest`. A custom handler is sent as an
//! empty string and identified through `FUNCTIONS_WORKER_RUNTIME` instead.
//! The service is free to re-case the tag, so decoding ignores tag case.

use super::model::{ApplicationStack, DockerStack};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinuxFxVersion {
    Dotnet(String),
    DotnetIsolated(String),
    Node(String),
    Python(String),
    Java(String),
    PowerShell(String),
    /// Image reference without scheme: `registry/image:tag`
    Docker(String),
    /// No runtime string (custom handlers, or nothing configured)
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FxVersionError {
    #[error("linuxFxVersion {0:?} is not of the form TAG|VERSION")]
    MissingSeparator(String),
    #[error("linuxFxVersion {value:?} has unknown runtime tag {tag:?}")]
    UnknownTag { value: String, tag: String },
}

impl fmt::Display for LinuxFxVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinuxFxVersion::Dotnet(v) => write!(f, "DOTNET|{}", v),
            LinuxFxVersion::DotnetIsolated(v) => write!(f, "DOTNET-ISOLATED|{}", v),
            LinuxFxVersion::Node(v) => write!(f, "Node|{}", v),
            LinuxFxVersion::Python(v) => write!(f, "Python|{}", v),
            LinuxFxVersion::Java(v) => write!(f, "Java|{}", v),
            LinuxFxVersion::PowerShell(v) => write!(f, "PowerShell|{}", v),
            LinuxFxVersion::Docker(reference) => write!(f, "DOCKER|{}", reference),
            LinuxFxVersion::Empty => Ok(()),
        }
    }
}

impl FromStr for LinuxFxVersion {
    type Err = FxVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(LinuxFxVersion::Empty);
        }
        let Some((tag, version)) = s.split_once('|') else {
            return Err(FxVersionError::MissingSeparator(s.to_string()));
        };
        let version = version.to_string();
        match tag.to_ascii_lowercase().as_str() {
            "dotnet" => Ok(LinuxFxVersion::Dotnet(version)),
            "dotnet-isolated" => Ok(LinuxFxVersion::DotnetIsolated(version)),
            "node" => Ok(LinuxFxVersion::Node(version)),
            "python" => Ok(LinuxFxVersion::Python(version)),
            "java" => Ok(LinuxFxVersion::Java(version)),
            "powershell" => Ok(LinuxFxVersion::PowerShell(version)),
            "docker" => Ok(LinuxFxVersion::Docker(version)),
            _ => Err(FxVersionError::UnknownTag {
                value: s.to_string(),
                tag: tag.to_string(),
            }),
        }
    }
}

/// Registry host as it appears in an image reference
pub fn registry_host(registry_url: &str) -> &str {
    let url = registry_url
        .strip_prefix("https://")
        .or_else(|| registry_url.strip_prefix("http://"))
        .unwrap_or(registry_url);
    url.trim_end_matches('/')
}

impl From<Option<&ApplicationStack>> for LinuxFxVersion {
    fn from(stack: Option<&ApplicationStack>) -> Self {
        match stack {
            None | Some(ApplicationStack::CustomHandler) => LinuxFxVersion::Empty,
            Some(ApplicationStack::Dotnet { version, isolated: false }) => LinuxFxVersion::Dotnet(version.clone()),
            Some(ApplicationStack::Dotnet { version, isolated: true }) => {
                LinuxFxVersion::DotnetIsolated(version.clone())
            }
            Some(ApplicationStack::Node { version }) => LinuxFxVersion::Node(version.clone()),
            Some(ApplicationStack::Python { version }) => LinuxFxVersion::Python(version.clone()),
            Some(ApplicationStack::Java { version }) => LinuxFxVersion::Java(version.clone()),
            Some(ApplicationStack::PowershellCore { version }) => LinuxFxVersion::PowerShell(version.clone()),
            Some(ApplicationStack::Docker(docker)) => LinuxFxVersion::Docker(format!(
                "{}/{}:{}",
                registry_host(&docker.registry_url),
                docker.image_name,
                docker.image_tag
            )),
        }
    }
}

/// Encode the selected stack into the wire string
pub fn encode(stack: Option<&ApplicationStack>) -> String {
    LinuxFxVersion::from(stack).to_string()
}

impl LinuxFxVersion {
    /// Recover the application stack
    ///
    /// Docker stacks need the registry settings stored in app settings:
    /// `registry` carries `DOCKER_REGISTRY_SERVER_URL` and the credentials.
    /// Without a registry URL a Docker string cannot be split back into its
    /// parts and yields `None`.
    pub fn into_stack(self, registry: Option<&DockerStack>) -> Option<ApplicationStack> {
        match self {
            LinuxFxVersion::Empty => None,
            LinuxFxVersion::Dotnet(version) => Some(ApplicationStack::Dotnet {
                version,
                isolated: false,
            }),
            LinuxFxVersion::DotnetIsolated(version) => Some(ApplicationStack::Dotnet { version, isolated: true }),
            LinuxFxVersion::Node(version) => Some(ApplicationStack::Node { version }),
            LinuxFxVersion::Python(version) => Some(ApplicationStack::Python { version }),
            LinuxFxVersion::Java(version) => Some(ApplicationStack::Java { version }),
            LinuxFxVersion::PowerShell(version) => Some(ApplicationStack::PowershellCore { version }),
            LinuxFxVersion::Docker(reference) => {
                let registry = registry.filter(|r| !r.registry_url.is_empty())?;
                let host = registry_host(&registry.registry_url);
                let image = reference
                    .strip_prefix(host)
                    .and_then(|rest| rest.strip_prefix('/'))
                    .unwrap_or(&reference);
                let (image_name, image_tag) = match image.rsplit_once(':') {
                    Some((name, tag)) if !tag.contains('/') => (name.to_string(), tag.to_string()),
                    _ => (image.to_string(), String::new()),
                };
                Some(ApplicationStack::Docker(DockerStack {
                    registry_url: registry.registry_url.clone(),
                    image_name,
                    image_tag,
                    registry_username: registry.registry_username.clone(),
                    registry_password: registry.registry_password.clone(),
                }))
            }
        }
    }
}

/// Decode a wire string into a stack; unknown tags are an error
pub fn decode(value: &str, registry: Option<&DockerStack>) -> Result<Option<ApplicationStack>, FxVersionError> {
    value.parse::<LinuxFxVersion>().map(|fx| fx.into_stack(registry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_languages() {
        let node = ApplicationStack::Node {
            version: "18".to_string(),
        };
        assert_eq!(encode(Some(&node)), "Node|18");

        let isolated = ApplicationStack::Dotnet {
            version: "6.0".to_string(),
            isolated: true,
        };
        assert_eq!(encode(Some(&isolated)), "DOTNET-ISOLATED|6.0");

        let pwsh = ApplicationStack::PowershellCore {
            version: "7.2".to_string(),
        };
        assert_eq!(encode(Some(&pwsh)), "PowerShell|7.2");

        assert_eq!(encode(Some(&ApplicationStack::CustomHandler)), "");
        assert_eq!(encode(None), "");
    }

    #[test]
    fn test_decode_ignores_tag_case() {
        assert_eq!(
            decode("NODE|18", None).unwrap(),
            Some(ApplicationStack::Node {
                version: "18".to_string()
            })
        );
        assert_eq!(
            decode("python|3.9", None).unwrap(),
            Some(ApplicationStack::Python {
                version: "3.9".to_string()
            })
        );
        assert_eq!(decode("", None).unwrap(), None);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode("Node18", None), Err(FxVersionError::MissingSeparator(_))));
        assert!(matches!(decode("COBOL|85", None), Err(FxVersionError::UnknownTag { .. })));
    }

    #[test]
    fn test_docker_round_trip_strips_scheme() {
        let docker = DockerStack {
            registry_url: "https://myregistry.azurecr.io".to_string(),
            image_name: "team/app".to_string(),
            image_tag: "1.2.3".to_string(),
            registry_username: "user".to_string(),
            registry_password: "secret".to_string(),
        };
        let stack = ApplicationStack::Docker(docker.clone());
        let encoded = encode(Some(&stack));
        assert_eq!(encoded, "DOCKER|myregistry.azurecr.io/team/app:1.2.3");

        let decoded = decode(&encoded, Some(&docker)).unwrap();
        assert_eq!(decoded, Some(stack));
    }

    #[test]
    fn test_docker_without_registry_is_unknown() {
        assert_eq!(decode("DOCKER|registry.io/app:1", None).unwrap(), None);
    }
}
