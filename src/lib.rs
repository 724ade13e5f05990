//! Schema and validation for the cloud-config document consumed by the
//! boot provisioning agent.
//!
//! A cloud-config describes host identity, SSH access, state-partition
//! setup, service toggles, network interfaces and Wi-Fi credentials,
//! environment variables, boot commands, and files to materialize on disk.
//! This crate owns the typed entity tree, every field-level constraint,
//! and the canonical serialized form; reading bytes from disk and acting
//! on a validated document belong to the callers.
//!
//! The schema is closed-world: a field the schema does not declare is an
//! error, not something to drop silently. Validation is a single pass —
//! [`CloudConfig::from_value`] walks a parsed generic document and either
//! returns the fully validated tree or every violation found, each tagged
//! with its field path.

pub mod config;
pub mod error;
pub mod types;

mod fields;

pub use config::{
    BootCommand, CloudConfig, DnsConfig, DockerConfig, Environment, Interface, NetworkConfig,
    RancherConfig, ServicesInclude, SshConfig, StateConfig, WifiNetwork, WiredInterface,
    WirelessInterface, WriteFile,
};
pub use error::{Error, ErrorKind, FieldError, ValidationErrors};
pub use types::{DiskDevice, DiskLabel, EngineVersion, FileMode, FsType, User};

use tracing::debug;

/// Parse and validate a cloud-config document from its textual form.
///
/// JSON and YAML are both accepted; a document whose first significant
/// character is `{` is treated as JSON.
pub fn parse_config(content: &str) -> Result<CloudConfig, Error> {
    debug!("parsing cloud-config document ({} bytes)", content.len());
    let value: serde_json::Value = if content.trim_start().starts_with('{') {
        serde_json::from_str(content).map_err(|e| Error::Parse(e.to_string()))?
    } else {
        serde_yaml::from_str(content).map_err(|e| Error::Parse(e.to_string()))?
    };
    Ok(CloudConfig::from_value(&value)?)
}
