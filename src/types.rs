//! Constrained primitive types.
//!
//! Each wrapper has exactly one construction path that trims, case-folds
//! where the domain asks for it, and matches the fixed pattern, so an
//! instance that exists is always valid. The patterns themselves are
//! process-wide immutable configuration.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::ErrorKind;

const DISK_LABEL_PATTERN: &str = "^LABEL=RANCHER_[A-Z0-9]+$";
const DISK_DEVICE_PATTERN: &str = "^/dev/[a-z0-9]+$";
const FILE_MODE_PATTERN: &str = "^[0-9]{4}$";
const ENGINE_VERSION_PATTERN: &str = r"^docker-[0-9]+\.[0-9]+\.[0-9]+$";

static DISK_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(DISK_LABEL_PATTERN).unwrap());
static DISK_DEVICE: Lazy<Regex> = Lazy::new(|| Regex::new(DISK_DEVICE_PATTERN).unwrap());
static FILE_MODE: Lazy<Regex> = Lazy::new(|| Regex::new(FILE_MODE_PATTERN).unwrap());
static ENGINE_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(ENGINE_VERSION_PATTERN).unwrap());

/// Accounts permitted to own a written file.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum User {
    #[default]
    Root,
    Rancher,
}

impl User {
    pub fn parse(raw: &str) -> Result<Self, ErrorKind> {
        let value = raw.trim();
        value.parse().map_err(|_| ErrorKind::EnumMismatch {
            value: value.to_string(),
            allowed: <Self as strum::VariantNames>::VARIANTS,
        })
    }
}

/// Known filesystem type tags; `auto` lets the agent detect one.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FsType {
    #[default]
    Auto,
    Ext4,
}

impl FsType {
    pub fn parse(raw: &str) -> Result<Self, ErrorKind> {
        let value = raw.trim();
        value.parse().map_err(|_| ErrorKind::EnumMismatch {
            value: value.to_string(),
            allowed: <Self as strum::VariantNames>::VARIANTS,
        })
    }
}

/// Partition label selector, e.g. `LABEL=RANCHER_STATE`.
///
/// Input is upper-cased before matching, so a lower-case label is
/// normalized rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DiskLabel(String);

impl DiskLabel {
    pub fn new(raw: &str) -> Result<Self, ErrorKind> {
        let label = raw.trim().to_uppercase();
        if DISK_LABEL.is_match(&label) {
            Ok(Self(label))
        } else {
            Err(ErrorKind::PatternMismatch {
                pattern: DISK_LABEL_PATTERN,
                value: label,
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for DiskLabel {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Block device path, e.g. `/dev/sda`. Input is lower-cased before matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DiskDevice(String);

impl DiskDevice {
    pub fn new(raw: &str) -> Result<Self, ErrorKind> {
        let device = raw.trim().to_lowercase();
        if DISK_DEVICE.is_match(&device) {
            Ok(Self(device))
        } else {
            Err(ErrorKind::PatternMismatch {
                pattern: DISK_DEVICE_PATTERN,
                value: device,
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiskDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for DiskDevice {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// File permission bits as a 4-digit string, e.g. `"0644"`.
///
/// The value denotes octal mode bits but stays a string end to end; it is
/// never coerced to an integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FileMode(String);

impl FileMode {
    pub fn new(raw: &str) -> Result<Self, ErrorKind> {
        let mode = raw.trim().to_string();
        if FILE_MODE.is_match(&mode) {
            Ok(Self(mode))
        } else {
            Err(ErrorKind::PatternMismatch {
                pattern: FILE_MODE_PATTERN,
                value: mode,
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for FileMode {
    fn default() -> Self {
        Self("0400".to_string())
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for FileMode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Docker engine version constraint, e.g. `docker-17.03.2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EngineVersion(String);

impl EngineVersion {
    pub fn new(raw: &str) -> Result<Self, ErrorKind> {
        let version = raw.trim().to_string();
        if ENGINE_VERSION.is_match(&version) {
            Ok(Self(version))
        } else {
            Err(ErrorKind::PatternMismatch {
                pattern: ENGINE_VERSION_PATTERN,
                value: version,
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for EngineVersion {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
