// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Resource configuration
//!
//! Language resources live in a user-scoped data directory laid out like
//! `nltk_data`. The directory, the TLS certificate policy and download limits
//! are passed explicitly to whatever needs them; nothing is configured
//! globally.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the default data directory
pub const DATA_DIR_ENV: &str = "NLTK_DATA";

/// TLS certificate policy for resource downloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateVerification {
    /// Verify server certificates against the system roots
    #[default]
    Strict,
    /// Accept invalid certificates. Only for broken local TLS setups.
    AcceptInvalid,
}

impl CertificateVerification {
    pub fn from_insecure_flag(insecure: bool) -> Self {
        if insecure {
            CertificateVerification::AcceptInvalid
        } else {
            CertificateVerification::Strict
        }
    }

    pub fn accepts_invalid(&self) -> bool {
        matches!(self, CertificateVerification::AcceptInvalid)
    }
}

/// Configuration for resource bootstrap and loading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Root of the resource directory
    pub data_dir: PathBuf,
    /// Certificate policy used by the download client
    pub certificate_verification: CertificateVerification,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Pinned SHA-256 digests per package id
    #[serde(default)]
    pub checksums: BTreeMap<String, String>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            certificate_verification: CertificateVerification::Strict,
            timeout_secs: 600,
            checksums: BTreeMap::new(),
        }
    }
}

impl ResourceConfig {
    /// Default configuration rooted at `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Resolve a path relative to the data directory
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.data_dir.join(relative)
    }

    pub fn pinned_checksum(&self, package_id: &str) -> Option<&str> {
        self.checksums.get(package_id).map(|s| s.as_str())
    }
}

/// `$NLTK_DATA`, then `$HOME/nltk_data`, then `./nltk_data`
pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    match std::env::var_os("HOME").filter(|v| !v.is_empty()) {
        Some(home) => PathBuf::from(home).join("nltk_data"),
        None => PathBuf::from("nltk_data"),
    }
}
