// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Typed errors for language resource loading
//!
//! Everything else in the crate propagates `anyhow::Error`. Resource loading
//! gets its own type because the stopword filter recovers from it instead of
//! propagating it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A language resource that was expected on disk but not found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingResource {
    /// Package id (e.g. `stopwords`)
    pub package: String,
    /// Path that was checked
    pub path: PathBuf,
}

impl fmt::Display for MissingResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "resource '{}' not found at {} (run setup-resources)",
            self.package,
            self.path.display()
        )
    }
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("{0}")]
    Missing(MissingResource),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ResourceError {
    /// Describe the failure as the missing resource it amounts to
    pub fn as_missing(&self) -> MissingResource {
        match self {
            ResourceError::Missing(missing) => missing.clone(),
            ResourceError::Io { path, .. } => MissingResource {
                package: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path: path.clone(),
            },
        }
    }
}
