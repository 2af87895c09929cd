/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::registry::RegistryError;

/// Errors that can occur while importing or managing staged workflows.
#[derive(Debug, Error)]
pub enum StagingError {
    /// The archive is not a zip, has no descriptor, or the descriptor is malformed.
    #[error("invalid workflow archive {path}: {reason}")]
    InvalidWorkflow { path: PathBuf, reason: String },

    /// A job could not be resolved, or a registry failed while resolving it.
    #[error("failed to resolve workflow assets: {0}")]
    Registry(#[from] RegistryError),

    #[error("workflow not found: {id}")]
    NotFound { id: String },

    #[error("staging I/O failed for {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("staging catalogue {path} could not be processed: {reason}")]
    Catalogue { path: PathBuf, reason: String },

    #[error("invalid staging user '{user}': {reason}")]
    InvalidUser { user: String, reason: String },
}

impl StagingError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StagingError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_workflow(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StagingError::InvalidWorkflow {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
