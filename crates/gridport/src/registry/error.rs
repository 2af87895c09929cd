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

//! Error types for registry operations.
//!
//! Every backend (memory, XML file, database, remote middleware) reports
//! failures through [`RegistryError`]. Backend-specific failures (I/O, XML,
//! pool or driver errors) are folded into [`RegistryError::Persistence`]
//! before they leave the provider.

use std::fmt;
use thiserror::Error;

/// The kind of registry entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Resource,
    Application,
    Queue,
    Job,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Resource => "resource",
            EntityKind::Application => "application",
            EntityKind::Queue => "queue",
            EntityKind::Job => "job",
        };
        f.write_str(label)
    }
}

/// Errors that can occur while reading or mutating a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A mutation was attempted on something that is read-only.
    #[error("{target} is not editable")]
    NotEditable { target: String },

    /// An insert collided with an existing identity key.
    #[error("{entity} already exists: {key}")]
    Duplicate { entity: EntityKind, key: String },

    /// A mutation or lookup referenced an identity that does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: EntityKind, key: String },

    /// A required field was blank or the input was structurally invalid.
    #[error("invalid {entity}: {reason}")]
    InvalidInput { entity: EntityKind, reason: String },

    /// Storage failure that does not fit any of the other kinds.
    #[error("persistence failure for {entity}: {reason}")]
    Persistence { entity: String, reason: String },
}

impl RegistryError {
    pub(crate) fn persistence(entity: impl Into<String>, reason: impl fmt::Display) -> Self {
        RegistryError::Persistence {
            entity: entity.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid(entity: EntityKind, reason: impl Into<String>) -> Self {
        RegistryError::InvalidInput {
            entity,
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound { .. })
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, RegistryError::Duplicate { .. })
    }

    pub fn is_not_editable(&self) -> bool {
        matches!(self, RegistryError::NotEditable { .. })
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, RegistryError::InvalidInput { .. })
    }
}
