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

//! Domain models for the resource registry and the workflow staging area.
//!
//! Resources own their applications and queues. The reverse edge (an
//! application or queue pointing back at its resource) is kept as the
//! owner's [`ResourceKey`], set on insertion and cleared on removal. It is
//! never persisted; loaders call `Resource::rebuild_back_references` after
//! deserializing.

pub mod application;
pub mod queue;
pub mod resource;
pub mod workflow;

pub use application::{Application, ApplicationKey};
pub use queue::Queue;
pub use resource::{Resource, ResourceKey};
pub use workflow::{Job, JobBinding, Workflow};

use crate::registry::error::{EntityKind, RegistryError};

/// Trim `value` and reject it when nothing is left.
pub(crate) fn require_non_blank(
    entity: EntityKind,
    field: &str,
    value: impl AsRef<str>,
) -> Result<String, RegistryError> {
    let trimmed = value.as_ref().trim();
    if trimmed.is_empty() {
        return Err(RegistryError::invalid(
            entity,
            format!("{} must not be blank", field),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_non_blank_trims() {
        let value = require_non_blank(EntityKind::Resource, "name", "  clusterA ").unwrap();
        assert_eq!(value, "clusterA");
    }

    #[test]
    fn test_require_non_blank_rejects_whitespace() {
        let err = require_non_blank(EntityKind::Queue, "name", " \t").unwrap_err();
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains("name must not be blank"));
    }
}
