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

//! Core trait for registry backends.

use super::error::RegistryError;
use crate::models::{Resource, ResourceKey};

/// CRUD contract over the resources of one registry.
///
/// Implementations own their concurrency discipline; every method takes
/// `&self` so a provider can be shared between request threads behind an
/// `Arc`. Reads return owned snapshots, never live references, so callers
/// cannot bypass the registry's invariants.
///
/// Mutators validate their input before touching any state: a failed call
/// leaves the registry exactly as it was.
pub trait ResourceProvider: Send + Sync {
    /// Short label used in log lines and error messages.
    fn name(&self) -> &str;

    /// Whether [`init`](Self::init) still has to run.
    fn needs_init(&self) -> bool;

    /// Load backing state. Calling it again after a successful run is a no-op.
    fn init(&self) -> Result<(), RegistryError>;

    /// Whether resources can be added, saved or removed.
    fn is_editable(&self) -> bool;

    /// Snapshot of all resources, ordered by key.
    fn get_resources(&self) -> Result<Vec<Resource>, RegistryError>;

    /// Look a resource up by name and type.
    fn get_resource(&self, name: &str, resource_type: &str) -> Result<Option<Resource>, RegistryError>;

    fn contains_resource(&self, key: &ResourceKey) -> Result<bool, RegistryError>;

    /// Insert a new resource.
    ///
    /// # Errors
    ///
    /// * `NotEditable` - the registry is read-only
    /// * `Duplicate` - a resource with the same key exists; nothing changes
    /// * `InvalidInput` - an application or queue is not owned by the resource
    fn add_resource(&self, resource: Resource) -> Result<(), RegistryError>;

    /// Replace an existing resource (matched by key) with `resource`.
    fn save_resource(&self, resource: Resource) -> Result<(), RegistryError>;

    /// Remove the resource with `key`, returning what was stored.
    fn remove_resource(&self, key: &ResourceKey) -> Result<Resource, RegistryError>;

    /// Flush pending changes to durable storage, if the backend has any.
    fn commit_changes(&self) -> Result<(), RegistryError>;

    /// Run [`init`](Self::init) only if it has not completed yet.
    fn ensure_initialized(&self) -> Result<(), RegistryError> {
        if self.needs_init() {
            self.init()?;
        }
        Ok(())
    }
}

/// Error returned by every mutator of a read-only provider.
pub(crate) fn not_editable(provider: &str) -> RegistryError {
    RegistryError::NotEditable {
        target: format!("{} registry", provider),
    }
}
