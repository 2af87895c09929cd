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

//! In-memory registry, used for tests and as a scratch backend.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use super::error::RegistryError;
use super::resource_map::ResourceMap;
use super::traits::{not_editable, ResourceProvider};
use crate::models::{Resource, ResourceKey};

/// A registry that lives only for the lifetime of the process.
#[derive(Debug)]
pub struct MemoryResourceProvider {
    resources: RwLock<ResourceMap>,
    editable: AtomicBool,
}

impl MemoryResourceProvider {
    pub fn new() -> Self {
        Self {
            resources: RwLock::new(ResourceMap::new()),
            editable: AtomicBool::new(true),
        }
    }

    /// Create a provider pre-populated with `resources`.
    pub fn with_resources(resources: impl IntoIterator<Item = Resource>) -> Result<Self, RegistryError> {
        Ok(Self {
            resources: RwLock::new(ResourceMap::from_resources(resources)?),
            editable: AtomicBool::new(true),
        })
    }

    pub fn set_editable(&self, editable: bool) {
        self.editable.store(editable, Ordering::SeqCst);
    }

    fn check_editable(&self) -> Result<(), RegistryError> {
        if !self.is_editable() {
            return Err(not_editable(self.name()));
        }
        Ok(())
    }
}

impl Default for MemoryResourceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProvider for MemoryResourceProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn needs_init(&self) -> bool {
        false
    }

    fn init(&self) -> Result<(), RegistryError> {
        Ok(())
    }

    fn is_editable(&self) -> bool {
        self.editable.load(Ordering::SeqCst)
    }

    fn get_resources(&self) -> Result<Vec<Resource>, RegistryError> {
        Ok(self.resources.read().snapshot())
    }

    fn get_resource(&self, name: &str, resource_type: &str) -> Result<Option<Resource>, RegistryError> {
        let key = ResourceKey::new(resource_type, name);
        Ok(self.resources.read().get(&key).cloned())
    }

    fn contains_resource(&self, key: &ResourceKey) -> Result<bool, RegistryError> {
        Ok(self.resources.read().contains(key))
    }

    fn add_resource(&self, resource: Resource) -> Result<(), RegistryError> {
        self.check_editable()?;
        self.resources.write().add(resource)
    }

    fn save_resource(&self, resource: Resource) -> Result<(), RegistryError> {
        self.check_editable()?;
        self.resources.write().save(resource)
    }

    fn remove_resource(&self, key: &ResourceKey) -> Result<Resource, RegistryError> {
        self.check_editable()?;
        self.resources.write().remove(key)
    }

    fn commit_changes(&self) -> Result<(), RegistryError> {
        Ok(())
    }
}
