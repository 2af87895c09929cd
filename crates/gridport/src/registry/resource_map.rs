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

//! Identity-keyed resource map shared by the in-process backends.
//!
//! The map itself is not synchronized; providers wrap it in their own lock.

use std::collections::BTreeMap;

use super::error::{EntityKind, RegistryError};
use crate::models::{Resource, ResourceKey};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct ResourceMap {
    resources: BTreeMap<ResourceKey, Resource>,
}

impl ResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_resources(resources: impl IntoIterator<Item = Resource>) -> Result<Self, RegistryError> {
        let mut map = Self::new();
        for resource in resources {
            map.add(resource)?;
        }
        Ok(map)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn snapshot(&self) -> Vec<Resource> {
        self.resources.values().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&Resource> {
        self.resources.get(key)
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.resources.contains_key(key)
    }

    pub fn add(&mut self, resource: Resource) -> Result<(), RegistryError> {
        resource.validate_children()?;
        if self.resources.contains_key(resource.key()) {
            return Err(RegistryError::Duplicate {
                entity: EntityKind::Resource,
                key: resource.key().to_string(),
            });
        }
        self.resources.insert(resource.key().clone(), resource);
        Ok(())
    }

    pub fn save(&mut self, resource: Resource) -> Result<(), RegistryError> {
        resource.validate_children()?;
        let slot = self
            .resources
            .get_mut(resource.key())
            .ok_or_else(|| not_found(resource.key()))?;
        *slot = resource;
        Ok(())
    }

    pub fn remove(&mut self, key: &ResourceKey) -> Result<Resource, RegistryError> {
        self.resources.remove(key).ok_or_else(|| not_found(key))
    }

    /// Swap in a complete new state.
    pub fn replace(&mut self, other: ResourceMap) {
        self.resources = other.resources;
    }
}

fn not_found(key: &ResourceKey) -> RegistryError {
    RegistryError::NotFound {
        entity: EntityKind::Resource,
        key: key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Application;

    #[test]
    fn test_duplicate_add_keeps_original() {
        let mut map = ResourceMap::new();
        let original = Resource::new("moab", "clusterA").unwrap();
        map.add(original.clone()).unwrap();

        let mut replacement = Resource::new("moab", "clusterA").unwrap();
        replacement
            .add_application(Application::new("sim", "1.0", "/bin/sim").unwrap())
            .unwrap();
        assert!(map.add(replacement).unwrap_err().is_duplicate());

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(original.key()), Some(&original));
    }

    #[test]
    fn test_save_requires_existing_key() {
        let mut map = ResourceMap::new();
        let err = map.save(Resource::new("moab", "clusterA").unwrap()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_snapshot_is_ordered_by_key() {
        let map = ResourceMap::from_resources(vec![
            Resource::new("pbs", "b").unwrap(),
            Resource::new("moab", "z").unwrap(),
            Resource::new("moab", "a").unwrap(),
        ])
        .unwrap();

        let keys: Vec<String> = map.snapshot().iter().map(|r| r.key().to_string()).collect();
        assert_eq!(keys, vec!["moab/a", "moab/z", "pbs/b"]);
    }
}
