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

//! Compute resources and their identity key.

use std::collections::BTreeMap;
use std::fmt;

use super::application::{Application, ApplicationKey};
use super::queue::Queue;
use super::require_non_blank;
use crate::registry::error::{EntityKind, RegistryError};

/// Identity of a resource within a registry: `type + name`, case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKey {
    pub resource_type: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// Build a key from user input, trimming and rejecting blank parts.
    pub fn parse(resource_type: &str, name: &str) -> Result<Self, RegistryError> {
        Ok(Self {
            resource_type: require_non_blank(EntityKind::Resource, "type", resource_type)?,
            name: require_non_blank(EntityKind::Resource, "name", name)?,
        })
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.name)
    }
}

/// A named, typed compute endpoint hosting applications and queues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    key: ResourceKey,
    applications_editable: bool,
    applications: BTreeMap<ApplicationKey, Application>,
    queues: BTreeMap<String, Queue>,
}

impl Resource {
    pub fn new(resource_type: impl AsRef<str>, name: impl AsRef<str>) -> Result<Self, RegistryError> {
        Ok(Self {
            key: ResourceKey::parse(resource_type.as_ref(), name.as_ref())?,
            applications_editable: true,
            applications: BTreeMap::new(),
            queues: BTreeMap::new(),
        })
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn resource_type(&self) -> &str {
        &self.key.resource_type
    }

    /// Whether applications on this resource may be added, replaced or
    /// removed. Independent of the editability of the registry holding it.
    pub fn applications_editable(&self) -> bool {
        self.applications_editable
    }

    pub fn set_applications_editable(&mut self, editable: bool) {
        self.applications_editable = editable;
    }

    pub fn with_applications_editable(mut self, editable: bool) -> Self {
        self.applications_editable = editable;
        self
    }

    pub fn applications(&self) -> impl Iterator<Item = &Application> {
        self.applications.values()
    }

    pub fn application_count(&self) -> usize {
        self.applications.len()
    }

    pub fn application(&self, key: &ApplicationKey) -> Option<&Application> {
        self.applications.get(key)
    }

    pub fn contains_application(&self, key: &ApplicationKey) -> bool {
        self.applications.contains_key(key)
    }

    pub fn add_application(&mut self, mut application: Application) -> Result<(), RegistryError> {
        self.check_applications_editable()?;
        self.check_owner(EntityKind::Application, application.owner())?;
        if self.applications.contains_key(application.key()) {
            return Err(RegistryError::Duplicate {
                entity: EntityKind::Application,
                key: format!("{} on {}", application.key(), self.key),
            });
        }
        application.set_owner(Some(self.key.clone()));
        self.applications
            .insert(application.key().clone(), application);
        Ok(())
    }

    /// Replace the application with the same key.
    pub fn save_application(&mut self, mut application: Application) -> Result<(), RegistryError> {
        self.check_applications_editable()?;
        self.check_owner(EntityKind::Application, application.owner())?;
        let slot = self
            .applications
            .get_mut(application.key())
            .ok_or_else(|| RegistryError::NotFound {
                entity: EntityKind::Application,
                key: format!("{} on {}", application.key(), self.key),
            })?;
        application.set_owner(Some(self.key.clone()));
        *slot = application;
        Ok(())
    }

    pub fn remove_application(&mut self, key: &ApplicationKey) -> Result<Application, RegistryError> {
        self.check_applications_editable()?;
        let mut removed = self
            .applications
            .remove(key)
            .ok_or_else(|| RegistryError::NotFound {
                entity: EntityKind::Application,
                key: format!("{} on {}", key, self.key),
            })?;
        removed.set_owner(None);
        Ok(removed)
    }

    pub fn queues(&self) -> impl Iterator<Item = &Queue> {
        self.queues.values()
    }

    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    pub fn queue(&self, name: &str) -> Option<&Queue> {
        self.queues.get(name)
    }

    pub fn contains_queue(&self, name: &str) -> bool {
        self.queues.contains_key(name)
    }

    pub fn add_queue(&mut self, mut queue: Queue) -> Result<(), RegistryError> {
        self.check_owner(EntityKind::Queue, queue.owner())?;
        if self.queues.contains_key(queue.name()) {
            return Err(RegistryError::Duplicate {
                entity: EntityKind::Queue,
                key: format!("{} on {}", queue.name(), self.key),
            });
        }
        queue.set_owner(Some(self.key.clone()));
        self.queues.insert(queue.name().to_string(), queue);
        Ok(())
    }

    pub fn remove_queue(&mut self, name: &str) -> Result<Queue, RegistryError> {
        let mut removed = self
            .queues
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound {
                entity: EntityKind::Queue,
                key: format!("{} on {}", name, self.key),
            })?;
        removed.set_owner(None);
        Ok(removed)
    }

    /// Point every application and queue back at this resource. Called
    /// after deserialization, since the reverse edge is never stored.
    pub(crate) fn rebuild_back_references(&mut self) {
        for application in self.applications.values_mut() {
            application.set_owner(Some(self.key.clone()));
        }
        for queue in self.queues.values_mut() {
            queue.set_owner(Some(self.key.clone()));
        }
    }

    /// Check that every child points at this resource.
    pub(crate) fn validate_children(&self) -> Result<(), RegistryError> {
        for application in self.applications.values() {
            if application.owner() != Some(&self.key) {
                return Err(RegistryError::invalid(
                    EntityKind::Application,
                    format!("{} is not owned by {}", application.key(), self.key),
                ));
            }
        }
        for queue in self.queues.values() {
            if queue.owner() != Some(&self.key) {
                return Err(RegistryError::invalid(
                    EntityKind::Queue,
                    format!("{} is not owned by {}", queue.name(), self.key),
                ));
            }
        }
        Ok(())
    }

    fn check_applications_editable(&self) -> Result<(), RegistryError> {
        if !self.applications_editable {
            return Err(RegistryError::NotEditable {
                target: format!("applications of {}", self.key),
            });
        }
        Ok(())
    }

    fn check_owner(&self, entity: EntityKind, owner: Option<&ResourceKey>) -> Result<(), RegistryError> {
        match owner {
            Some(other) if other != &self.key => Err(RegistryError::invalid(
                entity,
                format!("already owned by {}", other),
            )),
            _ => Ok(()),
        }
    }
}
