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

//! Resolution of job descriptions to concrete registry assets.
//!
//! A [`SearchCriteria`] names whatever parts of a resource, application and
//! queue a job description pins down. [`AssetFinder`] scans one or more
//! registries in order and returns the first exact, case-sensitive match.
//! The finder holds no mutable state; one instance can serve any number of
//! threads.

use std::fmt;

use crate::models::{Application, JobBinding, Queue, Resource};
use crate::registry::{EntityKind, RegistryError, ResourceProvider};

/// One constrainable field of a [`SearchCriteria`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriteriaField {
    ResourceName,
    ResourceType,
    ApplicationName,
    ApplicationVersion,
    ApplicationPath,
    QueueName,
}

impl CriteriaField {
    pub const ALL: [CriteriaField; 6] = [
        CriteriaField::ResourceName,
        CriteriaField::ResourceType,
        CriteriaField::ApplicationName,
        CriteriaField::ApplicationVersion,
        CriteriaField::ApplicationPath,
        CriteriaField::QueueName,
    ];

    /// Key used for this field in archive metadata.
    pub fn metadata_key(self) -> &'static str {
        match self {
            CriteriaField::ResourceName => "gridport.resource.name",
            CriteriaField::ResourceType => "gridport.resource.type",
            CriteriaField::ApplicationName => "gridport.application.name",
            CriteriaField::ApplicationVersion => "gridport.application.version",
            CriteriaField::ApplicationPath => "gridport.application.path",
            CriteriaField::QueueName => "gridport.queue.name",
        }
    }

    pub fn from_metadata_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.metadata_key() == key.trim())
    }
}

/// Immutable description of the assets a job needs.
///
/// Values are trimmed when set; a blank value leaves the field
/// unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    resource_name: Option<String>,
    resource_type: Option<String>,
    application_name: Option<String>,
    application_version: Option<String>,
    application_path: Option<String>,
    queue_name: Option<String>,
}

impl SearchCriteria {
    pub fn builder() -> SearchCriteriaBuilder {
        SearchCriteriaBuilder::default()
    }

    pub fn get(&self, field: CriteriaField) -> Option<&str> {
        match field {
            CriteriaField::ResourceName => self.resource_name.as_deref(),
            CriteriaField::ResourceType => self.resource_type.as_deref(),
            CriteriaField::ApplicationName => self.application_name.as_deref(),
            CriteriaField::ApplicationVersion => self.application_version.as_deref(),
            CriteriaField::ApplicationPath => self.application_path.as_deref(),
            CriteriaField::QueueName => self.queue_name.as_deref(),
        }
    }

    pub fn resource_name(&self) -> Option<&str> {
        self.resource_name.as_deref()
    }

    pub fn resource_type(&self) -> Option<&str> {
        self.resource_type.as_deref()
    }

    pub fn application_name(&self) -> Option<&str> {
        self.application_name.as_deref()
    }

    pub fn application_version(&self) -> Option<&str> {
        self.application_version.as_deref()
    }

    pub fn application_path(&self) -> Option<&str> {
        self.application_path.as_deref()
    }

    pub fn queue_name(&self) -> Option<&str> {
        self.queue_name.as_deref()
    }

    pub fn is_unconstrained(&self) -> bool {
        CriteriaField::ALL.iter().all(|field| self.get(*field).is_none())
    }

    pub fn matches_resource(&self, resource: &Resource) -> bool {
        matches(self.resource_name(), resource.name())
            && matches(self.resource_type(), resource.resource_type())
    }

    pub fn matches_application(&self, application: &Application) -> bool {
        matches(self.application_name(), application.name())
            && matches(self.application_version(), application.version())
            && matches(self.application_path(), application.path())
    }

    pub fn matches_queue(&self, queue: &Queue) -> bool {
        matches(self.queue_name(), queue.name())
    }
}

fn matches(wanted: Option<&str>, actual: &str) -> bool {
    wanted.map_or(true, |wanted| wanted == actual)
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for field in CriteriaField::ALL {
            if let Some(value) = self.get(field) {
                if !first {
                    f.write_str(", ")?;
                }
                write!(f, "{}={}", field.metadata_key(), value)?;
                first = false;
            }
        }
        if first {
            f.write_str("<any>")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchCriteriaBuilder {
    criteria: SearchCriteria,
}

impl SearchCriteriaBuilder {
    /// Constrain `field` to `value`. A blank value clears the constraint.
    pub fn set(mut self, field: CriteriaField, value: impl AsRef<str>) -> Self {
        let value = value.as_ref().trim();
        let value = (!value.is_empty()).then(|| value.to_string());
        let c = &mut self.criteria;
        match field {
            CriteriaField::ResourceName => c.resource_name = value,
            CriteriaField::ResourceType => c.resource_type = value,
            CriteriaField::ApplicationName => c.application_name = value,
            CriteriaField::ApplicationVersion => c.application_version = value,
            CriteriaField::ApplicationPath => c.application_path = value,
            CriteriaField::QueueName => c.queue_name = value,
        }
        self
    }

    pub fn resource_name(self, value: impl AsRef<str>) -> Self {
        self.set(CriteriaField::ResourceName, value)
    }

    pub fn resource_type(self, value: impl AsRef<str>) -> Self {
        self.set(CriteriaField::ResourceType, value)
    }

    pub fn application_name(self, value: impl AsRef<str>) -> Self {
        self.set(CriteriaField::ApplicationName, value)
    }

    pub fn application_version(self, value: impl AsRef<str>) -> Self {
        self.set(CriteriaField::ApplicationVersion, value)
    }

    pub fn application_path(self, value: impl AsRef<str>) -> Self {
        self.set(CriteriaField::ApplicationPath, value)
    }

    pub fn queue_name(self, value: impl AsRef<str>) -> Self {
        self.set(CriteriaField::QueueName, value)
    }

    pub fn build(self) -> SearchCriteria {
        self.criteria
    }
}

/// Looks up registry assets across an ordered list of registries.
pub struct AssetFinder<'a> {
    providers: Vec<&'a dyn ResourceProvider>,
}

impl<'a> AssetFinder<'a> {
    /// Registries are searched in the order given.
    pub fn new(providers: Vec<&'a dyn ResourceProvider>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[&'a dyn ResourceProvider] {
        &self.providers
    }

    /// Every resource matching the resource part of `criteria`, in registry
    /// order and then key order.
    fn candidates(&self, criteria: &SearchCriteria) -> Result<Vec<Resource>, RegistryError> {
        let mut found = Vec::new();
        for provider in &self.providers {
            match (criteria.resource_name(), criteria.resource_type()) {
                (Some(name), Some(resource_type)) => {
                    found.extend(provider.get_resource(name, resource_type)?);
                }
                _ => found.extend(
                    provider
                        .get_resources()?
                        .into_iter()
                        .filter(|resource| criteria.matches_resource(resource)),
                ),
            }
        }
        Ok(found)
    }

    pub fn find_resource(&self, criteria: &SearchCriteria) -> Result<Resource, RegistryError> {
        self.candidates(criteria)?
            .into_iter()
            .next()
            .ok_or_else(|| not_found(EntityKind::Resource, criteria))
    }

    /// First application of `resource` matching `criteria`, in key order.
    pub fn find_application(
        &self,
        criteria: &SearchCriteria,
        resource: &Resource,
    ) -> Result<Application, RegistryError> {
        resource
            .applications()
            .find(|app| criteria.matches_application(app))
            .cloned()
            .ok_or_else(|| not_found_on(EntityKind::Application, criteria, resource))
    }

    pub fn find_queue(&self, criteria: &SearchCriteria, resource: &Resource) -> Result<Queue, RegistryError> {
        resource
            .queues()
            .find(|queue| criteria.matches_queue(queue))
            .cloned()
            .ok_or_else(|| not_found_on(EntityKind::Queue, criteria, resource))
    }

    /// Resolve a complete binding: a resource, one of its applications and,
    /// when the criteria name one, one of its queues.
    ///
    /// Candidate resources are tried in order; the first one that also
    /// hosts a matching application (and queue) wins. The error names the
    /// deepest level that could not be matched.
    pub fn resolve(&self, criteria: &SearchCriteria) -> Result<JobBinding, RegistryError> {
        let candidates = self.candidates(criteria)?;
        if candidates.is_empty() {
            return Err(not_found(EntityKind::Resource, criteria));
        }

        let mut missing = EntityKind::Application;
        for resource in candidates {
            let Ok(application) = self.find_application(criteria, &resource) else {
                continue;
            };
            let queue = match criteria.queue_name() {
                Some(_) => match self.find_queue(criteria, &resource) {
                    Ok(queue) => Some(queue),
                    Err(_) => {
                        missing = EntityKind::Queue;
                        continue;
                    }
                },
                None => None,
            };
            return JobBinding::new(resource, application, queue);
        }
        Err(not_found(missing, criteria))
    }
}

fn not_found(entity: EntityKind, criteria: &SearchCriteria) -> RegistryError {
    RegistryError::NotFound {
        entity,
        key: criteria.to_string(),
    }
}

fn not_found_on(entity: EntityKind, criteria: &SearchCriteria, resource: &Resource) -> RegistryError {
    RegistryError::NotFound {
        entity,
        key: format!("{} on {}", criteria, resource.key()),
    }
}
