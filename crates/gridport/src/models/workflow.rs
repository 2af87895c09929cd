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

//! Imported workflows and the jobs they contain.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::application::Application;
use super::queue::Queue;
use super::resource::Resource;
use crate::registry::error::{EntityKind, RegistryError};

/// The registry assets a job runs on.
///
/// The application and the queue (when present) always belong to the bound
/// resource; [`JobBinding::new`] refuses anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobBinding {
    resource: Resource,
    application: Application,
    queue: Option<Queue>,
}

impl JobBinding {
    pub fn new(
        resource: Resource,
        application: Application,
        queue: Option<Queue>,
    ) -> Result<Self, RegistryError> {
        if application.owner() != Some(resource.key())
            || !resource.contains_application(application.key())
        {
            return Err(RegistryError::invalid(
                EntityKind::Job,
                format!(
                    "application {} does not belong to {}",
                    application.key(),
                    resource.key()
                ),
            ));
        }
        if let Some(queue) = &queue {
            if queue.owner() != Some(resource.key()) || !resource.contains_queue(queue.name()) {
                return Err(RegistryError::invalid(
                    EntityKind::Job,
                    format!("queue {} does not belong to {}", queue.name(), resource.key()),
                ));
            }
        }
        Ok(Self {
            resource,
            application,
            queue,
        })
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    pub fn queue(&self) -> Option<&Queue> {
        self.queue.as_ref()
    }
}

/// One step of an imported workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub name: String,
    pub binding: Option<JobBinding>,
    /// Free-form execution parameters carried over from the archive.
    pub parameters: BTreeMap<String, String>,
}

impl Job {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            binding: None,
            parameters: BTreeMap::new(),
        }
    }

    pub fn bind(&mut self, binding: JobBinding) {
        self.binding = Some(binding);
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn resource_type(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.resource().resource_type())
    }
}

/// A workflow archive that has been imported into a staging area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    /// Where the staged archive currently lives.
    pub location: PathBuf,
    /// Location recorded before the last save, removed on the next save or delete.
    pub previous_location: Option<PathBuf>,
    pub imported_at: DateTime<Utc>,
    /// Jobs are kept in memory only; the catalogue does not persist them.
    pub jobs: Vec<Job>,
}

impl Workflow {
    pub fn bound_jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter().filter(|job| job.is_bound())
    }

    pub fn unbound_jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter().filter(|job| !job.is_bound())
    }

    /// Record a new archive location, remembering the old one so it can
    /// be cleaned up.
    pub fn relocate(&mut self, location: PathBuf) {
        if location != self.location {
            let old = std::mem::replace(&mut self.location, location);
            self.previous_location = Some(old);
        }
    }
}
