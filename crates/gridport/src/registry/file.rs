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

//! Registry persisted as a single XML document.
//!
//! All resources are held in memory behind one reader/writer lock. The lock
//! also covers the file I/O of [`init`](ResourceProvider::init) and
//! [`commit_changes`](ResourceProvider::commit_changes), so a commit always
//! writes a state that some reader could have observed, and a reader never
//! sees a half-loaded registry.
//!
//! Document layout:
//!
//! ```xml
//! <resources>
//!   <resource type="moab" name="clusterA" applications-editable="true">
//!     <application name="sim" version="1.0" path="/bin/sim" description="..."/>
//!     <queue name="batch"/>
//!   </resource>
//! </resources>
//! ```
//!
//! Owner back-references are not part of the document; they are rebuilt
//! while the resources are reassembled on load.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::error::RegistryError;
use super::resource_map::ResourceMap;
use super::traits::ResourceProvider;
use crate::models::{Application, Queue, Resource, ResourceKey};
use crate::xml::{read_document, write_document};

const ROOT_ELEMENT: &str = "resources";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ResourcesDocument {
    #[serde(rename = "resource", default)]
    resources: Vec<ResourceElement>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ResourceElement {
    #[serde(rename = "@type")]
    resource_type: String,
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@applications-editable", default = "default_true")]
    applications_editable: bool,
    #[serde(rename = "application", default)]
    applications: Vec<ApplicationElement>,
    #[serde(rename = "queue", default)]
    queues: Vec<QueueElement>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApplicationElement {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@version")]
    version: String,
    #[serde(rename = "@path")]
    path: String,
    #[serde(rename = "@description", default)]
    description: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct QueueElement {
    #[serde(rename = "@name")]
    name: String,
}

fn default_true() -> bool {
    true
}

impl From<&Resource> for ResourceElement {
    fn from(resource: &Resource) -> Self {
        Self {
            resource_type: resource.resource_type().to_string(),
            name: resource.name().to_string(),
            applications_editable: resource.applications_editable(),
            applications: resource
                .applications()
                .map(|app| ApplicationElement {
                    name: app.name().to_string(),
                    version: app.version().to_string(),
                    path: app.path().to_string(),
                    description: app.description().to_string(),
                })
                .collect(),
            queues: resource
                .queues()
                .map(|queue| QueueElement {
                    name: queue.name().to_string(),
                })
                .collect(),
        }
    }
}

impl ResourceElement {
    /// Reassemble the resource. Adding each child through the resource
    /// re-establishes its owner back-reference.
    fn into_resource(self) -> Result<Resource, RegistryError> {
        let mut resource = Resource::new(&self.resource_type, &self.name)?;
        for app in self.applications {
            resource.add_application(
                Application::new(&app.name, &app.version, &app.path)?
                    .with_description(&app.description),
            )?;
        }
        for queue in self.queues {
            resource.add_queue(Queue::new(&queue.name)?)?;
        }
        resource.set_applications_editable(self.applications_editable);
        Ok(resource)
    }
}

#[derive(Debug)]
struct FileState {
    resources: ResourceMap,
    initialized: bool,
}

/// Registry backed by an XML file on disk.
#[derive(Debug)]
pub struct FileResourceProvider {
    path: PathBuf,
    state: RwLock<FileState>,
}

impl FileResourceProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: RwLock::new(FileState {
                resources: ResourceMap::new(),
                initialized: false,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<ResourceMap, RegistryError> {
        let document: Option<ResourcesDocument> = read_document(&self.path)
            .map_err(|e| RegistryError::persistence(self.path.display().to_string(), e))?;

        let Some(document) = document else {
            info!(
                "Registry file {} does not exist, starting with an empty registry",
                self.path.display()
            );
            return Ok(ResourceMap::new());
        };

        let mut resources = ResourceMap::new();
        for element in document.resources {
            resources.add(element.into_resource()?)?;
        }
        Ok(resources)
    }
}

impl ResourceProvider for FileResourceProvider {
    fn name(&self) -> &str {
        "file"
    }

    fn needs_init(&self) -> bool {
        !self.state.read().initialized
    }

    fn init(&self) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        if state.initialized {
            debug!("Registry {} already initialized", self.path.display());
            return Ok(());
        }

        let loaded = self.load()?;
        info!(
            "Loaded {} resources from {}",
            loaded.len(),
            self.path.display()
        );
        state.resources.replace(loaded);
        state.initialized = true;
        Ok(())
    }

    fn is_editable(&self) -> bool {
        true
    }

    fn get_resources(&self) -> Result<Vec<Resource>, RegistryError> {
        self.ensure_initialized()?;
        Ok(self.state.read().resources.snapshot())
    }

    fn get_resource(&self, name: &str, resource_type: &str) -> Result<Option<Resource>, RegistryError> {
        self.ensure_initialized()?;
        let key = ResourceKey::new(resource_type, name);
        Ok(self.state.read().resources.get(&key).cloned())
    }

    fn contains_resource(&self, key: &ResourceKey) -> Result<bool, RegistryError> {
        self.ensure_initialized()?;
        Ok(self.state.read().resources.contains(key))
    }

    fn add_resource(&self, resource: Resource) -> Result<(), RegistryError> {
        self.ensure_initialized()?;
        debug!("Adding resource {}", resource.key());
        self.state.write().resources.add(resource)
    }

    fn save_resource(&self, resource: Resource) -> Result<(), RegistryError> {
        self.ensure_initialized()?;
        debug!("Saving resource {}", resource.key());
        self.state.write().resources.save(resource)
    }

    fn remove_resource(&self, key: &ResourceKey) -> Result<Resource, RegistryError> {
        self.ensure_initialized()?;
        debug!("Removing resource {}", key);
        self.state.write().resources.remove(key)
    }

    fn commit_changes(&self) -> Result<(), RegistryError> {
        self.ensure_initialized()?;
        let state = self.state.write();
        let document = ResourcesDocument {
            resources: state.resources.iter().map(ResourceElement::from).collect(),
        };
        write_document(&self.path, ROOT_ELEMENT, &document)
            .map_err(|e| RegistryError::persistence(self.path.display().to_string(), e))?;
        info!(
            "Committed {} resources to {}",
            document.resources.len(),
            self.path.display()
        );
        Ok(())
    }
}
