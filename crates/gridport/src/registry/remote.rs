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

//! Read-only view over remote grid middleware.
//!
//! Each configured middleware instance is asked for the resources it knows
//! about, and the answers are turned into [`Resource`]s whose applications
//! are locked. The remote protocol does not report install paths, so every
//! application carries [`PATH_NOT_AVAILABLE`] as its path.
//!
//! An instance that cannot be reached is logged and skipped; the listing
//! contains whatever the other instances returned.

use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

use super::error::RegistryError;
use super::traits::{not_editable, ResourceProvider};
use crate::models::{Application, Queue, Resource, ResourceKey};

/// Path reported for applications discovered through middleware.
pub const PATH_NOT_AVAILABLE: &str = "not available";

/// One middleware endpoint to query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiddlewareInstance {
    pub name: String,
    pub url: String,
}

/// Listing returned by a middleware instance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteListing {
    #[serde(default)]
    pub resources: Vec<RemoteResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteResource {
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub applications: Vec<RemoteApplication>,
    #[serde(default)]
    pub queues: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteApplication {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Error)]
pub enum RemoteQueryError {
    #[error("request to {instance} failed: {reason}")]
    Transport { instance: String, reason: String },

    #[error("unexpected response from {instance}: {reason}")]
    Response { instance: String, reason: String },
}

/// Transport used to talk to middleware instances.
pub trait MiddlewareClient: Send + Sync {
    fn query(&self, instance: &MiddlewareInstance) -> Result<RemoteListing, RemoteQueryError>;
}

/// Blocking HTTP client expecting a JSON [`RemoteListing`] at each instance URL.
#[cfg(feature = "remote")]
pub struct HttpMiddlewareClient {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "remote")]
impl HttpMiddlewareClient {
    pub fn new(timeout: std::time::Duration) -> Result<Self, RemoteQueryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteQueryError::Transport {
                instance: "<client>".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[cfg(feature = "remote")]
impl MiddlewareClient for HttpMiddlewareClient {
    fn query(&self, instance: &MiddlewareInstance) -> Result<RemoteListing, RemoteQueryError> {
        let response = self
            .client
            .get(&instance.url)
            .send()
            .map_err(|e| RemoteQueryError::Transport {
                instance: instance.name.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteQueryError::Response {
                instance: instance.name.clone(),
                reason: format!("HTTP {}", status),
            });
        }

        response
            .json::<RemoteListing>()
            .map_err(|e| RemoteQueryError::Response {
                instance: instance.name.clone(),
                reason: e.to_string(),
            })
    }
}

/// Registry adapter over one or more middleware instances. Never editable.
pub struct RemoteResourceProvider {
    instances: Vec<MiddlewareInstance>,
    client: Box<dyn MiddlewareClient>,
}

impl RemoteResourceProvider {
    pub fn new(instances: Vec<MiddlewareInstance>, client: Box<dyn MiddlewareClient>) -> Self {
        Self { instances, client }
    }

    pub fn instances(&self) -> &[MiddlewareInstance] {
        &self.instances
    }

    fn collect(&self) -> BTreeMap<ResourceKey, Resource> {
        let mut merged: BTreeMap<ResourceKey, Resource> = BTreeMap::new();

        for instance in &self.instances {
            let listing = match self.client.query(instance) {
                Ok(listing) => listing,
                Err(e) => {
                    warn!("Skipping middleware instance {}: {}", instance.name, e);
                    continue;
                }
            };
            debug!(
                "Middleware instance {} reported {} resources",
                instance.name,
                listing.resources.len()
            );

            for remote in listing.resources {
                let resource = match synthesize(&instance.name, remote) {
                    Ok(resource) => resource,
                    Err(e) => {
                        warn!("Ignoring resource from {}: {}", instance.name, e);
                        continue;
                    }
                };
                match merged.get_mut(resource.key()) {
                    Some(existing) => merge_into(existing, resource),
                    None => {
                        merged.insert(resource.key().clone(), resource);
                    }
                }
            }
        }

        merged
    }
}

fn synthesize(instance: &str, remote: RemoteResource) -> Result<Resource, RegistryError> {
    let mut resource = Resource::new(&remote.resource_type, &remote.name)?;
    for app in remote.applications {
        let application = match Application::new(&app.name, &app.version, PATH_NOT_AVAILABLE) {
            Ok(application) => application.with_description(&app.description),
            Err(e) => {
                warn!(
                    "Ignoring application on {} from {}: {}",
                    resource.key(),
                    instance,
                    e
                );
                continue;
            }
        };
        if let Err(e) = resource.add_application(application) {
            debug!("Skipping application reported twice by {}: {}", instance, e);
        }
    }
    for queue in remote.queues {
        match Queue::new(&queue) {
            Ok(queue) => {
                if let Err(e) = resource.add_queue(queue) {
                    debug!("Skipping queue reported twice by {}: {}", instance, e);
                }
            }
            Err(e) => warn!("Ignoring queue on {} from {}: {}", resource.key(), instance, e),
        }
    }
    resource.set_applications_editable(false);
    Ok(resource)
}

/// Fold the assets of a resource seen on a second instance into the first.
fn merge_into(existing: &mut Resource, other: Resource) {
    existing.set_applications_editable(true);
    for app in other.applications() {
        if !existing.contains_application(app.key()) {
            let mut fresh = app.clone();
            fresh.set_owner(None);
            if let Err(e) = existing.add_application(fresh) {
                debug!("Not merging application into {}: {}", existing.key(), e);
            }
        }
    }
    for queue in other.queues() {
        if !existing.contains_queue(queue.name()) {
            let mut fresh = queue.clone();
            fresh.set_owner(None);
            if let Err(e) = existing.add_queue(fresh) {
                debug!("Not merging queue into {}: {}", existing.key(), e);
            }
        }
    }
    existing.set_applications_editable(false);
}

impl ResourceProvider for RemoteResourceProvider {
    fn name(&self) -> &str {
        "remote"
    }

    fn needs_init(&self) -> bool {
        false
    }

    fn init(&self) -> Result<(), RegistryError> {
        Ok(())
    }

    fn is_editable(&self) -> bool {
        false
    }

    fn get_resources(&self) -> Result<Vec<Resource>, RegistryError> {
        Ok(self.collect().into_values().collect())
    }

    fn get_resource(&self, name: &str, resource_type: &str) -> Result<Option<Resource>, RegistryError> {
        let key = ResourceKey::new(resource_type, name);
        Ok(self.collect().remove(&key))
    }

    fn contains_resource(&self, key: &ResourceKey) -> Result<bool, RegistryError> {
        Ok(self.collect().contains_key(key))
    }

    fn add_resource(&self, _resource: Resource) -> Result<(), RegistryError> {
        Err(not_editable(self.name()))
    }

    fn save_resource(&self, _resource: Resource) -> Result<(), RegistryError> {
        Err(not_editable(self.name()))
    }

    fn remove_resource(&self, _key: &ResourceKey) -> Result<Resource, RegistryError> {
        Err(not_editable(self.name()))
    }

    fn commit_changes(&self) -> Result<(), RegistryError> {
        Ok(())
    }
}
