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

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridportConfig {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub staging: StagingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which [`ResourceProvider`](crate::registry::ResourceProvider) backs the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryBackend {
    Memory,
    File,
    Database,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub backend: RegistryBackend,
    /// XML document used by the `file` backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,
    /// Replacement SQL for named calls, e.g. `"resources.view_all"`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub calls: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub instances: Vec<MiddlewareInstanceConfig>,
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiddlewareInstanceConfig {
    pub name: String,
    pub url: String,
}

/// What an import does with a job that cannot be matched to registry assets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnresolvedJobPolicy {
    /// Fail the whole import.
    #[default]
    Reject,
    /// Keep the job without a binding.
    KeepUnbound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingConfig {
    pub root: PathBuf,
    #[serde(default)]
    pub unresolved_jobs: UnresolvedJobPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub with_target: bool,
}

pub(crate) fn default_pool_size() -> u32 {
    4
}

pub(crate) fn default_connection_timeout_secs() -> u64 {
    30
}

pub(crate) fn default_remote_timeout_secs() -> u64 {
    10
}
