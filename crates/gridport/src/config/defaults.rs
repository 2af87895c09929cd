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

use super::types::*;
use std::path::PathBuf;

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: RegistryBackend::File,
            path: Some(
                dirs::data_local_dir()
                    .map(|dir| dir.join("gridport").join("resources.xml"))
                    .unwrap_or_else(|| PathBuf::from("./resources.xml")),
            ),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: default_pool_size(),
            connection_timeout_secs: default_connection_timeout_secs(),
            calls: Default::default(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            instances: Vec::new(),
            timeout_secs: default_remote_timeout_secs(),
        }
    }
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            root: dirs::data_local_dir()
                .map(|dir| dir.join("gridport").join("staging"))
                .unwrap_or_else(|| PathBuf::from("./staging")),
            unresolved_jobs: UnresolvedJobPolicy::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: false,
        }
    }
}

/// Generate a complete default configuration as TOML string
pub fn generate_default_config_toml() -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(&GridportConfig::default())
}
