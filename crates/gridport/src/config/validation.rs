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
use super::ValidationError;

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for GridportConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        if let Err(e) = require_backend_settings(&self.registry, &self.database, &self.remote) {
            errors.push(e);
        }
        if let Err(e) = self.database.validate() {
            errors.push(e);
        }
        if let Err(e) = self.remote.validate() {
            errors.push(e);
        }
        if let Err(e) = self.logging.validate() {
            errors.push(e);
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple { errors }),
        }
    }
}

/// Check that the settings the selected registry backend needs are present.
pub fn require_backend_settings(
    registry: &RegistryConfig,
    database: &DatabaseConfig,
    remote: &RemoteConfig,
) -> Result<(), ValidationError> {
    match registry.backend {
        RegistryBackend::Memory => Ok(()),
        RegistryBackend::File => match &registry.path {
            Some(path) if !path.as_os_str().is_empty() => Ok(()),
            _ => Err(ValidationError::MissingSetting {
                section: "registry",
                key: "path",
                reason: "the file backend needs a document path".to_string(),
            }),
        },
        RegistryBackend::Database => match &database.url {
            Some(url) if !url.trim().is_empty() => Ok(()),
            _ => Err(ValidationError::MissingSetting {
                section: "database",
                key: "url",
                reason: "the database backend needs a connection url".to_string(),
            }),
        },
        RegistryBackend::Remote => {
            if remote.instances.is_empty() {
                Err(ValidationError::MissingSetting {
                    section: "remote",
                    key: "instances",
                    reason: "the remote backend needs at least one middleware instance"
                        .to_string(),
                })
            } else {
                Ok(())
            }
        }
    }
}

impl Validate for DatabaseConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.pool_size == 0 || self.pool_size > 100 {
            return Err(ValidationError::InvalidPoolSize {
                size: self.pool_size,
            });
        }
        if self.connection_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout {
                setting: "database.connection_timeout_secs",
            });
        }
        Ok(())
    }
}

impl Validate for RemoteConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout {
                setting: "remote.timeout_secs",
            });
        }
        for instance in &self.instances {
            if instance.name.trim().is_empty() {
                return Err(ValidationError::InvalidInstance {
                    name: instance.url.clone(),
                    reason: "name is blank".to_string(),
                });
            }
            if !(instance.url.starts_with("http://") || instance.url.starts_with("https://")) {
                return Err(ValidationError::InvalidInstance {
                    name: instance.name.clone(),
                    reason: format!("url must be http(s), got '{}'", instance.url),
                });
            }
        }
        Ok(())
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidLogLevel {
                level: self.level.clone(),
            });
        }
        Ok(())
    }
}
