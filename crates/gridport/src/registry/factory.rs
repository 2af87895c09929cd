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

//! Selects and builds the registry backend named in the configuration.

use tracing::info;

use super::file::FileResourceProvider;
use super::memory::MemoryResourceProvider;
use super::traits::ResourceProvider;
use crate::config::{
    require_backend_settings, ConfigError, DatabaseConfig, RegistryBackend, RegistryConfig,
    RemoteConfig,
};

/// Build the provider selected by `registry.backend`.
///
/// The returned provider is not initialized yet; call
/// [`ensure_initialized`](ResourceProvider::ensure_initialized) before use.
///
/// # Errors
///
/// * `ValidationError` - a setting the backend needs is missing
/// * `BackendUnavailable` - the backend was compiled out
pub fn build_provider(
    registry: &RegistryConfig,
    database: &DatabaseConfig,
    remote: &RemoteConfig,
) -> Result<Box<dyn ResourceProvider>, ConfigError> {
    require_backend_settings(registry, database, remote)?;

    let provider: Box<dyn ResourceProvider> = match registry.backend {
        RegistryBackend::Memory => Box::new(MemoryResourceProvider::new()),
        RegistryBackend::File => {
            // Presence checked by require_backend_settings.
            let path = registry.path.clone().unwrap_or_default();
            Box::new(FileResourceProvider::new(path))
        }
        RegistryBackend::Database => build_database(database)?,
        RegistryBackend::Remote => build_remote(remote)?,
    };

    info!("Using {} registry backend", provider.name());
    Ok(provider)
}

#[cfg(feature = "sqlite")]
fn build_database(database: &DatabaseConfig) -> Result<Box<dyn ResourceProvider>, ConfigError> {
    use crate::dal::{CallSet, DatabaseResourceProvider};

    let calls = CallSet::default().with_overrides(&database.calls)?;
    let url = database.url.clone().unwrap_or_default();
    Ok(Box::new(
        DatabaseResourceProvider::new(url)
            .with_pool_size(database.pool_size)
            .with_connection_timeout(std::time::Duration::from_secs(
                database.connection_timeout_secs,
            ))
            .with_calls(calls),
    ))
}

#[cfg(not(feature = "sqlite"))]
fn build_database(_database: &DatabaseConfig) -> Result<Box<dyn ResourceProvider>, ConfigError> {
    Err(ConfigError::BackendUnavailable {
        backend: "database",
        feature: "sqlite",
    })
}

#[cfg(feature = "remote")]
fn build_remote(remote: &RemoteConfig) -> Result<Box<dyn ResourceProvider>, ConfigError> {
    use super::remote::{HttpMiddlewareClient, MiddlewareInstance, RemoteResourceProvider};

    let client = HttpMiddlewareClient::new(std::time::Duration::from_secs(remote.timeout_secs))
        .map_err(|e| ConfigError::BackendSetup(e.to_string()))?;
    let instances = remote
        .instances
        .iter()
        .map(|instance| MiddlewareInstance {
            name: instance.name.clone(),
            url: instance.url.clone(),
        })
        .collect();
    Ok(Box::new(RemoteResourceProvider::new(
        instances,
        Box::new(client),
    )))
}

#[cfg(not(feature = "remote"))]
fn build_remote(_remote: &RemoteConfig) -> Result<Box<dyn ResourceProvider>, ConfigError> {
    Err(ConfigError::BackendUnavailable {
        backend: "remote",
        feature: "remote",
    })
}
