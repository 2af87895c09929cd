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

//! A host wiring everything up from a configuration file.

use std::fs;

use gridport::config::{
    ConfigError, ConfigLoader, GridportConfig, RegistryBackend, ValidationError,
};
use gridport::registry::build_provider;
use gridport::{AssetFinder, ResourceProvider, WorkflowStagingManager};
use tempfile::TempDir;

use crate::fixtures::{cluster_a, write_workflow_archive, SIM_DESCRIPTOR};

fn write_config(temp_dir: &TempDir, registry: &str) -> std::path::PathBuf {
    let path = temp_dir.path().join("gridport.toml");
    let root = temp_dir.path().display();
    fs::write(
        &path,
        format!(
            r#"
[registry]
{registry}

[database]
url = "sqlite://{root}/registry.db"
pool_size = 2

[staging]
root = "{root}/staging"

[logging]
level = "debug"
"#
        ),
    )
    .unwrap();
    path
}

#[test]
fn test_file_backed_host_flow() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let registry_path = temp_dir.path().join("resources.xml");
    let config_path = write_config(
        &temp_dir,
        &format!(
            "backend = \"file\"\npath = \"{}\"",
            registry_path.display()
        ),
    );

    let config = ConfigLoader::new().load_config(Some(config_path.as_path()))?;
    assert_eq!(config.registry.backend, RegistryBackend::File);

    let provider = build_provider(&config.registry, &config.database, &config.remote)?;
    provider.ensure_initialized()?;
    provider.add_resource(cluster_a())?;
    provider.commit_changes()?;
    assert!(registry_path.exists());

    let staging = WorkflowStagingManager::new(&config.staging, "alice")?;
    let upload = temp_dir.path().join("upload.zip");
    write_workflow_archive(&upload, SIM_DESCRIPTOR);

    let finder = AssetFinder::new(vec![provider.as_ref()]);
    let workflow = staging.import_workflow(&upload, &finder)?;
    assert_eq!(workflow.bound_jobs().count(), 1);
    assert!(workflow
        .location
        .starts_with(temp_dir.path().join("staging").join("alice")));
    Ok(())
}

#[test]
fn test_database_backed_host_flow() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, "backend = \"database\"");

    let config = ConfigLoader::new().load_config(Some(config_path.as_path())).unwrap();
    let provider = build_provider(&config.registry, &config.database, &config.remote).unwrap();
    assert_eq!(provider.name(), "database");
    assert!(provider.needs_init());

    provider.ensure_initialized().unwrap();
    provider.add_resource(cluster_a()).unwrap();
    assert!(temp_dir.path().join("registry.db").exists());

    let err = provider.add_resource(cluster_a()).unwrap_err();
    assert!(err.is_duplicate());
}

#[test]
fn test_incomplete_config_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("gridport.toml");
    fs::write(&path, "[registry]\nbackend = \"database\"\n").unwrap();

    let err = ConfigLoader::new()
        .load_config(Some(path.as_path()))
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::ValidationError(ValidationError::MissingSetting { key: "url", .. })
    ));

    let mut config = GridportConfig::default();
    config.registry.backend = RegistryBackend::Database;
    assert!(build_provider(&config.registry, &config.database, &config.remote).is_err());
}
