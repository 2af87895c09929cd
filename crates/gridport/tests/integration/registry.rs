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

//! Behaviour every editable registry backend shares.

use gridport::dal::DatabaseResourceProvider;
use gridport::registry::FileResourceProvider;
use gridport::{Application, ApplicationKey, RegistryError, Resource, ResourceKey, ResourceProvider};
use tempfile::TempDir;

use crate::fixtures::{cluster_a, editable_providers};

#[test]
fn test_added_resource_reads_back_equal() {
    let temp_dir = TempDir::new().unwrap();
    for provider in editable_providers(&temp_dir) {
        provider.ensure_initialized().unwrap();
        provider.add_resource(cluster_a()).unwrap();

        let stored = provider.get_resource("clusterA", "moab").unwrap();
        assert_eq!(stored, Some(cluster_a()), "backend {}", provider.name());
        assert!(provider
            .contains_resource(&ResourceKey::new("moab", "clusterA"))
            .unwrap());
    }
}

#[test]
fn test_duplicate_add_leaves_registry_unchanged() {
    let temp_dir = TempDir::new().unwrap();
    for provider in editable_providers(&temp_dir) {
        provider.add_resource(cluster_a()).unwrap();
        let before = provider.get_resources().unwrap();

        let err = provider
            .add_resource(Resource::new("moab", "clusterA").unwrap())
            .unwrap_err();
        assert!(err.is_duplicate(), "backend {}: {}", provider.name(), err);
        assert_eq!(provider.get_resources().unwrap(), before);
    }
}

#[test]
fn test_absent_keys_are_not_found() {
    let temp_dir = TempDir::new().unwrap();
    for provider in editable_providers(&temp_dir) {
        let key = ResourceKey::new("pbs", "ghost");
        assert!(provider
            .save_resource(Resource::new("pbs", "ghost").unwrap())
            .unwrap_err()
            .is_not_found());
        assert!(provider.remove_resource(&key).unwrap_err().is_not_found());
        assert_eq!(provider.get_resource("ghost", "pbs").unwrap(), None);
    }
}

#[test]
fn test_foreign_children_are_invalid_input() {
    // An application owned by clusterA cannot be slipped into clusterB.
    let app = cluster_a()
        .application(&ApplicationKey::new("sim", "1.0", "/bin/sim"))
        .cloned()
        .unwrap();
    let mut other = Resource::new("moab", "clusterB").unwrap();
    assert!(other.add_application(app).unwrap_err().is_invalid_input());
    assert_eq!(other.application_count(), 0);
}

#[test]
fn test_versions_are_distinct_applications() {
    let temp_dir = TempDir::new().unwrap();
    for provider in editable_providers(&temp_dir) {
        let mut resource = cluster_a();
        resource
            .add_application(Application::new("sim", "2.0", "/bin/sim").unwrap())
            .unwrap();
        provider.add_resource(resource).unwrap();

        let stored = provider.get_resource("clusterA", "moab").unwrap().unwrap();
        assert_eq!(stored.application_count(), 2, "backend {}", provider.name());
    }
}

#[test]
fn test_snapshots_are_sorted_by_key() {
    let temp_dir = TempDir::new().unwrap();
    for provider in editable_providers(&temp_dir) {
        for (resource_type, name) in [("pbs", "b"), ("moab", "z"), ("moab", "a")] {
            provider
                .add_resource(Resource::new(resource_type, name).unwrap())
                .unwrap();
        }
        let keys: Vec<String> = provider
            .get_resources()
            .unwrap()
            .iter()
            .map(|r| r.key().to_string())
            .collect();
        assert_eq!(keys, ["moab/a", "moab/z", "pbs/b"], "backend {}", provider.name());
    }
}

#[test]
fn test_file_registry_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("resources.xml");

    let first = FileResourceProvider::new(&path);
    first.ensure_initialized().unwrap();
    first.add_resource(cluster_a()).unwrap();
    first
        .add_resource(cluster_a_locked_twin())
        .unwrap();
    first.commit_changes().unwrap();

    let second = FileResourceProvider::new(&path);
    second.ensure_initialized().unwrap();
    assert_eq!(second.get_resources().unwrap(), first.get_resources().unwrap());

    let twin = second.get_resource("clusterA", "pbs").unwrap().unwrap();
    assert!(!twin.applications_editable());
    for app in twin.applications() {
        assert_eq!(app.owner(), Some(twin.key()));
    }
}

#[test]
fn test_uncommitted_file_changes_are_not_persisted() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("resources.xml");

    let first = FileResourceProvider::new(&path);
    first.add_resource(cluster_a()).unwrap();

    let second = FileResourceProvider::new(&path);
    assert!(second.get_resources().unwrap().is_empty());
}

#[test]
fn test_database_registry_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}", temp_dir.path().join("registry.db").display());

    let first = DatabaseResourceProvider::new(url.clone());
    first.add_resource(cluster_a()).unwrap();
    first.add_resource(cluster_a_locked_twin()).unwrap();

    let second = DatabaseResourceProvider::new(url);
    assert_eq!(second.get_resources().unwrap(), first.get_resources().unwrap());
    assert!(!second
        .get_resource("clusterA", "pbs")
        .unwrap()
        .unwrap()
        .applications_editable());
}

#[test]
fn test_locked_resource_rejects_application_changes() {
    let mut twin = cluster_a_locked_twin();
    let err = twin
        .add_application(Application::new("other", "1", "/bin/other").unwrap())
        .unwrap_err();
    assert!(matches!(err, RegistryError::NotEditable { .. }));
    assert_eq!(twin.application_count(), 1);
}

/// pbs/clusterA with sim 1.0 and applications locked.
fn cluster_a_locked_twin() -> Resource {
    let mut resource = Resource::new("pbs", "clusterA").unwrap();
    resource
        .add_application(Application::new("sim", "1.0", "/bin/sim").unwrap())
        .unwrap();
    resource.with_applications_editable(false)
}
