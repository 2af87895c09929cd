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

//! Importing, saving and deleting staged workflows.

use std::fs;

use gridport::config::{StagingConfig, UnresolvedJobPolicy};
use gridport::registry::MemoryResourceProvider;
use gridport::staging::CATALOGUE_FILE;
use gridport::{AssetFinder, RegistryError, StagingError, WorkflowStagingManager};
use tempfile::TempDir;

use crate::fixtures::{cluster_a, file_names, write_archive, write_workflow_archive, SIM_DESCRIPTOR};

struct Setup {
    temp_dir: TempDir,
    registry: MemoryResourceProvider,
}

impl Setup {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
            registry: MemoryResourceProvider::with_resources(vec![cluster_a()]).unwrap(),
        }
    }

    fn config(&self) -> StagingConfig {
        StagingConfig {
            root: self.temp_dir.path().join("staging"),
            unresolved_jobs: UnresolvedJobPolicy::Reject,
        }
    }

    fn manager(&self) -> WorkflowStagingManager {
        let manager = WorkflowStagingManager::new(&self.config(), "alice").unwrap();
        manager.ensure_initialized().unwrap();
        manager
    }

    fn finder(&self) -> AssetFinder<'_> {
        AssetFinder::new(vec![&self.registry])
    }

    fn upload(&self, name: &str, descriptor: &str) -> std::path::PathBuf {
        let uploads = self.temp_dir.path().join("uploads");
        fs::create_dir_all(&uploads).unwrap();
        let path = uploads.join(name);
        write_workflow_archive(&path, descriptor);
        path
    }
}

#[test]
fn test_import_binds_job_and_stages_archive() {
    let setup = Setup::new();
    let manager = setup.manager();
    let upload = setup.upload("flow.zip", SIM_DESCRIPTOR);

    let workflow = manager.import_workflow(&upload, &setup.finder()).unwrap();

    assert_eq!(workflow.name, "My flow");
    assert_eq!(workflow.id.len(), 17);
    assert!(workflow.id.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(workflow.location, manager.archive_path(&workflow.id));
    assert!(workflow.location.exists());
    assert!(!upload.exists());

    let job = &workflow.jobs[0];
    let binding = job.binding.as_ref().expect("job is bound");
    assert_eq!(binding.resource().key().to_string(), "moab/clusterA");
    assert_eq!(binding.application().name(), "sim");
    assert_eq!(binding.application().version(), "1.0");
    assert_eq!(binding.application().path(), "/bin/sim");
    assert_eq!(binding.queue().map(|q| q.name()), Some("batch"));
    assert_eq!(job.resource_type(), Some("moab"));
    assert_eq!(job.parameters.get("walltime").map(String::as_str), Some("01:00:00"));

    assert!(manager.contains_workflow(&workflow.id).unwrap());
    assert_eq!(manager.get_workflow(&workflow.id).unwrap(), Some(workflow));
}

#[test]
fn test_catalogue_survives_restart_without_jobs() {
    let setup = Setup::new();
    let workflow = setup
        .manager()
        .import_workflow(&setup.upload("flow.zip", SIM_DESCRIPTOR), &setup.finder())
        .unwrap();

    let reopened = setup.manager();
    let reloaded = reopened.get_workflow(&workflow.id).unwrap().unwrap();
    assert_eq!(reloaded.name, workflow.name);
    assert_eq!(reloaded.location, workflow.location);
    assert_eq!(reloaded.imported_at, workflow.imported_at);
    assert!(reloaded.jobs.is_empty());

    let raw = fs::read_to_string(reopened.catalogue_path()).unwrap();
    assert!(raw.contains(&format!("id=\"{}\"", workflow.id)));
}

#[test]
fn test_missing_descriptor_leaves_staging_untouched() {
    let setup = Setup::new();
    let manager = setup.manager();
    let upload = setup.temp_dir.path().join("broken.zip");
    write_archive(&upload, &[("README.md", "no descriptor here")]);
    let before = file_names(manager.staging_dir());

    let err = manager.import_workflow(&upload, &setup.finder()).unwrap_err();

    assert!(matches!(err, StagingError::InvalidWorkflow { .. }));
    assert!(upload.exists());
    assert_eq!(file_names(manager.staging_dir()), before);
    assert!(manager.get_workflows().unwrap().is_empty());
}

#[test]
fn test_unresolvable_job_rejects_whole_import() {
    let setup = Setup::new();
    let manager = setup.manager();
    let upload = setup.upload("flow.zip", &SIM_DESCRIPTOR.replace(">1.0<", ">9.9<"));

    let err = manager.import_workflow(&upload, &setup.finder()).unwrap_err();

    assert!(matches!(err, StagingError::Registry(RegistryError::NotFound { .. })));
    assert!(upload.exists());
    assert!(!manager.catalogue_path().exists());
}

#[test]
fn test_keep_unbound_policy_imports_anyway() {
    let setup = Setup::new();
    let config = StagingConfig {
        unresolved_jobs: UnresolvedJobPolicy::KeepUnbound,
        ..setup.config()
    };
    let manager = WorkflowStagingManager::new(&config, "alice").unwrap();
    let upload = setup.upload("flow.zip", &SIM_DESCRIPTOR.replace(">batch<", ">express<"));

    let workflow = manager.import_workflow(&upload, &setup.finder()).unwrap();
    assert_eq!(workflow.unbound_jobs().count(), 1);
    assert_eq!(workflow.bound_jobs().count(), 0);
}

#[test]
fn test_back_to_back_imports_get_distinct_ids() {
    let setup = Setup::new();
    let manager = setup.manager();

    let mut ids = Vec::new();
    for i in 0..5 {
        let upload = setup.upload(&format!("flow{}.zip", i), SIM_DESCRIPTOR);
        ids.push(manager.import_workflow(&upload, &setup.finder()).unwrap().id);
    }
    let listed: Vec<String> = manager.get_workflows().unwrap().into_iter().map(|w| w.id).collect();

    let mut sorted = ids.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), 5);
    assert_eq!(listed, sorted);
}

#[test]
fn test_save_relocation_removes_old_archive() {
    let setup = Setup::new();
    let manager = setup.manager();
    let mut workflow = manager
        .import_workflow(&setup.upload("flow.zip", SIM_DESCRIPTOR), &setup.finder())
        .unwrap();
    let original = workflow.location.clone();

    let relocated = manager.staging_dir().join("renamed.zip");
    fs::copy(&original, &relocated).unwrap();
    workflow.name = "Renamed flow".to_string();
    workflow.relocate(relocated.clone());
    manager.save_workflow(workflow.clone()).unwrap();

    assert!(!original.exists());
    assert!(relocated.exists());
    let stored = manager.get_workflow(&workflow.id).unwrap().unwrap();
    assert_eq!(stored.name, "Renamed flow");
    assert_eq!(stored.location, relocated);
    assert_eq!(stored.previous_location, None);

    let raw = fs::read_to_string(manager.catalogue_path()).unwrap();
    assert!(raw.contains("renamed.zip"));
}

#[test]
fn test_save_unknown_workflow_is_not_found() {
    let setup = Setup::new();
    let manager = setup.manager();
    let mut workflow = manager
        .import_workflow(&setup.upload("flow.zip", SIM_DESCRIPTOR), &setup.finder())
        .unwrap();
    workflow.id = "19700101000000000".to_string();

    assert!(matches!(
        manager.save_workflow(workflow),
        Err(StagingError::NotFound { .. })
    ));
}

#[test]
fn test_delete_removes_archive_and_entry() {
    let setup = Setup::new();
    let manager = setup.manager();
    let workflow = manager
        .import_workflow(&setup.upload("flow.zip", SIM_DESCRIPTOR), &setup.finder())
        .unwrap();

    let removed = manager.delete_workflow(&workflow.id).unwrap();
    assert_eq!(removed.id, workflow.id);
    assert!(!workflow.location.exists());
    assert!(!manager.contains_workflow(&workflow.id).unwrap());
    assert_eq!(file_names(manager.staging_dir()), vec![CATALOGUE_FILE.to_string()]);

    assert!(setup.manager().get_workflows().unwrap().is_empty());
}

#[test]
fn test_delete_tolerates_missing_archive() {
    let setup = Setup::new();
    let manager = setup.manager();
    let workflow = manager
        .import_workflow(&setup.upload("flow.zip", SIM_DESCRIPTOR), &setup.finder())
        .unwrap();
    fs::remove_file(&workflow.location).unwrap();

    manager.delete_workflow(&workflow.id).unwrap();
    assert!(manager.get_workflows().unwrap().is_empty());
}

#[test]
fn test_users_are_isolated() {
    let setup = Setup::new();
    let alice = setup.manager();
    let bob = WorkflowStagingManager::new(&setup.config(), "bob").unwrap();

    alice
        .import_workflow(&setup.upload("flow.zip", SIM_DESCRIPTOR), &setup.finder())
        .unwrap();

    assert_eq!(alice.get_workflows().unwrap().len(), 1);
    assert!(bob.get_workflows().unwrap().is_empty());
    assert_ne!(alice.staging_dir(), bob.staging_dir());
}
