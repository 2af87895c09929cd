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

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::archive::{read_workflow_archive, JobDescription};
use super::catalogue::{read_catalogue, write_catalogue, CATALOGUE_FILE};
use super::error::StagingError;
use crate::config::{StagingConfig, UnresolvedJobPolicy};
use crate::finder::AssetFinder;
use crate::models::{Job, Workflow};
use crate::registry::{EntityKind, RegistryError};

const ID_FORMAT: &str = "%Y%m%d%H%M%S%3f";

#[derive(Debug, Default)]
struct StagingState {
    workflows: BTreeMap<String, Workflow>,
    initialized: bool,
}

/// Per-user staging area for imported workflow archives.
///
/// Staged archives live in `<root>/<user>/<id>.zip`, next to the catalogue
/// `workflows.xml`. One reader/writer lock covers the catalogue and the
/// files it points at, so a reader never sees an entry whose archive has
/// not been moved into place yet.
#[derive(Debug)]
pub struct WorkflowStagingManager {
    user: String,
    staging_dir: PathBuf,
    catalogue_path: PathBuf,
    policy: UnresolvedJobPolicy,
    state: RwLock<StagingState>,
}

impl WorkflowStagingManager {
    pub fn new(config: &StagingConfig, user: &str) -> Result<Self, StagingError> {
        let user = validate_user(user)?;
        let staging_dir = config.root.join(&user);
        Ok(Self {
            catalogue_path: staging_dir.join(CATALOGUE_FILE),
            staging_dir,
            user,
            policy: config.unresolved_jobs,
            state: RwLock::new(StagingState::default()),
        })
    }

    pub fn with_policy(mut self, policy: UnresolvedJobPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn policy(&self) -> UnresolvedJobPolicy {
        self.policy
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn catalogue_path(&self) -> &Path {
        &self.catalogue_path
    }

    /// Where the archive of workflow `id` is kept once staged.
    pub fn archive_path(&self, id: &str) -> PathBuf {
        self.staging_dir.join(format!("{}.zip", id))
    }

    pub fn needs_init(&self) -> bool {
        !self.state.read().initialized
    }

    /// Create the staging directory and load the catalogue. Idempotent.
    pub fn init(&self) -> Result<(), StagingError> {
        let mut state = self.state.write();
        if state.initialized {
            return Ok(());
        }

        fs::create_dir_all(&self.staging_dir).map_err(|e| StagingError::io(&self.staging_dir, e))?;
        let workflows = read_catalogue(&self.catalogue_path)?;
        info!(
            "Loaded {} staged workflows for {} from {}",
            workflows.len(),
            self.user,
            self.catalogue_path.display()
        );
        state.workflows = workflows;
        state.initialized = true;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<(), StagingError> {
        if self.needs_init() {
            self.init()?;
        }
        Ok(())
    }

    /// Import the archive at `archive`, resolving every job with `finder`.
    ///
    /// On success the archive has been moved into the staging directory
    /// and the catalogue persisted. On failure nothing has moved: the
    /// archive stays where it was and the catalogue is unchanged.
    ///
    /// # Errors
    ///
    /// * `InvalidWorkflow` - not a zip, no `workflow.xml`, or a malformed descriptor
    /// * `Registry` - a job could not be resolved under the `Reject` policy,
    ///   or a registry failed during resolution
    /// * `Io` / `Catalogue` - the archive could not be moved or the catalogue written
    pub fn import_workflow(&self, archive: &Path, finder: &AssetFinder<'_>) -> Result<Workflow, StagingError> {
        self.ensure_initialized()?;

        let description = read_workflow_archive(archive)?;
        let mut jobs = Vec::with_capacity(description.jobs.len());
        for job in description.jobs {
            jobs.push(self.resolve_job(job, finder)?);
        }

        let mut state = self.state.write();
        let imported_at = unique_timestamp(Utc::now(), &state.workflows);
        let id = imported_at.format(ID_FORMAT).to_string();
        let location = self.archive_path(&id);

        move_file(archive, &location)?;

        let workflow = Workflow {
            id: id.clone(),
            name: description.name,
            location: location.clone(),
            previous_location: None,
            imported_at,
            jobs,
        };
        state.workflows.insert(id.clone(), workflow.clone());

        if let Err(e) = write_catalogue(&self.catalogue_path, &state.workflows) {
            state.workflows.remove(&id);
            if let Err(undo) = move_file(&location, archive) {
                warn!(
                    "Could not return {} to {} after failed import: {}",
                    location.display(),
                    archive.display(),
                    undo
                );
            }
            return Err(e);
        }

        info!(
            "Imported workflow '{}' as {} for {} ({} jobs, {} unbound)",
            workflow.name,
            workflow.id,
            self.user,
            workflow.jobs.len(),
            workflow.unbound_jobs().count()
        );
        Ok(workflow)
    }

    fn resolve_job(&self, description: JobDescription, finder: &AssetFinder<'_>) -> Result<Job, StagingError> {
        let mut job = Job::new(&description.name);
        job.parameters = description.parameters;

        let resolved = if description.criteria.is_unconstrained() {
            Err(RegistryError::NotFound {
                entity: EntityKind::Job,
                key: format!("{} carries no gridport metadata", description.name),
            })
        } else {
            finder.resolve(&description.criteria)
        };

        match resolved {
            Ok(binding) => {
                debug!("Job {} bound to {}", job.name, binding.resource().key());
                job.bind(binding);
            }
            Err(e) if e.is_not_found() && self.policy == UnresolvedJobPolicy::KeepUnbound => {
                warn!("Keeping job {} unbound: {}", job.name, e);
            }
            Err(e) => return Err(e.into()),
        }
        Ok(job)
    }

    /// Snapshot of all staged workflows, ordered by id.
    pub fn get_workflows(&self) -> Result<Vec<Workflow>, StagingError> {
        self.ensure_initialized()?;
        Ok(self.state.read().workflows.values().cloned().collect())
    }

    pub fn get_workflow(&self, id: &str) -> Result<Option<Workflow>, StagingError> {
        self.ensure_initialized()?;
        Ok(self.state.read().workflows.get(id).cloned())
    }

    pub fn contains_workflow(&self, id: &str) -> Result<bool, StagingError> {
        self.ensure_initialized()?;
        Ok(self.state.read().workflows.contains_key(id))
    }

    /// Replace the stored workflow with the same id and persist the catalogue.
    ///
    /// Archive files the workflow no longer points at (the stored location
    /// when it changed, and any recorded previous location) are deleted once
    /// the catalogue is written. A file that cannot be deleted stays
    /// recorded as the previous location, so a later save or delete
    /// retries it.
    pub fn save_workflow(&self, mut workflow: Workflow) -> Result<(), StagingError> {
        self.ensure_initialized()?;

        let mut state = self.state.write();
        let Some(existing) = state.workflows.get(&workflow.id) else {
            return Err(StagingError::NotFound { id: workflow.id });
        };

        let candidates = [
            Some(existing.location.clone()),
            existing.previous_location.clone(),
            workflow.previous_location.take(),
        ];
        let mut stale: Vec<PathBuf> = Vec::new();
        for candidate in candidates.into_iter().flatten() {
            if candidate != workflow.location && !stale.contains(&candidate) {
                stale.push(candidate);
            }
        }
        workflow.previous_location = stale.first().cloned();

        let id = workflow.id.clone();
        let replaced = state.workflows.insert(id.clone(), workflow);
        if let Err(e) = write_catalogue(&self.catalogue_path, &state.workflows) {
            if let Some(replaced) = replaced {
                state.workflows.insert(id, replaced);
            }
            return Err(e);
        }

        let mut leftover = None;
        for path in &stale {
            if let Err(e) = remove_if_present(path) {
                warn!("Could not remove stale archive of workflow {}: {}", id, e);
                leftover.get_or_insert_with(|| path.clone());
            }
        }

        if let Some(stored) = state.workflows.get_mut(&id) {
            if stored.previous_location != leftover {
                stored.previous_location = leftover;
                if let Err(e) = write_catalogue(&self.catalogue_path, &state.workflows) {
                    warn!("Could not record cleanup of workflow {}: {}", id, e);
                }
            }
        }
        debug!("Saved workflow {} for {}", id, self.user);
        Ok(())
    }

    /// Remove a workflow, its staged archive and any previous archive.
    ///
    /// The catalogue is written first; archives that cannot be deleted
    /// afterwards are logged and left on disk.
    pub fn delete_workflow(&self, id: &str) -> Result<Workflow, StagingError> {
        self.ensure_initialized()?;

        let mut state = self.state.write();
        let removed = state
            .workflows
            .remove(id)
            .ok_or_else(|| StagingError::NotFound { id: id.to_string() })?;
        if let Err(e) = write_catalogue(&self.catalogue_path, &state.workflows) {
            state.workflows.insert(id.to_string(), removed);
            return Err(e);
        }

        for path in std::iter::once(&removed.location).chain(removed.previous_location.as_ref()) {
            if let Err(e) = remove_if_present(path) {
                warn!("Could not remove archive of deleted workflow {}: {}", id, e);
            }
        }

        info!("Deleted workflow {} for {}", id, self.user);
        Ok(removed)
    }

    /// Write the catalogue as it is now.
    pub fn commit_changes(&self) -> Result<(), StagingError> {
        self.ensure_initialized()?;
        let state = self.state.write();
        write_catalogue(&self.catalogue_path, &state.workflows)?;
        debug!(
            "Committed {} staged workflows to {}",
            state.workflows.len(),
            self.catalogue_path.display()
        );
        Ok(())
    }
}

fn validate_user(user: &str) -> Result<String, StagingError> {
    let trimmed = user.trim();
    let reason = if trimmed.is_empty() {
        Some("user name is blank")
    } else if trimmed == "." || trimmed == ".." {
        Some("user name cannot be a relative directory")
    } else if trimmed.contains(['/', '\\']) {
        Some("user name cannot contain path separators")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StagingError::InvalidUser {
            user: user.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(trimmed.to_string()),
    }
}

/// `now`, bumped a millisecond at a time until its id is not yet taken.
fn unique_timestamp(now: DateTime<Utc>, taken: &BTreeMap<String, Workflow>) -> DateTime<Utc> {
    let mut candidate = now;
    while taken.contains_key(&candidate.format(ID_FORMAT).to_string()) {
        candidate += Duration::milliseconds(1);
    }
    candidate
}

/// Rename `from` to `to`, copying and removing when a rename is not possible
/// (for instance across filesystems).
fn move_file(from: &Path, to: &Path) -> Result<(), StagingError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| StagingError::io(parent, e))?;
    }
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    fs::copy(from, to).map_err(|e| StagingError::io(from, e))?;
    if let Err(e) = fs::remove_file(from) {
        warn!("Copied {} but could not remove it: {}", from.display(), e);
    }
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<(), StagingError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed staged archive {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StagingError::io(path, e)),
    }
}
