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

//! The per-user catalogue of staged workflows (`workflows.xml`).
//!
//! Only the workflow header is persisted. Jobs exist in memory for as long
//! as the manager that imported them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::error::StagingError;
use crate::models::Workflow;
use crate::xml::{read_document, write_document};

pub const CATALOGUE_FILE: &str = "workflows.xml";

const ROOT_ELEMENT: &str = "workflows";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogueDocument {
    #[serde(rename = "workflow", default)]
    workflows: Vec<WorkflowEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WorkflowEntry {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@location")]
    location: PathBuf,
    #[serde(
        rename = "@previous-location",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    previous_location: Option<PathBuf>,
    #[serde(rename = "@imported-at")]
    imported_at: DateTime<Utc>,
}

impl From<&Workflow> for WorkflowEntry {
    fn from(workflow: &Workflow) -> Self {
        Self {
            id: workflow.id.clone(),
            name: workflow.name.clone(),
            location: workflow.location.clone(),
            previous_location: workflow.previous_location.clone(),
            imported_at: workflow.imported_at,
        }
    }
}

impl From<WorkflowEntry> for Workflow {
    fn from(entry: WorkflowEntry) -> Self {
        Workflow {
            id: entry.id,
            name: entry.name,
            location: entry.location,
            previous_location: entry.previous_location,
            imported_at: entry.imported_at,
            jobs: Vec::new(),
        }
    }
}

/// Load the catalogue at `path`. A missing file is an empty catalogue.
pub(crate) fn read_catalogue(path: &Path) -> Result<BTreeMap<String, Workflow>, StagingError> {
    let document: CatalogueDocument = read_document(path)
        .map_err(|e| catalogue_error(path, e))?
        .unwrap_or_default();

    let mut workflows = BTreeMap::new();
    for entry in document.workflows {
        if workflows.contains_key(&entry.id) {
            return Err(catalogue_error(path, format!("duplicate workflow id {}", entry.id)));
        }
        workflows.insert(entry.id.clone(), Workflow::from(entry));
    }
    Ok(workflows)
}

pub(crate) fn write_catalogue(
    path: &Path,
    workflows: &BTreeMap<String, Workflow>,
) -> Result<(), StagingError> {
    let document = CatalogueDocument {
        workflows: workflows.values().map(WorkflowEntry::from).collect(),
    };
    write_document(path, ROOT_ELEMENT, &document).map_err(|e| catalogue_error(path, e))
}

fn catalogue_error(path: &Path, reason: impl ToString) -> StagingError {
    StagingError::Catalogue {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
