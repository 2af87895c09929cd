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

//! Reading workflow archives.
//!
//! An archive is a zip file carrying a `workflow.xml` descriptor at its
//! root. Each `<job>` in the descriptor lists `<metadata key="...">`
//! entries; the `gridport.*` keys describe the registry assets the job
//! needs and every other key is ignored. `<parameter name value/>` entries
//! are carried over to the job unchanged.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use super::error::StagingError;
use crate::finder::{CriteriaField, SearchCriteria};

/// Name of the descriptor entry inside an archive.
pub const DESCRIPTOR_ENTRY: &str = "workflow.xml";

/// Largest descriptor accepted, in decompressed bytes.
pub const MAX_DESCRIPTOR_BYTES: u64 = 1024 * 1024;

const METADATA_PREFIX: &str = "gridport.";

#[derive(Debug, Deserialize)]
struct DescriptorXml {
    #[serde(rename = "@name", default)]
    name: Option<String>,
    #[serde(rename = "job", default)]
    jobs: Vec<JobXml>,
}

#[derive(Debug, Deserialize)]
struct JobXml {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "metadata", default)]
    metadata: Vec<MetadataXml>,
    #[serde(rename = "parameter", default)]
    parameters: Vec<ParameterXml>,
}

#[derive(Debug, Deserialize)]
struct MetadataXml {
    #[serde(rename = "@key")]
    key: String,
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct ParameterXml {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@value", default)]
    value: String,
}

/// A job as described by the archive, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescription {
    pub name: String,
    pub criteria: SearchCriteria,
    pub parameters: BTreeMap<String, String>,
}

/// Everything read from an archive's descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowDescription {
    pub name: String,
    pub jobs: Vec<JobDescription>,
}

/// Open `path` as a zip archive and read its descriptor.
///
/// The workflow name falls back to the archive's file stem when the
/// descriptor does not carry one.
pub fn read_workflow_archive(path: &Path) -> Result<WorkflowDescription, StagingError> {
    let file = File::open(path).map_err(|e| StagingError::io(path, e))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| StagingError::invalid_workflow(path, format!("not a zip archive: {}", e)))?;

    let mut entry = match archive.by_name(DESCRIPTOR_ENTRY) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            return Err(StagingError::invalid_workflow(
                path,
                format!("archive has no {} descriptor", DESCRIPTOR_ENTRY),
            ))
        }
        Err(e) => return Err(StagingError::invalid_workflow(path, e.to_string())),
    };

    let mut xml = String::new();
    entry
        .by_ref()
        .take(MAX_DESCRIPTOR_BYTES + 1)
        .read_to_string(&mut xml)
        .map_err(|e| StagingError::invalid_workflow(path, format!("unreadable descriptor: {}", e)))?;
    if xml.len() as u64 > MAX_DESCRIPTOR_BYTES {
        return Err(StagingError::invalid_workflow(
            path,
            format!("{} exceeds {} bytes", DESCRIPTOR_ENTRY, MAX_DESCRIPTOR_BYTES),
        ));
    }

    let fallback = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("workflow");
    parse_descriptor(&xml, fallback).map_err(|reason| StagingError::invalid_workflow(path, reason))
}

/// Parse descriptor XML. Errors are human-readable reasons.
pub fn parse_descriptor(xml: &str, fallback_name: &str) -> Result<WorkflowDescription, String> {
    let descriptor: DescriptorXml =
        quick_xml::de::from_str(xml).map_err(|e| format!("malformed descriptor: {}", e))?;

    let name = descriptor
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(fallback_name)
        .to_string();

    let mut jobs = Vec::with_capacity(descriptor.jobs.len());
    for (index, job) in descriptor.jobs.into_iter().enumerate() {
        let job_name = job.name.trim();
        if job_name.is_empty() {
            return Err(format!("job #{} has no name", index + 1));
        }

        let mut criteria = SearchCriteria::builder();
        for metadata in &job.metadata {
            if !metadata.key.trim().starts_with(METADATA_PREFIX) {
                continue;
            }
            match CriteriaField::from_metadata_key(&metadata.key) {
                Some(field) => criteria = criteria.set(field, &metadata.value),
                None => debug!("Ignoring unknown metadata key {} on job {}", metadata.key, job_name),
            }
        }

        let parameters = job
            .parameters
            .into_iter()
            .map(|p| (p.name.trim().to_string(), p.value))
            .filter(|(name, _)| !name.is_empty())
            .collect();

        jobs.push(JobDescription {
            name: job_name.to_string(),
            criteria: criteria.build(),
            parameters,
        });
    }

    debug!("Descriptor for {} lists {} jobs", name, jobs.len());
    Ok(WorkflowDescription { name, jobs })
}
