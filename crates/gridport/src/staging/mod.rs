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

//! Staging of uploaded workflow archives.
//!
//! [`WorkflowStagingManager`] imports an archive, resolves each of its jobs
//! against the registries through an [`AssetFinder`](crate::finder::AssetFinder),
//! moves the archive into the user's staging directory and records it in the
//! catalogue.

pub mod archive;
mod catalogue;
pub mod error;
mod manager;

pub use crate::config::UnresolvedJobPolicy;
pub use archive::{
    read_workflow_archive, JobDescription, WorkflowDescription, DESCRIPTOR_ENTRY,
    MAX_DESCRIPTOR_BYTES,
};
pub use catalogue::CATALOGUE_FILE;
pub use error::StagingError;
pub use manager::WorkflowStagingManager;
