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

//! # Gridport
//!
//! Gridport keeps a registry of compute resources (clusters and grid
//! endpoints), the applications installed on them and the queues they
//! expose, and stages uploaded workflow archives by resolving every job in
//! the archive against that registry.
//!
//! ## Key Components
//!
//! - [`models`]: `Resource`, `Application`, `Queue`, `Workflow` and `Job`
//! - [`registry`]: the [`ResourceProvider`] contract with in-memory,
//!   XML-file and remote-middleware backends
//! - [`dal`]: the database-backed provider (SQLite through diesel + r2d2)
//! - [`finder`]: resolution of job descriptions to concrete registry assets
//! - [`staging`]: per-user staging area for imported workflow archives
//! - [`config`]: configuration loading with environment substitution
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use gridport::config::ConfigLoader;
//! use gridport::finder::AssetFinder;
//! use gridport::registry::{build_provider, ResourceProvider};
//! use gridport::staging::WorkflowStagingManager;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new().load_config(None)?;
//! let provider = build_provider(&config.registry, &config.database, &config.remote)?;
//! provider.ensure_initialized()?;
//!
//! let staging = WorkflowStagingManager::new(&config.staging, "alice")?;
//! staging.ensure_initialized()?;
//!
//! let finder = AssetFinder::new(vec![provider.as_ref()]);
//! let workflow = staging.import_workflow("upload.zip".as_ref(), &finder)?;
//! println!("staged {} with {} jobs", workflow.id, workflow.jobs.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
#[cfg(feature = "sqlite")]
pub mod dal;
pub mod finder;
pub mod logging;
pub mod models;
pub mod registry;
pub mod staging;
mod xml;

pub use finder::{AssetFinder, SearchCriteria};
pub use models::{
    Application, ApplicationKey, Job, JobBinding, Queue, Resource, ResourceKey, Workflow,
};
pub use registry::{RegistryError, ResourceProvider};
pub use staging::{StagingError, WorkflowStagingManager};
