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

//! Database-backed registry.
//!
//! Resources, applications and queues live in three tables and are read and
//! written through a [`CallSet`] of named SQL calls, so a deployment can
//! point individual calls at its own views or procedures without touching
//! the provider.

mod calls;
mod sqlite;

pub use calls::{names, CallSet, Param};
pub use sqlite::DatabaseResourceProvider;

pub(crate) use calls::{map_database_error, Call};

use crate::registry::RegistryError;

/// Failures to begin or commit a transaction. Failures of individual calls
/// are mapped with their entity before they reach this conversion.
impl From<diesel::result::Error> for RegistryError {
    fn from(err: diesel::result::Error) -> Self {
        RegistryError::persistence("database transaction", err)
    }
}
