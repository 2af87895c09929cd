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

//! The resource registry: the [`ResourceProvider`] contract and its
//! in-process and remote implementations.
//!
//! The database-backed provider lives in [`crate::dal`]. Use
//! [`build_provider`] to get whichever backend the configuration selects.

pub mod error;
pub mod factory;
pub mod file;
pub mod memory;
pub mod remote;
pub(crate) mod resource_map;
pub mod traits;

pub use error::{EntityKind, RegistryError};
pub use factory::build_provider;
pub use file::FileResourceProvider;
pub use memory::MemoryResourceProvider;
#[cfg(feature = "remote")]
pub use remote::HttpMiddlewareClient;
pub use remote::{MiddlewareClient, MiddlewareInstance, RemoteResourceProvider, PATH_NOT_AVAILABLE};
pub use traits::ResourceProvider;
