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

//! Applications installed on a resource.

use std::fmt;

use super::require_non_blank;
use super::resource::ResourceKey;
use crate::registry::error::{EntityKind, RegistryError};

/// Identity of an application within its owning resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApplicationKey {
    pub name: String,
    pub version: String,
    pub path: String,
}

impl ApplicationKey {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for ApplicationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.name, self.version, self.path)
    }
}

/// An executable entry owned by exactly one [`Resource`](super::Resource).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    key: ApplicationKey,
    description: String,
    owner: Option<ResourceKey>,
}

impl Application {
    /// Create an application. Name, version and path are trimmed and must
    /// not be blank.
    pub fn new(
        name: impl AsRef<str>,
        version: impl AsRef<str>,
        path: impl AsRef<str>,
    ) -> Result<Self, RegistryError> {
        Ok(Self {
            key: ApplicationKey {
                name: require_non_blank(EntityKind::Application, "name", name)?,
                version: require_non_blank(EntityKind::Application, "version", version)?,
                path: require_non_blank(EntityKind::Application, "path", path)?,
            },
            description: String::new(),
            owner: None,
        })
    }

    pub fn with_description(mut self, description: impl AsRef<str>) -> Self {
        self.set_description(description);
        self
    }

    pub fn key(&self) -> &ApplicationKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn version(&self) -> &str {
        &self.key.version
    }

    pub fn path(&self) -> &str {
        &self.key.path
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Key of the resource this application belongs to, if it has been
    /// added to one.
    pub fn owner(&self) -> Option<&ResourceKey> {
        self.owner.as_ref()
    }

    pub fn set_name(&mut self, name: impl AsRef<str>) -> Result<(), RegistryError> {
        self.key.name = require_non_blank(EntityKind::Application, "name", name)?;
        Ok(())
    }

    pub fn set_version(&mut self, version: impl AsRef<str>) -> Result<(), RegistryError> {
        self.key.version = require_non_blank(EntityKind::Application, "version", version)?;
        Ok(())
    }

    pub fn set_path(&mut self, path: impl AsRef<str>) -> Result<(), RegistryError> {
        self.key.path = require_non_blank(EntityKind::Application, "path", path)?;
        Ok(())
    }

    pub fn set_description(&mut self, description: impl AsRef<str>) {
        self.description = description.as_ref().trim().to_string();
    }

    pub(crate) fn set_owner(&mut self, owner: Option<ResourceKey>) {
        self.owner = owner;
    }
}
