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

use super::require_non_blank;
use super::resource::ResourceKey;
use crate::registry::error::{EntityKind, RegistryError};

/// A scheduling queue exposed by a resource. Queues order by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Queue {
    name: String,
    owner: Option<ResourceKey>,
}

impl Queue {
    pub fn new(name: impl AsRef<str>) -> Result<Self, RegistryError> {
        Ok(Self {
            name: require_non_blank(EntityKind::Queue, "name", name)?,
            owner: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl AsRef<str>) -> Result<(), RegistryError> {
        self.name = require_non_blank(EntityKind::Queue, "name", name)?;
        Ok(())
    }

    pub fn owner(&self) -> Option<&ResourceKey> {
        self.owner.as_ref()
    }

    pub(crate) fn set_owner(&mut self, owner: Option<ResourceKey>) {
        self.owner = owner;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queues_sort_by_name() {
        let mut queues = vec![
            Queue::new("long").unwrap(),
            Queue::new("batch").unwrap(),
            Queue::new("debug").unwrap(),
        ];
        queues.sort();
        let names: Vec<&str> = queues.iter().map(|q| q.name()).collect();
        assert_eq!(names, vec!["batch", "debug", "long"]);
    }

    #[test]
    fn test_blank_name_rejected() {
        assert!(Queue::new("").unwrap_err().is_invalid_input());
    }
}
