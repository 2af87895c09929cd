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

//! Named SQL calls and the wrapper that runs them.
//!
//! Every store access is one [`Call`]: a template from the [`CallSet`],
//! positional `?` parameters bound before execution, and optionally a
//! per-row callback or a post-call read of the generated row id. Driver
//! errors never leave this module unmapped; see [`map_database_error`].

use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::query_dsl::LoadQuery;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{BigInt, Bool, Nullable, Text};
use diesel::sqlite::{Sqlite, SqliteConnection};
use diesel::{QueryableByName, RunQueryDsl};
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::config::ValidationError;
use crate::registry::{EntityKind, RegistryError};

/// Names of the calls a [`CallSet`] provides.
pub mod names {
    pub const RESOURCES_VIEW_ALL: &str = "resources.view_all";
    pub const RESOURCES_FIND: &str = "resources.find";
    pub const RESOURCES_ADD: &str = "resources.add";
    pub const RESOURCES_UPDATE: &str = "resources.update";
    pub const RESOURCES_DELETE: &str = "resources.delete";
    pub const APPLICATIONS_VIEW_ALL: &str = "applications.view_all";
    pub const APPLICATIONS_VIEW_FOR: &str = "applications.view_for";
    pub const APPLICATIONS_ADD: &str = "applications.add";
    pub const APPLICATIONS_DELETE_FOR: &str = "applications.delete_for";
    pub const QUEUES_VIEW_ALL: &str = "queues.view_all";
    pub const QUEUES_VIEW_FOR: &str = "queues.view_for";
    pub const QUEUES_ADD: &str = "queues.add";
    pub const QUEUES_DELETE_FOR: &str = "queues.delete_for";
}

const DEFAULT_CALLS: &[(&str, &str)] = &[
    (
        names::RESOURCES_VIEW_ALL,
        "SELECT id, resource_type, name, applications_editable FROM gridport_resources \
         ORDER BY resource_type, name",
    ),
    (
        names::RESOURCES_FIND,
        "SELECT id, resource_type, name, applications_editable FROM gridport_resources \
         WHERE resource_type = ? AND name = ?",
    ),
    (
        names::RESOURCES_ADD,
        "INSERT INTO gridport_resources (resource_type, name, applications_editable) \
         VALUES (?, ?, ?)",
    ),
    (
        names::RESOURCES_UPDATE,
        "UPDATE gridport_resources SET applications_editable = ? \
         WHERE resource_type = ? AND name = ?",
    ),
    (
        names::RESOURCES_DELETE,
        "DELETE FROM gridport_resources WHERE resource_type = ? AND name = ?",
    ),
    (
        names::APPLICATIONS_VIEW_ALL,
        "SELECT resource_id, name, version, path, description FROM gridport_applications",
    ),
    (
        names::APPLICATIONS_VIEW_FOR,
        "SELECT resource_id, name, version, path, description FROM gridport_applications \
         WHERE resource_id = ?",
    ),
    (
        names::APPLICATIONS_ADD,
        "INSERT INTO gridport_applications (resource_id, name, version, path, description) \
         VALUES (?, ?, ?, ?, ?)",
    ),
    (
        names::APPLICATIONS_DELETE_FOR,
        "DELETE FROM gridport_applications WHERE resource_id = ?",
    ),
    (
        names::QUEUES_VIEW_ALL,
        "SELECT resource_id, name FROM gridport_queues",
    ),
    (
        names::QUEUES_VIEW_FOR,
        "SELECT resource_id, name FROM gridport_queues WHERE resource_id = ?",
    ),
    (
        names::QUEUES_ADD,
        "INSERT INTO gridport_queues (resource_id, name) VALUES (?, ?)",
    ),
    (
        names::QUEUES_DELETE_FOR,
        "DELETE FROM gridport_queues WHERE resource_id = ?",
    ),
];

/// SQL templates keyed by call name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSet {
    calls: BTreeMap<String, String>,
}

impl Default for CallSet {
    fn default() -> Self {
        Self {
            calls: DEFAULT_CALLS
                .iter()
                .map(|(name, sql)| (name.to_string(), sql.to_string()))
                .collect(),
        }
    }
}

impl CallSet {
    /// Replace individual calls. Names must be ones this set already knows.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, String>) -> Result<Self, ValidationError> {
        for (name, sql) in overrides {
            match self.calls.get_mut(name) {
                Some(slot) => *slot = sql.clone(),
                None => return Err(ValidationError::UnknownCall { name: name.clone() }),
            }
        }
        Ok(self)
    }

    pub fn sql(&self, name: &str) -> Option<&str> {
        self.calls.get(name).map(String::as_str)
    }
}

/// A positional bind parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Text(String),
    Integer(i64),
    Bool(bool),
    Null,
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Text(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Text(value)
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Integer(value)
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Param::Bool(value)
    }
}

type BoxedCall = BoxedSqlQuery<'static, Sqlite, SqlQuery>;

#[derive(QueryableByName)]
struct RowId {
    #[diesel(sql_type = BigInt)]
    id: i64,
}

/// One invocation of a named call.
pub(crate) struct Call<'a> {
    name: &'static str,
    sql: &'a str,
    params: Vec<Param>,
    entity: EntityKind,
    key: String,
}

impl<'a> Call<'a> {
    /// Look up `name` in `calls`. `entity` and `key` describe what the call
    /// operates on and end up in any error it produces.
    pub fn new(
        calls: &'a CallSet,
        name: &'static str,
        entity: EntityKind,
        key: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let sql = calls
            .sql(name)
            .ok_or_else(|| RegistryError::persistence(name, "call is not defined"))?;
        Ok(Self {
            name,
            sql,
            params: Vec::new(),
            entity,
            key: key.into(),
        })
    }

    pub fn bind(mut self, param: impl Into<Param>) -> Self {
        self.params.push(param.into());
        self
    }

    fn query(&self) -> BoxedCall {
        let mut query = diesel::sql_query(self.sql).into_boxed::<Sqlite>();
        for param in &self.params {
            query = match param.clone() {
                Param::Text(value) => query.bind::<Text, _>(value),
                Param::Integer(value) => query.bind::<BigInt, _>(value),
                Param::Bool(value) => query.bind::<Bool, _>(value),
                Param::Null => query.bind::<Nullable<Text>, _>(None::<String>),
            };
        }
        query
    }

    fn fail(&self, err: DieselError) -> RegistryError {
        debug!("Call {} failed for {} {}: {}", self.name, self.entity, self.key, err);
        map_database_error(err, self.entity, &self.key)
    }

    /// Run the call, returning the number of affected rows.
    pub fn execute(self, conn: &mut SqliteConnection) -> Result<usize, RegistryError> {
        trace!("Executing call {} with {} params", self.name, self.params.len());
        self.query().execute(conn).map_err(|e| self.fail(e))
    }

    /// Run the call, then read the id of the row it inserted.
    pub fn execute_returning_id(self, conn: &mut SqliteConnection) -> Result<i64, RegistryError> {
        trace!("Executing call {} with {} params", self.name, self.params.len());
        self.query().execute(conn).map_err(|e| self.fail(e))?;
        diesel::sql_query("SELECT last_insert_rowid() AS id")
            .get_result::<RowId>(conn)
            .map(|row| row.id)
            .map_err(|e| self.fail(e))
    }

    /// Run the call and hand every returned row to `on_row`, in order.
    /// Returns the number of rows seen.
    pub fn for_each_row<R, F>(self, conn: &mut SqliteConnection, mut on_row: F) -> Result<usize, RegistryError>
    where
        R: QueryableByName<Sqlite> + 'static,
        BoxedCall: LoadQuery<'static, SqliteConnection, R>,
        F: FnMut(R) -> Result<(), RegistryError>,
    {
        trace!("Querying call {} with {} params", self.name, self.params.len());
        let rows: Vec<R> = self.query().load(conn).map_err(|e| self.fail(e))?;
        let count = rows.len();
        for row in rows {
            on_row(row)?;
        }
        Ok(count)
    }
}

/// Rewrite a driver error into the registry's error kinds.
///
/// Unique-constraint hits become `Duplicate`, not-null hits become
/// `InvalidInput`, everything else is a `Persistence` failure naming the
/// entity.
pub(crate) fn map_database_error(err: DieselError, entity: EntityKind, key: &str) -> RegistryError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => RegistryError::Duplicate {
            entity,
            key: key.to_string(),
        },
        DieselError::DatabaseError(DatabaseErrorKind::NotNullViolation, info) => {
            RegistryError::InvalidInput {
                entity,
                reason: format!("{}: {}", key, info.message()),
            }
        }
        other => RegistryError::persistence(format!("{} {}", entity, key), other),
    }
}
