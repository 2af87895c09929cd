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

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection, PooledConnection};
use diesel::sql_types::{BigInt, Bool, Text};
use diesel::sqlite::SqliteConnection;
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

use super::calls::{names, Call, CallSet};
use crate::config::DatabaseConfig;
use crate::models::{Application, Queue, Resource, ResourceKey};
use crate::registry::{EntityKind, RegistryError, ResourceProvider};

type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;
type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS gridport_resources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    resource_type TEXT NOT NULL,
    name TEXT NOT NULL,
    applications_editable BOOLEAN NOT NULL DEFAULT TRUE,
    UNIQUE (resource_type, name)
);
CREATE TABLE IF NOT EXISTS gridport_applications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    resource_id INTEGER NOT NULL REFERENCES gridport_resources(id),
    name TEXT NOT NULL,
    version TEXT NOT NULL,
    path TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    UNIQUE (resource_id, name, version, path)
);
CREATE TABLE IF NOT EXISTS gridport_queues (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    resource_id INTEGER NOT NULL REFERENCES gridport_resources(id),
    name TEXT NOT NULL,
    UNIQUE (resource_id, name)
);
"#;

#[derive(QueryableByName)]
struct ResourceRow {
    #[diesel(sql_type = BigInt)]
    id: i64,
    #[diesel(sql_type = Text)]
    resource_type: String,
    #[diesel(sql_type = Text)]
    name: String,
    #[diesel(sql_type = Bool)]
    applications_editable: bool,
}

#[derive(QueryableByName)]
struct ApplicationRow {
    #[diesel(sql_type = BigInt)]
    resource_id: i64,
    #[diesel(sql_type = Text)]
    name: String,
    #[diesel(sql_type = Text)]
    version: String,
    #[diesel(sql_type = Text)]
    path: String,
    #[diesel(sql_type = Text)]
    description: String,
}

#[derive(QueryableByName)]
struct QueueRow {
    #[diesel(sql_type = BigInt)]
    resource_id: i64,
    #[diesel(sql_type = Text)]
    name: String,
}

/// Per-connection pragmas, applied whenever the pool opens a connection.
#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        conn.batch_execute("PRAGMA busy_timeout = 30000; PRAGMA foreign_keys = ON;")
            .map_err(r2d2::Error::QueryError)
    }
}

/// A resource being reassembled from rows. Children are attached before the
/// stored `applications_editable` flag is applied.
struct PendingResource {
    resource: Resource,
    applications_editable: bool,
}

impl PendingResource {
    fn from_row(row: ResourceRow) -> Result<(i64, Self), RegistryError> {
        let resource = Resource::new(&row.resource_type, &row.name).map_err(stored_row_error)?;
        Ok((
            row.id,
            Self {
                resource,
                applications_editable: row.applications_editable,
            },
        ))
    }

    fn add_application(&mut self, row: ApplicationRow) -> Result<(), RegistryError> {
        let application = Application::new(&row.name, &row.version, &row.path)
            .map_err(stored_row_error)?
            .with_description(&row.description);
        self.resource
            .add_application(application)
            .map_err(stored_row_error)
    }

    fn add_queue(&mut self, row: QueueRow) -> Result<(), RegistryError> {
        let queue = Queue::new(&row.name).map_err(stored_row_error)?;
        self.resource.add_queue(queue).map_err(stored_row_error)
    }

    fn finish(mut self) -> Resource {
        self.resource
            .set_applications_editable(self.applications_editable);
        self.resource
    }
}

fn stored_row_error(err: RegistryError) -> RegistryError {
    RegistryError::persistence("stored row", err)
}

/// Registry stored in a SQLite database.
///
/// The connection pool and the schema are created on first use. Each
/// operation runs its calls on one pooled connection; writes run in an
/// immediate transaction so concurrent writers queue on the busy timeout
/// instead of failing halfway. No in-process lock is held
/// while the database is busy, so uniqueness is enforced by the schema.
pub struct DatabaseResourceProvider {
    url: String,
    pool_size: u32,
    connection_timeout: Duration,
    calls: CallSet,
    pool: OnceCell<DbPool>,
}

impl DatabaseResourceProvider {
    /// `url` is a SQLite path, optionally prefixed with `sqlite://`.
    pub fn new(url: impl Into<String>) -> Self {
        let defaults = DatabaseConfig::default();
        Self {
            url: url.into(),
            pool_size: defaults.pool_size,
            connection_timeout: Duration::from_secs(defaults.connection_timeout_secs),
            calls: CallSet::default(),
            pool: OnceCell::new(),
        }
    }

    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn with_calls(mut self, calls: CallSet) -> Self {
        self.calls = calls;
        self
    }

    pub fn calls(&self) -> &CallSet {
        &self.calls
    }

    fn database_path(&self) -> &str {
        self.url.strip_prefix("sqlite://").unwrap_or(&self.url)
    }

    fn pool(&self) -> Result<&DbPool, RegistryError> {
        self.pool.get_or_try_init(|| self.build_pool())
    }

    fn build_pool(&self) -> Result<DbPool, RegistryError> {
        let path = self.database_path();
        info!("Initializing database registry at {}", path);

        // Every connection to ":memory:" is its own database.
        let max_size = if path == ":memory:" { 1 } else { self.pool_size };

        let manager = ConnectionManager::<SqliteConnection>::new(path);
        let pool = r2d2::Pool::builder()
            .max_size(max_size)
            .connection_timeout(self.connection_timeout)
            .connection_customizer(Box::new(SqlitePragmas))
            .build(manager)
            .map_err(|e| RegistryError::persistence("database pool", e))?;

        let mut conn = pool
            .get()
            .map_err(|e| RegistryError::persistence("database connection", e))?;
        conn.batch_execute(SCHEMA)
            .map_err(|e| RegistryError::persistence("database schema", e))?;

        debug!("Database registry schema ready");
        Ok(pool)
    }

    fn connection(&self) -> Result<DbConnection, RegistryError> {
        self.pool()?
            .get()
            .map_err(|e| RegistryError::persistence("database connection", e))
    }

    fn call(&self, name: &'static str, entity: EntityKind, key: impl Into<String>) -> Result<Call<'_>, RegistryError> {
        Call::new(&self.calls, name, entity, key)
    }

    fn load_all(&self, conn: &mut SqliteConnection) -> Result<Vec<Resource>, RegistryError> {
        let mut pending: BTreeMap<i64, PendingResource> = BTreeMap::new();

        self.call(names::RESOURCES_VIEW_ALL, EntityKind::Resource, "*")?
            .for_each_row(conn, |row: ResourceRow| {
                let (id, resource) = PendingResource::from_row(row)?;
                pending.insert(id, resource);
                Ok(())
            })?;

        self.call(names::APPLICATIONS_VIEW_ALL, EntityKind::Application, "*")?
            .for_each_row(conn, |row: ApplicationRow| match pending.get_mut(&row.resource_id) {
                Some(resource) => resource.add_application(row),
                None => {
                    debug!("Skipping application {} of unknown resource {}", row.name, row.resource_id);
                    Ok(())
                }
            })?;

        self.call(names::QUEUES_VIEW_ALL, EntityKind::Queue, "*")?
            .for_each_row(conn, |row: QueueRow| match pending.get_mut(&row.resource_id) {
                Some(resource) => resource.add_queue(row),
                None => {
                    debug!("Skipping queue {} of unknown resource {}", row.name, row.resource_id);
                    Ok(())
                }
            })?;

        let mut resources: Vec<Resource> = pending.into_values().map(PendingResource::finish).collect();
        resources.sort_by(|a, b| a.key().cmp(b.key()));
        Ok(resources)
    }

    /// Load one resource with its children, along with its row id.
    fn load_one(
        &self,
        conn: &mut SqliteConnection,
        key: &ResourceKey,
    ) -> Result<Option<(i64, Resource)>, RegistryError> {
        let mut found: Option<(i64, PendingResource)> = None;
        self.call(names::RESOURCES_FIND, EntityKind::Resource, key.to_string())?
            .bind(key.resource_type.as_str())
            .bind(key.name.as_str())
            .for_each_row(conn, |row: ResourceRow| {
                found = Some(PendingResource::from_row(row)?);
                Ok(())
            })?;

        let Some((id, mut pending)) = found else {
            return Ok(None);
        };

        self.call(names::APPLICATIONS_VIEW_FOR, EntityKind::Application, key.to_string())?
            .bind(id)
            .for_each_row(conn, |row: ApplicationRow| pending.add_application(row))?;
        self.call(names::QUEUES_VIEW_FOR, EntityKind::Queue, key.to_string())?
            .bind(id)
            .for_each_row(conn, |row: QueueRow| pending.add_queue(row))?;

        Ok(Some((id, pending.finish())))
    }

    fn insert_children(
        &self,
        conn: &mut SqliteConnection,
        resource_id: i64,
        resource: &Resource,
    ) -> Result<(), RegistryError> {
        for app in resource.applications() {
            self.call(
                names::APPLICATIONS_ADD,
                EntityKind::Application,
                format!("{} on {}", app.key(), resource.key()),
            )?
            .bind(resource_id)
            .bind(app.name())
            .bind(app.version())
            .bind(app.path())
            .bind(app.description())
            .execute(conn)?;
        }
        for queue in resource.queues() {
            self.call(
                names::QUEUES_ADD,
                EntityKind::Queue,
                format!("{} on {}", queue.name(), resource.key()),
            )?
            .bind(resource_id)
            .bind(queue.name())
            .execute(conn)?;
        }
        Ok(())
    }

    fn delete_children(
        &self,
        conn: &mut SqliteConnection,
        resource_id: i64,
        key: &ResourceKey,
    ) -> Result<(), RegistryError> {
        self.call(names::APPLICATIONS_DELETE_FOR, EntityKind::Application, key.to_string())?
            .bind(resource_id)
            .execute(conn)?;
        self.call(names::QUEUES_DELETE_FOR, EntityKind::Queue, key.to_string())?
            .bind(resource_id)
            .execute(conn)?;
        Ok(())
    }
}

fn not_found(key: &ResourceKey) -> RegistryError {
    RegistryError::NotFound {
        entity: EntityKind::Resource,
        key: key.to_string(),
    }
}

impl ResourceProvider for DatabaseResourceProvider {
    fn name(&self) -> &str {
        "database"
    }

    fn needs_init(&self) -> bool {
        self.pool.get().is_none()
    }

    fn init(&self) -> Result<(), RegistryError> {
        self.pool().map(|_| ())
    }

    fn is_editable(&self) -> bool {
        true
    }

    fn get_resources(&self) -> Result<Vec<Resource>, RegistryError> {
        let mut conn = self.connection()?;
        let resources = self.load_all(&mut conn)?;
        debug!("Loaded {} resources from database", resources.len());
        Ok(resources)
    }

    fn get_resource(&self, name: &str, resource_type: &str) -> Result<Option<Resource>, RegistryError> {
        let mut conn = self.connection()?;
        let key = ResourceKey::new(resource_type, name);
        Ok(self.load_one(&mut conn, &key)?.map(|(_, resource)| resource))
    }

    fn contains_resource(&self, key: &ResourceKey) -> Result<bool, RegistryError> {
        let mut conn = self.connection()?;
        let mut found = false;
        self.call(names::RESOURCES_FIND, EntityKind::Resource, key.to_string())?
            .bind(key.resource_type.as_str())
            .bind(key.name.as_str())
            .for_each_row(&mut conn, |_: ResourceRow| {
                found = true;
                Ok(())
            })?;
        Ok(found)
    }

    fn add_resource(&self, resource: Resource) -> Result<(), RegistryError> {
        resource.validate_children()?;
        debug!("Adding resource {} to database", resource.key());

        let mut conn = self.connection()?;
        conn.immediate_transaction::<_, RegistryError, _>(|conn| {
            let id = self
                .call(names::RESOURCES_ADD, EntityKind::Resource, resource.key().to_string())?
                .bind(resource.resource_type())
                .bind(resource.name())
                .bind(resource.applications_editable())
                .execute_returning_id(conn)?;
            self.insert_children(conn, id, &resource)
        })
    }

    fn save_resource(&self, resource: Resource) -> Result<(), RegistryError> {
        resource.validate_children()?;
        debug!("Saving resource {} to database", resource.key());

        let key = resource.key().clone();
        let mut conn = self.connection()?;
        conn.immediate_transaction::<_, RegistryError, _>(|conn| {
            let updated = self
                .call(names::RESOURCES_UPDATE, EntityKind::Resource, key.to_string())?
                .bind(resource.applications_editable())
                .bind(key.resource_type.as_str())
                .bind(key.name.as_str())
                .execute(conn)?;
            if updated == 0 {
                return Err(not_found(&key));
            }

            let (id, _) = self.load_one(conn, &key)?.ok_or_else(|| not_found(&key))?;
            self.delete_children(conn, id, &key)?;
            self.insert_children(conn, id, &resource)
        })
    }

    fn remove_resource(&self, key: &ResourceKey) -> Result<Resource, RegistryError> {
        debug!("Removing resource {} from database", key);

        let mut conn = self.connection()?;
        conn.immediate_transaction::<_, RegistryError, _>(|conn| {
            let (id, resource) = self.load_one(conn, key)?.ok_or_else(|| not_found(key))?;
            self.delete_children(conn, id, key)?;
            let deleted = self
                .call(names::RESOURCES_DELETE, EntityKind::Resource, key.to_string())?
                .bind(key.resource_type.as_str())
                .bind(key.name.as_str())
                .execute(conn)?;
            if deleted == 0 {
                return Err(not_found(key));
            }
            Ok(resource)
        })
    }

    fn commit_changes(&self) -> Result<(), RegistryError> {
        debug!("Database registry commits per call, nothing to flush");
        Ok(())
    }
}
