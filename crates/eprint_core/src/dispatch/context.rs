//! Service context built once at start.
//!
//! # Responsibility
//! - Open one pooled handle per configured repository.
//! - Probe each repository schema and build its route table.
//!
//! # Invariants
//! - After `build`, repositories, schemas and routes are read-only.
//! - A repository that fails to open or probe is logged and left
//!   unrouted; the rest of the service still starts.

use crate::config::{Config, ImportDefaults};
use crate::db::DbPool;
use crate::router::{RouteRegistry, RouteTable};
use crate::schema::{probe_schema, SchemaMap};
use log::{error, info};
use std::collections::BTreeMap;
use std::time::Instant;

/// One live repository.
pub struct Repository {
    pub id: String,
    pub base_url: String,
    pub write: bool,
    pub defaults: ImportDefaults,
    pub schema: SchemaMap,
    pub pool: DbPool,
}

pub struct ServiceContext {
    config: Config,
    repositories: BTreeMap<String, Repository>,
    routes: RouteRegistry,
}

impl ServiceContext {
    pub fn build(config: Config) -> Self {
        let started_at = Instant::now();
        let mut repositories = BTreeMap::new();
        let mut routes = RouteRegistry::new();

        for (id, settings) in &config.repositories {
            let pool = match DbPool::open(&settings.dsn, settings.pool_size) {
                Ok(pool) => pool,
                Err(err) => {
                    error!(
                        "event=repository_open module=dispatch status=error repository={id} error_code=open_failed error={err}"
                    );
                    continue;
                }
            };
            let schema = match pool.with_conn(|conn| probe_schema(conn)) {
                Ok(Ok(schema)) => schema,
                Ok(Err(err)) => {
                    error!(
                        "event=repository_open module=dispatch status=error repository={id} error_code=probe_failed error={err}"
                    );
                    pool.close();
                    continue;
                }
                Err(err) => {
                    error!(
                        "event=repository_open module=dispatch status=error repository={id} error_code=pool_failed error={err}"
                    );
                    pool.close();
                    continue;
                }
            };

            let table = RouteTable::for_schema(&schema);
            let endpoints = table.len();
            if let Err(err) = routes.register(id, table) {
                error!(
                    "event=repository_open module=dispatch status=error repository={id} error_code=route_failed error={err}"
                );
                pool.close();
                continue;
            }
            info!(
                "event=repository_open module=dispatch status=ok repository={id} tables={} endpoints={endpoints} write={}",
                schema.len(),
                settings.write
            );
            repositories.insert(
                id.clone(),
                Repository {
                    id: id.clone(),
                    base_url: settings.base_url.clone(),
                    write: settings.write,
                    defaults: settings.defaults.clone(),
                    schema,
                    pool,
                },
            );
        }

        info!(
            "event=service_build module=dispatch status=ok repositories={} routed={} duration_ms={}",
            config.repositories.len(),
            repositories.len(),
            started_at.elapsed().as_millis()
        );
        Self {
            config,
            repositories,
            routes,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn routes(&self) -> &RouteRegistry {
        &self.routes
    }

    /// Live repository with an open pool.
    pub fn repository(&self, id: &str) -> Option<&Repository> {
        self.repositories
            .get(id)
            .filter(|repository| !repository.pool.is_closed())
    }

    /// Configured repository ids, live or not.
    pub fn repository_ids(&self) -> Vec<String> {
        self.config.repository_ids()
    }

    /// Closes every pool; later lookups find no live repository.
    pub fn close(&self) {
        for repository in self.repositories.values() {
            repository.pool.close();
        }
        info!(
            "event=service_close module=dispatch status=ok repositories={}",
            self.repositories.len()
        );
    }
}
