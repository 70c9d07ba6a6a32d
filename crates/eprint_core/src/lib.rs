//! Core crosswalk and lookup logic for EPrints repositories.
//! The HTTP binary only adapts transport; every rule lives here.

pub mod assemble;
pub mod binder;
pub mod config;
pub mod crosswalk;
pub mod db;
pub mod dispatch;
pub mod logging;
pub mod model;
pub mod query;
pub mod router;
pub mod schema;
pub mod write;

pub use assemble::{read_record, AssembleError, AssembleResult};
pub use config::{Config, ConfigError, ConfigResult, ImportDefaults, RepositoryConfig};
pub use crosswalk::{
    from_native_json, from_native_xml, is_public, to_native_json, to_native_xml, to_simplified,
    CodecError, CodecResult, SimpleRecord,
};
pub use db::{DbError, DbPool, DbResult};
pub use dispatch::{dispatch, ApiError, ApiResult, Reply, Request, ServiceContext};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status};
pub use model::{Document, EPrints, File, Item, ItemList, Name, Record};
pub use query::{LookupRepository, QueryError, QueryResult, RangeField, SqliteLookupRepository};
pub use router::{RouteRegistry, RouteTable, ENDPOINTS};
pub use schema::{probe_schema, SchemaError, SchemaMap};
pub use write::{write_record, WriteError, WriteResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
