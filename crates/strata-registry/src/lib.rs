//! Registry readers supplying already-deployed state.

pub mod postgres;
pub mod reader;
pub mod snapshot;

pub use postgres::{DEFAULT_REGISTRY_SCHEMA, PostgresRegistry};
pub use reader::RegistryReader;
pub use snapshot::{parse_snapshot, registry_json_schema, SnapshotRegistry};

pub use strata_core::RegistryState;
