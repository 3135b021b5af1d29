//! LMDB storage backend for the GateCheck verification engine.
//!
//! Implements the storage traits from `gatecheck-store` using the `heed`
//! LMDB bindings. Every table is a named database inside one environment,
//! so a decision commit can span tables within a single write transaction.

pub mod directory;
pub mod environment;
pub mod error;
pub mod migration;
pub mod store;

pub use directory::LmdbDirectory;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use store::LmdbStore;
