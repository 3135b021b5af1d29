use thiserror::Error;

/// Startup and wiring failures of the daemon binary.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] gatecheck_store_lmdb::LmdbError),

    #[error("rpc server error: {0}")]
    Rpc(#[from] gatecheck_rpc::RpcError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
