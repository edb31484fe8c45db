use crate::broker::BrokerError;
use crate::config::ConfigError;
use crate::task::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("failed to create state path {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to resolve home directory for state root")]
    HomeDirectoryUnavailable,
    #[error("failed to write stop signal {path}: {source}")]
    WriteSignal {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to initialize manager settings: {0}")]
    Settings(#[from] ConfigError),
    #[error("unable to open task store: {0}")]
    Store(#[from] StoreError),
    #[error("message handler init error: {0}")]
    Broker(#[from] BrokerError),
}
