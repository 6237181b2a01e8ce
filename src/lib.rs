pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::Cli;

pub use adapters::{
    LocalConnector, LocalFilesystem, MemoryFilesystem, WebHdfsClient, WebHdfsConnector,
};
pub use config::StoreConfig;
pub use core::{hdfs_backend::HdfsStoreBackend, store_manager::StoreManager};
pub use domain::model::{CacheItemInfo, ConnectionOptions, OpenMode, RemoteFile, StorageOptions};
pub use domain::ports::{Connector, Location, RemoteFilesystem, StoreBackend};
pub use utils::error::{Result, StoreError};
