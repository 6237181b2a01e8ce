pub mod hdfs_backend;
pub mod store_manager;

pub use crate::domain::model::{
    CacheItemInfo, ConnectionOptions, ItemInfo, OpenMode, RemoteFile, StorageOptions, NAMESPACE,
};
pub use crate::domain::ports::{Connector, Location, RemoteFilesystem, StoreBackend};
pub use crate::utils::error::Result;
