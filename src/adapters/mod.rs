// Adapters layer: filesystem clients implementing the `RemoteFilesystem` port.

pub mod local;
pub mod memory;
pub mod webhdfs;

pub use local::{LocalConnector, LocalFilesystem};
pub use memory::{FsCall, MemoryFilesystem};
pub use webhdfs::{WebHdfsClient, WebHdfsConnector};
