use crate::domain::model::{
    CacheItemInfo, ConnectionOptions, OpenMode, RemoteFile, StorageOptions,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Primitive operations of a distributed filesystem client.
///
/// `mkdir` creates a single directory and does not create missing parents.
/// Creating a directory that already exists must succeed.
pub trait RemoteFilesystem: Send + Sync {
    fn mkdir(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    fn rm(
        &self,
        path: &str,
        recursive: bool,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn exists(&self, path: &str) -> impl std::future::Future<Output = Result<bool>> + Send;

    fn read(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;

    /// Creates or overwrites `path` with `data`.
    fn write(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn append(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn rename(
        &self,
        from: &str,
        to: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn open(
        &self,
        path: &str,
        mode: OpenMode,
    ) -> impl std::future::Future<Output = Result<RemoteFile>> + Send {
        async move {
            match mode {
                OpenMode::Read => Ok(RemoteFile::reader(path, self.read(path).await?)),
                OpenMode::Write | OpenMode::Append => Ok(RemoteFile::writer(path, mode)),
            }
        }
    }

    /// Commits the buffered content of a file opened for writing.
    fn close(&self, file: RemoteFile) -> impl std::future::Future<Output = Result<()>> + Send {
        async move {
            let mode = file.mode();
            let path = file.path().to_string();
            match mode {
                OpenMode::Read => Ok(()),
                OpenMode::Write => self.write(&path, &file.into_bytes()).await,
                OpenMode::Append => self.append(&path, &file.into_bytes()).await,
            }
        }
    }
}

/// Produces a connected [`RemoteFilesystem`] from connection parameters.
pub trait Connector: Send + Sync {
    type Filesystem: RemoteFilesystem + 'static;

    fn connect(
        &self,
        options: &ConnectionOptions,
    ) -> impl std::future::Future<Output = Result<Self::Filesystem>> + Send;
}

/// Where a backend should keep its cache.
pub enum Location<'a> {
    /// A filesystem path; the namespace segment is appended to it.
    Path(&'a str),
    /// Another configured backend whose cache directory is shared.
    Backend(&'a dyn StoreBackend),
}

/// Operations a memoization cache requires from a storage backend.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    fn cachedir(&self) -> Option<&str>;

    fn compress(&self) -> bool;

    fn mmap_mode(&self) -> Option<&str>;

    async fn configure(
        &mut self,
        location: Location<'_>,
        connection: &ConnectionOptions,
        storage: &StorageOptions,
    ) -> Result<()>;

    async fn create_location(&self, location: &str) -> Result<()>;

    async fn clear_location(&self, location: &str) -> Result<()>;

    async fn get_cache_items(&self) -> Result<Vec<CacheItemInfo>>;

    async fn open_object(&self, path: &str, mode: OpenMode) -> Result<RemoteFile>;

    async fn close_object(&self, file: RemoteFile) -> Result<()>;

    async fn object_exists(&self, path: &str) -> Result<bool>;

    async fn move_object(&self, from: &str, to: &str) -> Result<()>;
}
