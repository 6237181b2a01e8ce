use crate::domain::model::{
    CacheItemInfo, ConnectionOptions, OpenMode, RemoteFile, StorageOptions, NAMESPACE,
};
use crate::domain::ports::{Connector, Location, RemoteFilesystem, StoreBackend};
use crate::utils::error::{Result, StoreError};
use crate::utils::path;
use async_trait::async_trait;
use std::fmt;

/// Store backend keeping cached results on HDFS.
///
/// Obtain one with [`HdfsStoreBackend::new`], then call
/// [`configure`](StoreBackend::configure) once before any other operation.
pub struct HdfsStoreBackend<C: Connector> {
    connector: C,
    fs: Option<C::Filesystem>,
    cachedir: Option<String>,
    compress: bool,
    mmap_mode: Option<String>,
    warnings: Vec<String>,
}

impl<C: Connector> HdfsStoreBackend<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            fs: None,
            cachedir: None,
            compress: false,
            mmap_mode: None,
            warnings: Vec::new(),
        }
    }

    /// Warnings raised while configuring, oldest first.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn fs(&self) -> Result<&C::Filesystem> {
        self.fs.as_ref().ok_or(StoreError::NotConfigured)
    }
}

/// Creates `directory` and every missing ancestor, root to leaf.
///
/// The remote `mkdir` never creates parents, so each cumulative prefix gets
/// its own call. Existing directories are accepted.
pub async fn mkdirp<F: RemoteFilesystem>(fs: &F, directory: &str) -> Result<()> {
    for prefix in path::cumulative_prefixes(directory) {
        tracing::debug!("mkdir {}", prefix);
        match fs.mkdir(&prefix).await {
            Ok(()) | Err(StoreError::AlreadyExists { .. }) => {}
            Err(e @ StoreError::DirectoryCreationFailure { .. }) => return Err(e),
            Err(e) if e.is_connectivity() => return Err(e),
            Err(e) => {
                return Err(StoreError::DirectoryCreationFailure {
                    path: prefix,
                    reason: e.to_string(),
                })
            }
        }
    }
    Ok(())
}

#[async_trait]
impl<C: Connector> StoreBackend for HdfsStoreBackend<C> {
    fn cachedir(&self) -> Option<&str> {
        self.cachedir.as_deref()
    }

    fn compress(&self) -> bool {
        self.compress
    }

    fn mmap_mode(&self) -> Option<&str> {
        self.mmap_mode.as_deref()
    }

    async fn configure(
        &mut self,
        location: Location<'_>,
        connection: &ConnectionOptions,
        storage: &StorageOptions,
    ) -> Result<()> {
        let fs = self.connector.connect(connection).await?;

        let cachedir = match location {
            Location::Path(root) => {
                let cachedir = path::join_path(path::strip_leading_separator(root), NAMESPACE);
                mkdirp(&fs, &cachedir).await?;
                cachedir
            }
            Location::Backend(other) => other
                .cachedir()
                .ok_or(StoreError::NotConfigured)?
                .to_string(),
        };

        tracing::info!("Configured HDFS store at {}", cachedir);

        self.fs = Some(fs);
        self.cachedir = Some(cachedir);
        self.compress = storage.compress;

        if let Some(requested) = &storage.mmap_mode {
            let warning = format!(
                "Memory mapping cannot be used on HDFS store; mmap_mode={} will be ignored",
                requested
            );
            tracing::warn!("{}", warning);
            self.warnings.push(warning);
        }
        self.mmap_mode = None;

        Ok(())
    }

    async fn create_location(&self, location: &str) -> Result<()> {
        mkdirp(self.fs()?, location).await
    }

    async fn clear_location(&self, location: &str) -> Result<()> {
        match self.fs()?.rm(location, true).await {
            Ok(()) => {
                tracing::debug!("Removed {}", location);
                Ok(())
            }
            Err(StoreError::NotFound { .. }) => {
                tracing::debug!("Nothing to remove at {}", location);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn get_cache_items(&self) -> Result<Vec<CacheItemInfo>> {
        // HDFS does not report access times cheaply; enumeration stays empty.
        Ok(Vec::new())
    }

    async fn open_object(&self, path: &str, mode: OpenMode) -> Result<RemoteFile> {
        self.fs()?.open(path, mode).await
    }

    async fn close_object(&self, file: RemoteFile) -> Result<()> {
        self.fs()?.close(file).await
    }

    async fn object_exists(&self, path: &str) -> Result<bool> {
        self.fs()?.exists(path).await
    }

    async fn move_object(&self, from: &str, to: &str) -> Result<()> {
        self.fs()?.rename(from, to).await
    }
}

impl<C: Connector> fmt::Display for HdfsStoreBackend<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HdfsStoreBackend(location=\"{}\")",
            self.cachedir.as_deref().unwrap_or("")
        )
    }
}

impl<C: Connector> fmt::Debug for HdfsStoreBackend<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HdfsStoreBackend")
            .field("cachedir", &self.cachedir)
            .field("compress", &self.compress)
            .field("connected", &self.fs.is_some())
            .finish()
    }
}
