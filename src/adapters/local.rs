use crate::domain::model::ConnectionOptions;
use crate::domain::ports::{Connector, RemoteFilesystem};
use crate::utils::error::{Result, StoreError};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local directory standing in for a remote filesystem.
///
/// Remote paths, absolute or relative, all resolve under `base_path`. `mkdir`
/// keeps HDFS semantics and never creates missing parents.
#[derive(Debug, Clone)]
pub struct LocalFilesystem {
    base_path: PathBuf,
}

impl LocalFilesystem {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Maps a remote path under `base_path`. `.` and `..` segments are
    /// rejected, as HDFS does, so no path can leave the root.
    fn full_path(&self, path: &str) -> Result<PathBuf> {
        let mut full_path = self.base_path.clone();
        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(StoreError::RemoteError {
                    operation: "resolve".to_string(),
                    path: path.to_string(),
                    message: format!("invalid path component '{}'", segment),
                });
            }
            full_path.push(segment);
        }
        Ok(full_path)
    }
}

fn map_io(path: &str, err: std::io::Error) -> StoreError {
    match err.kind() {
        ErrorKind::NotFound => StoreError::NotFound {
            path: path.to_string(),
        },
        ErrorKind::AlreadyExists => StoreError::AlreadyExists {
            path: path.to_string(),
        },
        ErrorKind::PermissionDenied => StoreError::PermissionDenied {
            path: path.to_string(),
            message: err.to_string(),
        },
        _ => StoreError::IoError(err),
    }
}

impl RemoteFilesystem for LocalFilesystem {
    async fn mkdir(&self, path: &str) -> Result<()> {
        let full_path = self.full_path(path)?;
        match fs::create_dir(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists && full_path.is_dir() => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::DirectoryCreationFailure {
                path: path.to_string(),
                reason: "parent directory does not exist".to_string(),
            }),
            Err(e) => Err(map_io(path, e)),
        }
    }

    async fn rm(&self, path: &str, recursive: bool) -> Result<()> {
        let full_path = self.full_path(path)?;
        let metadata = fs::metadata(&full_path).await.map_err(|e| map_io(path, e))?;
        let result = if metadata.is_dir() {
            if recursive {
                fs::remove_dir_all(&full_path).await
            } else {
                fs::remove_dir(&full_path).await
            }
        } else {
            fs::remove_file(&full_path).await
        };
        result.map_err(|e| map_io(path, e))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(fs::try_exists(self.full_path(path)?).await?)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        fs::read(self.full_path(path)?)
            .await
            .map_err(|e| map_io(path, e))
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(full_path, data).await.map_err(|e| map_io(path, e))
    }

    async fn append(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(self.full_path(path)?)
            .await
            .map_err(|e| map_io(path, e))?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let source = self.full_path(from)?;
        let target = self.full_path(to)?;
        if fs::try_exists(&target).await? {
            return Err(StoreError::AlreadyExists {
                path: to.to_string(),
            });
        }
        fs::rename(source, target)
            .await
            .map_err(|e| map_io(from, e))
    }
}

/// Hands out [`LocalFilesystem`] handles; connection options are ignored.
#[derive(Debug, Clone)]
pub struct LocalConnector {
    base_path: PathBuf,
}

impl LocalConnector {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

impl Connector for LocalConnector {
    type Filesystem = LocalFilesystem;

    async fn connect(&self, _options: &ConnectionOptions) -> Result<LocalFilesystem> {
        if !fs::try_exists(&self.base_path).await? {
            return Err(StoreError::ConnectionFailure {
                message: format!("local root {} does not exist", self.base_path.display()),
            });
        }
        tracing::debug!("Using local filesystem rooted at {}", self.base_path.display());
        Ok(LocalFilesystem::new(self.base_path.clone()))
    }
}
