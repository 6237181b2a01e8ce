//! Item-level helpers every [`StoreBackend`] gets for free.
//!
//! An item lives in a directory under the backend's cache directory, addressed
//! by a list of path segments (typically module, function and argument hash).
//! The layout inside that directory is:
//!
//! | file            | content                                 |
//! |-----------------|-----------------------------------------|
//! | `output.pkl`    | serialized result, opaque to the store  |
//! | `metadata.json` | JSON object describing the call         |
//! | `func_code.py`  | source of the cached function           |

use crate::domain::model::{ItemInfo, OpenMode};
use crate::domain::ports::StoreBackend;
use crate::utils::error::{Result, StoreError};
use crate::utils::path;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::io::{Read, Write};

pub const OUTPUT_FILE: &str = "output.pkl";
pub const METADATA_FILE: &str = "metadata.json";
pub const FUNC_CODE_FILE: &str = "func_code.py";

fn temporary_name(filename: &str) -> String {
    format!(
        "{}.pid-{}-{}",
        filename,
        std::process::id(),
        chrono::Utc::now().timestamp_micros()
    )
}

#[async_trait]
pub trait StoreManager: StoreBackend {
    /// Full remote path of the item addressed by `path`.
    fn item_path(&self, path: &[&str]) -> Result<String> {
        let cachedir = self.cachedir().ok_or(StoreError::NotConfigured)?;
        Ok(path::join_all(cachedir, path))
    }

    async fn read_object(&self, filename: &str) -> Result<Vec<u8>> {
        let mut file = self.open_object(filename, OpenMode::Read).await?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        Ok(content)
    }

    /// Writes `data` next to `filename` and moves it into place, so readers
    /// never observe a partially written object. A failed commit removes the
    /// temporary object and reports the original error.
    async fn write_object(&self, filename: &str, data: &[u8]) -> Result<()> {
        let temporary = temporary_name(filename);
        let mut file = self.open_object(&temporary, OpenMode::Write).await?;
        file.write_all(data)?;
        self.close_object(file).await?;

        let committed = async {
            if self.object_exists(filename).await? {
                self.clear_location(filename).await?;
            }
            self.move_object(&temporary, filename).await
        }
        .await;

        if let Err(e) = committed {
            if let Err(cleanup) = self.clear_location(&temporary).await {
                tracing::warn!("Could not remove temporary object {}: {}", temporary, cleanup);
            }
            return Err(e);
        }
        Ok(())
    }

    async fn load_item(&self, path: &[&str]) -> Result<Vec<u8>> {
        let filename = path::join_path(&self.item_path(path)?, OUTPUT_FILE);
        if !self.object_exists(&filename).await? {
            return Err(StoreError::ItemNotFound { path: filename });
        }
        tracing::debug!("Loading cached item {}", filename);
        self.read_object(&filename).await
    }

    /// Stores already-serialized bytes as the item's output.
    async fn dump_item(&self, path: &[&str], data: &[u8]) -> Result<()> {
        let item_path = self.item_path(path)?;
        if !self.object_exists(&item_path).await? {
            self.create_location(&item_path).await?;
        }
        let filename = path::join_path(&item_path, OUTPUT_FILE);
        tracing::debug!("Persisting {} bytes to {}", data.len(), filename);
        self.write_object(&filename, data).await
    }

    async fn clear_item(&self, path: &[&str]) -> Result<()> {
        let item_path = self.item_path(path)?;
        if self.object_exists(&item_path).await? {
            self.clear_location(&item_path).await?;
        }
        Ok(())
    }

    async fn contains_item(&self, path: &[&str]) -> Result<bool> {
        let filename = path::join_path(&self.item_path(path)?, OUTPUT_FILE);
        self.object_exists(&filename).await
    }

    fn get_item_info(&self, path: &[&str]) -> Result<ItemInfo> {
        Ok(ItemInfo {
            location: self.item_path(path)?,
        })
    }

    /// Metadata stored for the item; empty when missing or unreadable.
    async fn get_metadata(&self, path: &[&str]) -> Result<HashMap<String, Value>> {
        let filename = path::join_path(&self.item_path(path)?, METADATA_FILE);
        let content = match self.read_object(&filename).await {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("No metadata at {}: {}", filename, e);
                return Ok(HashMap::new());
            }
        };
        Ok(serde_json::from_slice(&content).unwrap_or_default())
    }

    async fn store_metadata(&self, path: &[&str], metadata: &HashMap<String, Value>) -> Result<()> {
        let location = self.item_path(path)?;
        self.create_location(&location).await?;
        let filename = path::join_path(&location, METADATA_FILE);
        let content = serde_json::to_vec(metadata)?;
        self.write_object(&filename, &content).await
    }

    async fn contains_path(&self, path: &[&str]) -> Result<bool> {
        self.object_exists(&self.item_path(path)?).await
    }

    async fn clear_path(&self, path: &[&str]) -> Result<()> {
        let func_path = self.item_path(path)?;
        if self.object_exists(&func_path).await? {
            self.clear_location(&func_path).await?;
        }
        Ok(())
    }

    async fn store_cached_func_code(&self, path: &[&str], func_code: Option<&str>) -> Result<()> {
        let func_path = self.item_path(path)?;
        if !self.object_exists(&func_path).await? {
            self.create_location(&func_path).await?;
        }
        if let Some(code) = func_code {
            let filename = path::join_path(&func_path, FUNC_CODE_FILE);
            let mut file = self.open_object(&filename, OpenMode::Write).await?;
            file.write_all(code.as_bytes())?;
            self.close_object(file).await?;
        }
        Ok(())
    }

    async fn get_cached_func_code(&self, path: &[&str]) -> Result<String> {
        let filename = path::join_path(&self.item_path(path)?, FUNC_CODE_FILE);
        let content = self.read_object(&filename).await?;
        String::from_utf8(content).map_err(|e| StoreError::RemoteError {
            operation: "read".to_string(),
            path: filename,
            message: format!("function code is not valid UTF-8: {}", e),
        })
    }

    fn get_cached_func_info(&self, path: &[&str]) -> Result<ItemInfo> {
        self.get_item_info(path)
    }

    /// Removes the whole cache directory.
    async fn clear(&self) -> Result<()> {
        let cachedir = self.cachedir().ok_or(StoreError::NotConfigured)?.to_string();
        tracing::info!("Clearing cache at {}", cachedir);
        self.clear_location(&cachedir).await
    }

    /// Evicts least recently accessed items until the store fits in
    /// `bytes_limit`. Returns the number of items removed.
    async fn reduce_size(&self, bytes_limit: Option<u64>) -> Result<usize> {
        let Some(limit) = bytes_limit else {
            return Ok(0);
        };

        let mut items = self.get_cache_items().await?;
        let cache_size: u64 = items.iter().map(|item| item.size).sum();
        if cache_size <= limit {
            return Ok(0);
        }

        items.sort_by_key(|item| item.last_access);
        let to_delete = cache_size - limit;
        let mut deleted_size = 0;
        let mut removed = 0;
        for item in &items {
            if deleted_size >= to_delete {
                break;
            }
            tracing::debug!("Evicting {} ({} bytes)", item.path, item.size);
            self.clear_location(&item.path).await?;
            deleted_size += item.size;
            removed += 1;
        }
        Ok(removed)
    }
}

impl<T: StoreBackend + ?Sized> StoreManager for T {}
