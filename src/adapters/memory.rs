//! In-process filesystem with HDFS directory semantics.
//!
//! Every primitive call is appended to a call log so callers can observe the
//! exact sequence an adapter issued. Clones share state.

use crate::domain::model::ConnectionOptions;
use crate::domain::ports::{Connector, RemoteFilesystem};
use crate::utils::error::{Result, StoreError};
use crate::utils::path::{self, SEPARATOR};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsCall {
    Connect,
    Mkdir(String),
    Rm { path: String, recursive: bool },
    Exists(String),
    Read(String),
    Write(String),
    Append(String),
    Rename { from: String, to: String },
}

#[derive(Debug, Default)]
struct MemoryState {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    denied: BTreeSet<String>,
    calls: Vec<FsCall>,
    connections: Vec<ConnectionOptions>,
    unreachable: bool,
}

impl MemoryState {
    fn is_root(path: &str) -> bool {
        path.is_empty() || path == "/"
    }

    fn is_dir(&self, path: &str) -> bool {
        Self::is_root(path) || self.dirs.contains(path)
    }

    fn has_children(&self, dir: &str) -> bool {
        let prefix = child_prefix(dir);
        self.dirs.iter().any(|d| d.starts_with(&prefix))
            || self.files.keys().any(|f| f.starts_with(&prefix))
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable {
            return Err(StoreError::StorageUnavailable {
                message: "memory filesystem marked unreachable".to_string(),
            });
        }
        Ok(())
    }

    fn check_allowed(&self, path: &str) -> Result<()> {
        if self.denied.contains(path) {
            return Err(StoreError::PermissionDenied {
                path: path.to_string(),
                message: "access denied".to_string(),
            });
        }
        Ok(())
    }

    fn ensure_parents(&mut self, path: &str) {
        if let Some(parent) = path::parent(path) {
            for prefix in path::cumulative_prefixes(&parent) {
                self.dirs.insert(prefix);
            }
        }
    }
}

fn child_prefix(dir: &str) -> String {
    if dir.is_empty() || dir.ends_with(SEPARATOR) {
        dir.to_string()
    } else {
        format!("{}{}", dir, SEPARATOR)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryFilesystem {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every subsequent call fail as if the cluster were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Makes operations on `path` fail with a permission error.
    pub fn deny(&self, path: &str) {
        self.lock().denied.insert(path::normalize(path));
    }

    pub fn calls(&self) -> Vec<FsCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn mkdir_calls(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                FsCall::Mkdir(path) => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn connections(&self) -> Vec<ConnectionOptions> {
        self.lock().connections.clone()
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.lock().is_dir(&path::normalize(path))
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(&path::normalize(path)).cloned()
    }

    /// Seeds a file, creating its parent directories, without logging a call.
    pub fn insert_file(&self, path: &str, data: &[u8]) {
        let path = path::normalize(path);
        let mut state = self.lock();
        state.ensure_parents(&path);
        state.files.insert(path, data.to_vec());
    }
}

impl RemoteFilesystem for MemoryFilesystem {
    async fn mkdir(&self, path: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(FsCall::Mkdir(path.to_string()));
        state.check_reachable()?;

        let path = path::normalize(path);
        if MemoryState::is_root(&path) || state.dirs.contains(&path) {
            return Ok(());
        }
        state.check_allowed(&path)?;
        if state.files.contains_key(&path) {
            return Err(StoreError::DirectoryCreationFailure {
                path,
                reason: "a file exists at this path".to_string(),
            });
        }
        let parent = path::parent(&path).unwrap_or_default();
        if !state.is_dir(&parent) {
            return Err(StoreError::DirectoryCreationFailure {
                path,
                reason: format!("parent directory '{}' does not exist", parent),
            });
        }
        state.dirs.insert(path);
        Ok(())
    }

    async fn rm(&self, path: &str, recursive: bool) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(FsCall::Rm {
            path: path.to_string(),
            recursive,
        });
        state.check_reachable()?;

        let path = path::normalize(path);
        state.check_allowed(&path)?;
        if state.files.remove(&path).is_some() {
            return Ok(());
        }
        if !state.dirs.contains(&path) {
            return Err(StoreError::NotFound { path });
        }
        if state.has_children(&path) && !recursive {
            return Err(StoreError::RemoteError {
                operation: "rm".to_string(),
                path,
                message: "directory is not empty".to_string(),
            });
        }
        let prefix = child_prefix(&path);
        state.dirs.retain(|d| d != &path && !d.starts_with(&prefix));
        state.files.retain(|f, _| !f.starts_with(&prefix));
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let mut state = self.lock();
        state.calls.push(FsCall::Exists(path.to_string()));
        state.check_reachable()?;

        let path = path::normalize(path);
        Ok(state.is_dir(&path) || state.files.contains_key(&path))
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let mut state = self.lock();
        state.calls.push(FsCall::Read(path.to_string()));
        state.check_reachable()?;

        let path = path::normalize(path);
        state.check_allowed(&path)?;
        state
            .files
            .get(&path)
            .cloned()
            .ok_or(StoreError::NotFound { path })
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(FsCall::Write(path.to_string()));
        state.check_reachable()?;

        let path = path::normalize(path);
        state.check_allowed(&path)?;
        if state.dirs.contains(&path) {
            return Err(StoreError::RemoteError {
                operation: "write".to_string(),
                path,
                message: "path is a directory".to_string(),
            });
        }
        state.ensure_parents(&path);
        state.files.insert(path, data.to_vec());
        Ok(())
    }

    async fn append(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(FsCall::Append(path.to_string()));
        state.check_reachable()?;

        let path = path::normalize(path);
        state.check_allowed(&path)?;
        match state.files.get_mut(&path) {
            Some(existing) => {
                existing.extend_from_slice(data);
                Ok(())
            }
            None => Err(StoreError::NotFound { path }),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(FsCall::Rename {
            from: from.to_string(),
            to: to.to_string(),
        });
        state.check_reachable()?;

        let from = path::normalize(from);
        let to = path::normalize(to);
        state.check_allowed(&to)?;
        if state.is_dir(&to) || state.files.contains_key(&to) {
            return Err(StoreError::AlreadyExists { path: to });
        }

        if let Some(data) = state.files.remove(&from) {
            state.ensure_parents(&to);
            state.files.insert(to, data);
            return Ok(());
        }
        if !state.dirs.contains(&from) {
            return Err(StoreError::NotFound { path: from });
        }

        let from_prefix = child_prefix(&from);
        let to_prefix = child_prefix(&to);
        let moved_dirs: Vec<String> = state
            .dirs
            .iter()
            .filter(|d| d.starts_with(&from_prefix))
            .cloned()
            .collect();
        let moved_files: Vec<String> = state
            .files
            .keys()
            .filter(|f| f.starts_with(&from_prefix))
            .cloned()
            .collect();

        state.dirs.remove(&from);
        state.ensure_parents(&to);
        state.dirs.insert(to.clone());
        for dir in moved_dirs {
            state.dirs.remove(&dir);
            state
                .dirs
                .insert(format!("{}{}", to_prefix, &dir[from_prefix.len()..]));
        }
        for file in moved_files {
            if let Some(data) = state.files.remove(&file) {
                state
                    .files
                    .insert(format!("{}{}", to_prefix, &file[from_prefix.len()..]), data);
            }
        }
        Ok(())
    }
}

impl Connector for MemoryFilesystem {
    type Filesystem = MemoryFilesystem;

    async fn connect(&self, options: &ConnectionOptions) -> Result<MemoryFilesystem> {
        let mut state = self.lock();
        state.calls.push(FsCall::Connect);
        state.connections.push(options.clone());
        if state.unreachable {
            return Err(StoreError::ConnectionFailure {
                message: "memory filesystem marked unreachable".to_string(),
            });
        }
        Ok(self.clone())
    }
}
