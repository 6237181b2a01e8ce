use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to connect to remote filesystem: {message}")]
    ConnectionFailure { message: String },

    #[error("Failed to create directory '{path}': {reason}")]
    DirectoryCreationFailure { path: String, reason: String },

    #[error("Remote storage unavailable: {message}")]
    StorageUnavailable { message: String },

    #[error("Path not found: {path}")]
    NotFound { path: String },

    #[error("Path already exists: {path}")]
    AlreadyExists { path: String },

    #[error("Permission denied on '{path}': {message}")]
    PermissionDenied { path: String, message: String },

    #[error("Cache item not found: {path}")]
    ItemNotFound { path: String },

    #[error("Remote {operation} failed on '{path}': {message}")]
    RemoteError {
        operation: String,
        path: String,
        message: String,
    },

    #[error("Store backend is not configured")]
    NotConfigured,

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl StoreError {
    /// True for failures that mean the cluster could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            StoreError::ConnectionFailure { .. } | StoreError::StorageUnavailable { .. }
        )
    }

    /// Exit code used by the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            StoreError::ConnectionFailure { .. } | StoreError::StorageUnavailable { .. } => 3,
            StoreError::ConfigError { .. }
            | StoreError::InvalidConfigValueError { .. }
            | StoreError::MissingConfigError { .. }
            | StoreError::NotConfigured => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
