use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Cursor, Read, Write};

/// Directory segment appended to every configured location.
pub const NAMESPACE: &str = "joblib";

#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionOptions {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub ticket_cache: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// Extra parameters handed to the client untouched.
    #[serde(default)]
    pub pars: HashMap<String, String>,
    /// Connect eagerly during `configure`; otherwise on first use.
    #[serde(default = "default_connect")]
    pub connect: bool,
    #[serde(default)]
    pub use_tls: bool,
}

fn default_connect() -> bool {
    true
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            user: None,
            ticket_cache: None,
            token: None,
            pars: HashMap::new(),
            connect: true,
            use_tls: false,
        }
    }
}

// Credentials end up in debug logs of the whole store config, so they are
// masked here.
impl fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("ticket_cache", &self.ticket_cache.as_ref().map(|_| "<redacted>"))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("pars", &self.pars)
            .field("connect", &self.connect)
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

/// Authentication material carried by [`ConnectionOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth<'a> {
    Token(&'a str),
    TicketCache(&'a str),
    Anonymous,
}

impl ConnectionOptions {
    /// At most one method is expected. When both are supplied the delegation
    /// token wins.
    pub fn auth(&self) -> Auth<'_> {
        match (&self.token, &self.ticket_cache) {
            (Some(token), _) => Auth::Token(token),
            (None, Some(cache)) => Auth::TicketCache(cache),
            (None, None) => Auth::Anonymous,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageOptions {
    /// Advisory: results may be stored compressed by the serializer upstream.
    #[serde(default)]
    pub compress: bool,
    /// Requested memory-mapping mode. Never honoured by remote backends.
    #[serde(default)]
    pub mmap_mode: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    Append,
}

impl OpenMode {
    pub fn is_writable(self) -> bool {
        !matches!(self, OpenMode::Read)
    }
}

/// A stored object opened through a remote filesystem.
///
/// Reads are served from the bytes fetched at open time. Writes are buffered
/// and only reach the filesystem when the file is closed through the client
/// that opened it.
#[derive(Debug)]
pub struct RemoteFile {
    path: String,
    mode: OpenMode,
    cursor: Cursor<Vec<u8>>,
}

impl RemoteFile {
    pub fn reader(path: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            mode: OpenMode::Read,
            cursor: Cursor::new(data),
        }
    }

    pub fn writer(path: impl Into<String>, mode: OpenMode) -> Self {
        Self {
            path: path.into(),
            mode,
            cursor: Cursor::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.cursor.into_inner()
    }
}

impl Read for RemoteFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.mode.is_writable() {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("{} is not open for reading", self.path),
            ));
        }
        self.cursor.read(buf)
    }
}

impl Write for RemoteFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.mode.is_writable() {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("{} is not open for writing", self.path),
            ));
        }
        self.cursor.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// One cached item as reported by a backend able to enumerate its store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheItemInfo {
    pub path: String,
    pub size: u64,
    pub last_access: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemInfo {
    pub location: String,
}
