//! HDFS client speaking the WebHDFS REST protocol.
//!
//! Requests go to the NameNode at `/webhdfs/v1/<path>?op=...`. Data-bearing
//! operations (`OPEN`, `CREATE`, `APPEND`) answer with a redirect to a
//! DataNode, which is followed by hand so the payload is only ever sent to
//! the DataNode.

use crate::domain::model::{Auth, ConnectionOptions};
use crate::domain::ports::{Connector, RemoteFilesystem};
use crate::utils::error::{Result, StoreError};
use crate::utils::path;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

pub const DEFAULT_PORT: u16 = 9870;
pub const DEFAULT_HOST: &str = "localhost";
const API_PREFIX: &str = "/webhdfs/v1";

#[derive(Debug, Deserialize)]
struct BooleanResponse {
    boolean: bool,
}

#[derive(Debug, Deserialize)]
struct PathResponse {
    #[serde(rename = "Path")]
    path: String,
}

#[derive(Debug, Deserialize)]
struct RemoteExceptionBody {
    #[serde(rename = "RemoteException")]
    remote_exception: RemoteException,
}

#[derive(Debug, Deserialize)]
struct RemoteException {
    exception: String,
    message: String,
}

#[derive(Debug, Clone, Default)]
pub struct WebHdfsConnector {
    timeout: Option<Duration>,
}

impl WebHdfsConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Connector for WebHdfsConnector {
    type Filesystem = WebHdfsClient;

    async fn connect(&self, options: &ConnectionOptions) -> Result<WebHdfsClient> {
        WebHdfsClient::connect(options, self.timeout).await
    }
}

/// Every request carries `params` (auth plus pass-through `pars`) on its
/// query string. reqwest errors are stripped of their URL before they leave
/// this module so a delegation token never shows up in error text.
pub struct WebHdfsClient {
    http: Client,
    base_url: Url,
    params: Vec<(String, String)>,
    home: OnceCell<String>,
}

impl fmt::Debug for WebHdfsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<&str> = self.params.iter().map(|(key, _)| key.as_str()).collect();
        f.debug_struct("WebHdfsClient")
            .field("base_url", &self.base_url.as_str())
            .field("params", &params)
            .field("home", &self.home.get())
            .finish()
    }
}

fn http_error(err: reqwest::Error) -> StoreError {
    StoreError::HttpError(err.without_url())
}

impl WebHdfsClient {
    /// Builds a client from connection options, probing the NameNode when
    /// `options.connect` is set.
    pub async fn connect(options: &ConnectionOptions, timeout: Option<Duration>) -> Result<Self> {
        let client = Self::build(options, timeout)?;

        if options.connect {
            let home = client
                .home_directory()
                .await
                .map_err(|e| StoreError::ConnectionFailure {
                    message: format!("{} ({})", client.base_url, e),
                })?;
            tracing::info!("Connected to {} (home directory {})", client.base_url, home);
        } else {
            tracing::debug!("Deferring connection to {}", client.base_url);
        }

        Ok(client)
    }

    fn build(options: &ConnectionOptions, timeout: Option<Duration>) -> Result<Self> {
        let scheme = if options.use_tls { "https" } else { "http" };
        let host = options.host.as_deref().unwrap_or(DEFAULT_HOST);
        let port = options.port.unwrap_or(DEFAULT_PORT);

        let base_url = Url::parse(&format!("{}://{}:{}{}", scheme, host, port, API_PREFIX))
            .map_err(|e| StoreError::ConnectionFailure {
                message: format!("invalid namenode address {}:{}: {}", host, port, e),
            })?;

        let mut params = Vec::new();
        match options.auth() {
            Auth::Token(token) => params.push(("delegation".to_string(), token.to_string())),
            Auth::TicketCache(cache) => {
                return Err(StoreError::ConnectionFailure {
                    message: format!(
                        "ticket cache {} requires Kerberos SPNEGO, which this client does not \
                         negotiate; supply a delegation token instead",
                        cache
                    ),
                });
            }
            Auth::Anonymous => {
                if let Some(user) = &options.user {
                    params.push(("user.name".to_string(), user.clone()));
                }
            }
        }

        // sorted so request URLs are stable
        let pars: BTreeMap<_, _> = options.pars.iter().collect();
        for (key, value) in pars {
            params.push((key.clone(), value.clone()));
        }

        let mut builder = Client::builder().redirect(Policy::none());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| StoreError::ConnectionFailure {
            message: format!("failed to build HTTP client: {}", e),
        })?;

        Ok(Self {
            http,
            base_url,
            params,
            home: OnceCell::new(),
        })
    }

    /// Home directory of the authenticated user; relative paths resolve against it.
    pub async fn home_directory(&self) -> Result<String> {
        let home = self
            .home
            .get_or_try_init(|| async {
                let url = self.op_url("/", "GETHOMEDIRECTORY", &[])?;
                let response = self
                    .send(self.http.get(url), "GETHOMEDIRECTORY", "/")
                    .await?;
                let body: PathResponse = response.json().await.map_err(http_error)?;
                Ok::<_, StoreError>(body.path)
            })
            .await?;
        Ok(home.clone())
    }

    async fn resolve(&self, path: &str) -> Result<String> {
        let normalized = path::normalize(path);
        if normalized.starts_with('/') {
            Ok(normalized)
        } else {
            Ok(path::join_path(&self.home_directory().await?, &normalized))
        }
    }

    fn op_url(&self, absolute_path: &str, op: &str, extra: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::ConnectionFailure {
                    message: format!("{} cannot carry a path", self.base_url),
                })?;
            segments.pop_if_empty();
            let mut pushed = false;
            for segment in absolute_path.split('/').filter(|s| !s.is_empty()) {
                segments.push(segment);
                pushed = true;
            }
            if !pushed {
                segments.push("");
            }
        }
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("op", op);
            for (key, value) in extra {
                query.append_pair(key, value);
            }
            for (key, value) in &self.params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        operation: &str,
        path: &str,
    ) -> Result<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() || e.is_request() {
                StoreError::StorageUnavailable {
                    message: format!("{} {}: {}", operation, path, e.without_url()),
                }
            } else {
                http_error(e)
            }
        })?;

        let status = response.status();
        if status.is_success() || status.is_redirection() {
            return Ok(response);
        }
        Err(Self::status_error(response, operation, path).await)
    }

    async fn status_error(response: Response, operation: &str, path: &str) -> StoreError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let (exception, message) = match serde_json::from_str::<RemoteExceptionBody>(&body) {
            Ok(parsed) => (
                parsed.remote_exception.exception,
                parsed.remote_exception.message,
            ),
            Err(_) => (String::new(), body),
        };

        tracing::debug!("WebHDFS {} {} failed with {}: {}", operation, path, status, message);

        // The exception name is more precise than the status: the NameNode
        // answers 403 for FileAlreadyExistsException, for one.
        match exception.as_str() {
            "FileAlreadyExistsException" => {
                return StoreError::AlreadyExists {
                    path: path.to_string(),
                }
            }
            "FileNotFoundException" => {
                return StoreError::NotFound {
                    path: path.to_string(),
                }
            }
            "AccessControlException" => {
                return StoreError::PermissionDenied {
                    path: path.to_string(),
                    message,
                }
            }
            "StandbyException" | "SafeModeException" | "RetriableException" => {
                return StoreError::StorageUnavailable {
                    message: format!("{} {}: {}", operation, path, message),
                }
            }
            _ => {}
        }

        match status {
            StatusCode::NOT_FOUND => StoreError::NotFound {
                path: path.to_string(),
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::PermissionDenied {
                path: path.to_string(),
                message,
            },
            StatusCode::SERVICE_UNAVAILABLE => StoreError::StorageUnavailable {
                message: format!("{} {}: {}", operation, path, message),
            },
            _ => StoreError::RemoteError {
                operation: operation.to_string(),
                path: path.to_string(),
                message: format!("{}: {}", status, message),
            },
        }
    }

    fn redirect_target(response: &Response, operation: &str, path: &str) -> Result<Option<Url>> {
        if !response.status().is_redirection() {
            return Ok(None);
        }
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| StoreError::RemoteError {
                operation: operation.to_string(),
                path: path.to_string(),
                message: "redirect without a Location header".to_string(),
            })?;
        let url = Url::parse(location).map_err(|e| StoreError::RemoteError {
            operation: operation.to_string(),
            path: path.to_string(),
            message: format!("invalid redirect location {}: {}", location, e),
        })?;
        Ok(Some(url))
    }

    async fn boolean_op(
        &self,
        method: Method,
        path: &str,
        op: &str,
        extra: &[(&str, &str)],
    ) -> Result<bool> {
        let url = self.op_url(path, op, extra)?;
        tracing::debug!("WebHDFS {} {}", op, path);
        let response = self.send(self.http.request(method, url), op, path).await?;
        let body: BooleanResponse = response.json().await.map_err(http_error)?;
        Ok(body.boolean)
    }

    async fn upload(
        &self,
        method: Method,
        path: &str,
        op: &str,
        extra: &[(&str, &str)],
        data: &[u8],
    ) -> Result<()> {
        let url = self.op_url(path, op, extra)?;
        tracing::debug!("WebHDFS {} {} ({} bytes)", op, path, data.len());
        let response = self
            .send(self.http.request(method.clone(), url), op, path)
            .await?;

        let target =
            Self::redirect_target(&response, op, path)?.ok_or_else(|| StoreError::RemoteError {
                operation: op.to_string(),
                path: path.to_string(),
                message: "namenode did not redirect to a datanode".to_string(),
            })?;

        let request = self
            .http
            .request(method, target)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(data.to_vec());
        self.send(request, op, path).await?;
        Ok(())
    }
}

impl RemoteFilesystem for WebHdfsClient {
    async fn mkdir(&self, path: &str) -> Result<()> {
        let path = self.resolve(path).await?;
        if self.boolean_op(Method::PUT, &path, "MKDIRS", &[]).await? {
            Ok(())
        } else {
            Err(StoreError::DirectoryCreationFailure {
                path,
                reason: "namenode refused to create the directory".to_string(),
            })
        }
    }

    async fn rm(&self, path: &str, recursive: bool) -> Result<()> {
        let path = self.resolve(path).await?;
        let recursive = if recursive { "true" } else { "false" };
        if self
            .boolean_op(Method::DELETE, &path, "DELETE", &[("recursive", recursive)])
            .await?
        {
            Ok(())
        } else {
            Err(StoreError::NotFound { path })
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let path = self.resolve(path).await?;
        let url = self.op_url(&path, "GETFILESTATUS", &[])?;
        match self.send(self.http.get(url), "GETFILESTATUS", &path).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let path = self.resolve(path).await?;
        let url = self.op_url(&path, "OPEN", &[])?;
        tracing::debug!("WebHDFS OPEN {}", path);
        let mut response = self.send(self.http.get(url), "OPEN", &path).await?;
        if let Some(target) = Self::redirect_target(&response, "OPEN", &path)? {
            response = self.send(self.http.get(target), "OPEN", &path).await?;
        }
        Ok(response.bytes().await.map_err(http_error)?.to_vec())
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(path).await?;
        self.upload(Method::PUT, &path, "CREATE", &[("overwrite", "true")], data)
            .await
    }

    async fn append(&self, path: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(path).await?;
        self.upload(Method::POST, &path, "APPEND", &[], data).await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from = self.resolve(from).await?;
        let to = self.resolve(to).await?;
        if self
            .boolean_op(Method::PUT, &from, "RENAME", &[("destination", to.as_str())])
            .await?
        {
            Ok(())
        } else {
            Err(StoreError::RemoteError {
                operation: "RENAME".to_string(),
                path: from,
                message: format!("namenode refused rename to {}", to),
            })
        }
    }
}
