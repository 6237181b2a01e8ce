use hdfs_store_backend::{
    ConnectionOptions, HdfsStoreBackend, Location, OpenMode, RemoteFilesystem, StorageOptions,
    StoreBackend, StoreError, WebHdfsClient, WebHdfsConnector,
};
use httpmock::prelude::*;
use serde_json::json;
use std::collections::HashMap;
use std::io::{Read, Write};

fn options(server: &MockServer, user: Option<&str>, connect: bool) -> ConnectionOptions {
    ConnectionOptions {
        host: Some(server.host()),
        port: Some(server.port()),
        user: user.map(str::to_string),
        connect,
        ..ConnectionOptions::default()
    }
}

#[tokio::test]
async fn test_configure_resolves_home_and_creates_cachedir() {
    let server = MockServer::start_async().await;

    let home_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/webhdfs/v1/")
                .query_param("op", "GETHOMEDIRECTORY")
                .query_param("user.name", "alice");
            then.status(200).json_body(json!({"Path": "/user/alice"}));
        })
        .await;
    let data_mock = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/webhdfs/v1/user/alice/data")
                .query_param("op", "MKDIRS")
                .query_param("user.name", "alice");
            then.status(200).json_body(json!({"boolean": true}));
        })
        .await;
    let cachedir_mock = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/webhdfs/v1/user/alice/data/joblib")
                .query_param("op", "MKDIRS");
            then.status(200).json_body(json!({"boolean": true}));
        })
        .await;

    let mut backend = HdfsStoreBackend::new(WebHdfsConnector::new());
    backend
        .configure(
            Location::Path("/data"),
            &options(&server, Some("alice"), true),
            &StorageOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(backend.cachedir(), Some("data/joblib"));
    // the home directory is looked up once and cached
    home_mock.assert_hits_async(1).await;
    data_mock.assert_async().await;
    cachedir_mock.assert_async().await;
}

#[tokio::test]
async fn test_write_and_read_follow_datanode_redirects() {
    let server = MockServer::start_async().await;

    let create_mock = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/webhdfs/v1/cache/joblib/blob")
                .query_param("op", "CREATE")
                .query_param("overwrite", "true");
            then.status(307)
                .header("Location", server.url("/datanode/create"));
        })
        .await;
    let upload_mock = server
        .mock_async(|when, then| {
            when.method(PUT).path("/datanode/create").body("payload");
            then.status(201);
        })
        .await;
    let open_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/webhdfs/v1/cache/joblib/blob")
                .query_param("op", "OPEN");
            then.status(307).header("Location", server.url("/datanode/open"));
        })
        .await;
    let download_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/datanode/open");
            then.status(200).body("payload");
        })
        .await;

    let client = WebHdfsClient::connect(&options(&server, None, false), None)
        .await
        .unwrap();

    let mut file = client.open("/cache/joblib/blob", OpenMode::Write).await.unwrap();
    file.write_all(b"payload").unwrap();
    client.close(file).await.unwrap();

    let mut reader = client.open("/cache/joblib/blob", OpenMode::Read).await.unwrap();
    let mut content = String::new();
    reader.read_to_string(&mut content).unwrap();

    assert_eq!(content, "payload");
    create_mock.assert_async().await;
    upload_mock.assert_async().await;
    open_mock.assert_async().await;
    download_mock.assert_async().await;
}

#[tokio::test]
async fn test_exists_maps_not_found_to_false() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/webhdfs/v1/present")
                .query_param("op", "GETFILESTATUS");
            then.status(200).json_body(json!({"FileStatus": {"type": "DIRECTORY"}}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/webhdfs/v1/absent")
                .query_param("op", "GETFILESTATUS");
            then.status(404).json_body(json!({
                "RemoteException": {
                    "exception": "FileNotFoundException",
                    "javaClassName": "java.io.FileNotFoundException",
                    "message": "File does not exist: /absent"
                }
            }));
        })
        .await;

    let client = WebHdfsClient::connect(&options(&server, None, false), None)
        .await
        .unwrap();

    assert!(client.exists("/present").await.unwrap());
    assert!(!client.exists("/absent").await.unwrap());
}

#[tokio::test]
async fn test_clear_location_of_missing_path_is_noop() {
    let server = MockServer::start_async().await;

    let home_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/webhdfs/v1/")
                .query_param("op", "GETHOMEDIRECTORY");
            then.status(200).json_body(json!({"Path": "/user/etl"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(PUT).query_param("op", "MKDIRS");
            then.status(200).json_body(json!({"boolean": true}));
        })
        .await;
    let delete_mock = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/webhdfs/v1/user/etl/cache/joblib")
                .query_param("op", "DELETE")
                .query_param("recursive", "true");
            then.status(200).json_body(json!({"boolean": false}));
        })
        .await;

    let mut backend = HdfsStoreBackend::new(WebHdfsConnector::new());
    backend
        .configure(
            Location::Path("cache"),
            &options(&server, Some("etl"), false),
            &StorageOptions::default(),
        )
        .await
        .unwrap();

    backend.clear_location("cache/joblib").await.unwrap();
    delete_mock.assert_hits_async(1).await;
    home_mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_permission_denied_becomes_directory_creation_failure() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/webhdfs/v1/restricted")
                .query_param("op", "MKDIRS");
            then.status(403).json_body(json!({
                "RemoteException": {
                    "exception": "AccessControlException",
                    "javaClassName": "org.apache.hadoop.security.AccessControlException",
                    "message": "Permission denied: user=etl, access=WRITE"
                }
            }));
        })
        .await;

    let client = WebHdfsClient::connect(&options(&server, Some("etl"), false), None)
        .await
        .unwrap();

    let err = hdfs_store_backend::core::hdfs_backend::mkdirp(&client, "/restricted/cache")
        .await
        .unwrap_err();
    match err {
        StoreError::DirectoryCreationFailure { path, reason } => {
            assert_eq!(path, "/restricted");
            assert!(reason.contains("Permission denied"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_token_and_extra_parameters_are_sent() {
    let server = MockServer::start_async().await;

    let mkdir_mock = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/webhdfs/v1/tmp/x")
                .query_param("op", "MKDIRS")
                .query_param("delegation", "dt-secret")
                .query_param("doas", "reporting");
            then.status(200).json_body(json!({"boolean": true}));
        })
        .await;

    let mut opts = options(&server, Some("alice"), false);
    opts.token = Some("dt-secret".to_string());
    opts.pars = HashMap::from([("doas".to_string(), "reporting".to_string())]);
    let client = WebHdfsClient::connect(&opts, None).await.unwrap();

    client.mkdir("/tmp/x").await.unwrap();
    mkdir_mock.assert_async().await;
}

#[tokio::test]
async fn test_rename_refused_is_remote_error() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/webhdfs/v1/a")
                .query_param("op", "RENAME")
                .query_param("destination", "/b");
            then.status(200).json_body(json!({"boolean": false}));
        })
        .await;

    let client = WebHdfsClient::connect(&options(&server, None, false), None)
        .await
        .unwrap();

    assert!(matches!(
        client.rename("/a", "/b").await,
        Err(StoreError::RemoteError { .. })
    ));
}

#[tokio::test]
async fn test_unreachable_namenode_is_connection_failure() {
    let opts = ConnectionOptions {
        host: Some("127.0.0.1".to_string()),
        port: Some(1),
        connect: true,
        ..ConnectionOptions::default()
    };

    let mut backend = HdfsStoreBackend::new(WebHdfsConnector::new());
    let result = backend
        .configure(Location::Path("/data"), &opts, &StorageOptions::default())
        .await;

    assert!(matches!(result, Err(StoreError::ConnectionFailure { .. })));
}

#[tokio::test]
async fn test_deferred_connection_reports_unavailable_storage() {
    let opts = ConnectionOptions {
        host: Some("127.0.0.1".to_string()),
        port: Some(1),
        connect: false,
        ..ConnectionOptions::default()
    };

    let client = WebHdfsClient::connect(&opts, None).await.unwrap();
    assert!(matches!(
        client.rm("/data/joblib", true).await,
        Err(StoreError::StorageUnavailable { .. })
    ));
}

#[tokio::test]
async fn test_transport_errors_do_not_reveal_token() {
    let opts = ConnectionOptions {
        host: Some("127.0.0.1".to_string()),
        port: Some(1),
        token: Some("dt-SECRET-123".to_string()),
        connect: false,
        ..ConnectionOptions::default()
    };

    let client = WebHdfsClient::connect(&opts, None).await.unwrap();
    let err = client.rm("/data/joblib", true).await.unwrap_err();

    assert!(matches!(err, StoreError::StorageUnavailable { .. }));
    assert!(!err.to_string().contains("dt-SECRET-123"));
    assert!(!format!("{err:?}").contains("dt-SECRET-123"));
    assert!(!format!("{client:?}").contains("dt-SECRET-123"));
}

#[tokio::test]
async fn test_malformed_response_does_not_reveal_token() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/webhdfs/v1/tmp/x")
                .query_param("op", "MKDIRS");
            then.status(200).body("<html>gateway</html>");
        })
        .await;

    let mut opts = options(&server, None, false);
    opts.token = Some("dt-SECRET-123".to_string());
    let client = WebHdfsClient::connect(&opts, None).await.unwrap();

    let err = client.mkdir("/tmp/x").await.unwrap_err();
    assert!(matches!(err, StoreError::HttpError(_)));
    assert!(!err.to_string().contains("dt-SECRET-123"));
    assert!(!format!("{err:?}").contains("dt-SECRET-123"));
}

#[tokio::test]
async fn test_exception_name_wins_over_status() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/webhdfs/v1/cache/blob")
                .query_param("op", "CREATE");
            then.status(403).json_body(json!({
                "RemoteException": {
                    "exception": "FileAlreadyExistsException",
                    "javaClassName": "org.apache.hadoop.fs.FileAlreadyExistsException",
                    "message": "/cache/blob for client 10.0.0.7 already exists"
                }
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/webhdfs/v1/cache/standby")
                .query_param("op", "OPEN");
            then.status(403).json_body(json!({
                "RemoteException": {
                    "exception": "StandbyException",
                    "javaClassName": "org.apache.hadoop.ipc.StandbyException",
                    "message": "Operation category READ is not supported in state standby"
                }
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/webhdfs/v1/cache/gone")
                .query_param("op", "OPEN");
            then.status(500).json_body(json!({
                "RemoteException": {
                    "exception": "FileNotFoundException",
                    "javaClassName": "java.io.FileNotFoundException",
                    "message": "File /cache/gone not found"
                }
            }));
        })
        .await;

    let client = WebHdfsClient::connect(&options(&server, None, false), None)
        .await
        .unwrap();

    assert!(matches!(
        client.write("/cache/blob", b"payload").await,
        Err(StoreError::AlreadyExists { .. })
    ));
    assert!(matches!(
        client.read("/cache/standby").await,
        Err(StoreError::StorageUnavailable { .. })
    ));
    assert!(matches!(
        client.read("/cache/gone").await,
        Err(StoreError::NotFound { .. })
    ));
}
