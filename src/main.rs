use anyhow::Context;
use clap::Parser;
use hdfs_store_backend::config::{Command, StoreConfig};
use hdfs_store_backend::utils::logger;
use hdfs_store_backend::{
    Cli, Connector, HdfsStoreBackend, LocalConnector, Location, StoreBackend, StoreError,
    StoreManager, WebHdfsConnector,
};
use std::io::Write;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.store_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Invalid configuration: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    // 初始化日誌
    if config.log_format() == "json" {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose());
    }
    tracing::debug!("Store config: {:?}", config);

    let result = match &cli.local_root {
        Some(root) => {
            tracing::info!("📁 Using local root {}", root.display());
            run(LocalConnector::new(root.clone()), &cli.command, &config).await
        }
        None => {
            let mut connector = WebHdfsConnector::new();
            if let Some(timeout) = cli.timeout() {
                connector = connector.with_timeout(timeout);
            }
            run(connector, &cli.command, &config).await
        }
    };

    if let Err(e) = result {
        tracing::error!("❌ {:#}", e);
        eprintln!("❌ {:#}", e);
        let code = e
            .downcast_ref::<StoreError>()
            .map(StoreError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }

    Ok(())
}

async fn run<C: Connector>(
    connector: C,
    command: &Command,
    config: &StoreConfig,
) -> anyhow::Result<()> {
    let mut backend = HdfsStoreBackend::new(connector);
    backend
        .configure(
            Location::Path(&config.store.location),
            &config.connection,
            &config.storage,
        )
        .await
        .with_context(|| format!("failed to configure store at {}", config.store.location))?;
    for warning in backend.warnings() {
        eprintln!("⚠️  {}", warning);
    }

    match command {
        Command::Init => {
            println!("✅ {}", backend);
        }
        Command::Mkdir { path } => {
            backend.create_location(path).await?;
            println!("✅ Created {}", path);
        }
        Command::Clear { path: Some(path) } => {
            backend.clear_location(path).await?;
            println!("🧹 Cleared {}", path);
        }
        Command::Clear { path: None } => {
            backend.clear().await?;
            println!("🧹 Cleared {}", backend.cachedir().unwrap_or_default());
        }
        Command::Exists { path } => {
            let exists = backend.object_exists(path).await?;
            println!("{}", exists);
            if !exists {
                std::process::exit(1);
            }
        }
        Command::Cat { item } => {
            let segments: Vec<&str> = item.iter().map(String::as_str).collect();
            let data = backend.load_item(&segments).await?;
            std::io::stdout().write_all(&data)?;
        }
        Command::Put { file, item } => {
            let segments: Vec<&str> = item.iter().map(String::as_str).collect();
            let data = tokio::fs::read(file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            backend.dump_item(&segments, &data).await?;
            println!("✅ Stored {} bytes at {}", data.len(), backend.item_path(&segments)?);
        }
        Command::Items => {
            let items = backend.get_cache_items().await?;
            if items.is_empty() {
                println!("No cache items reported by this backend");
            }
            for item in items {
                println!("{}\t{}\t{}", item.path, item.size, item.last_access);
            }
        }
        Command::Reduce { bytes_limit } => {
            let limit = bytes_limit.or(config.store.bytes_limit);
            let removed = backend.reduce_size(limit).await?;
            println!("🧹 Removed {} items", removed);
        }
    }

    Ok(())
}
