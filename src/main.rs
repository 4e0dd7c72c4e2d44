use clap::Parser;
use icbb_requests::application::dispatcher::NotificationDispatcher;
use icbb_requests::application::lifecycle::RequestLifecycle;
use icbb_requests::config::TrackerConfig;
use icbb_requests::domain::caller::Caller;
use icbb_requests::domain::ports::{RequestFilter, RequestStoreBox};
use icbb_requests::infrastructure::channels::LogChannel;
use icbb_requests::infrastructure::in_memory::InMemoryRequestStore;
#[cfg(feature = "storage-rocksdb")]
use icbb_requests::infrastructure::rocksdb::RocksDBStore;
use icbb_requests::interfaces::csv::event_reader::{EventReader, ReplayCommand};
use icbb_requests::interfaces::csv::request_writer::RequestWriter;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input events CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

fn open_store(db_path: Option<PathBuf>) -> Result<RequestStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(Box::new(RocksDBStore::open(path).into_diagnostic()?)),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryRequestStore::new()))
        }
        None => Ok(Box::new(InMemoryRequestStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = TrackerConfig::from_env().into_diagnostic()?;

    let store = open_store(cli.db_path)?;
    let dispatcher = Arc::new(NotificationDispatcher::spawn(
        Arc::new(LogChannel),
        config.operator_email.clone(),
        config.notifications.clone(),
    ));
    let lifecycle = RequestLifecycle::new(store, dispatcher, config);
    let operator = Caller::admin("replay");

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = EventReader::new(file);
    for command in reader.commands() {
        let outcome = match command {
            Ok(ReplayCommand::Submit(input)) => lifecycle.submit(input).await.map(|_| ()),
            Ok(ReplayCommand::Apply { reference, event }) => lifecycle
                .handle(&operator, reference.into(), event)
                .await
                .map(|_| ()),
            Err(e) => {
                eprintln!("Error reading event: {}", e);
                continue;
            }
        };
        if let Err(e) = outcome {
            eprintln!("Error processing event: {}", e);
        }
    }
    lifecycle.dispatcher().shutdown().await;

    let mut requests = Vec::new();
    let mut filter = RequestFilter::default();
    loop {
        let page = lifecycle.list(&operator, &filter).await.into_diagnostic()?;
        let last = u64::from(page.page) >= page.pages;
        requests.extend(page.items);
        if last {
            break;
        }
        filter.page += 1;
    }

    let stdout = io::stdout();
    let mut writer = RequestWriter::new(stdout.lock());
    writer.write_requests(&requests).into_diagnostic()?;

    Ok(())
}
