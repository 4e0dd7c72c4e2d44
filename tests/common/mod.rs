#![allow(dead_code)]

use chrono::Utc;
use icbb_requests::application::dispatcher::NotificationDispatcher;
use icbb_requests::application::lifecycle::RequestLifecycle;
use icbb_requests::config::{DispatchConfig, TrackerConfig};
use icbb_requests::domain::ports::{NotificationChannel, RequestStoreBox};
use icbb_requests::domain::request::{FileDescriptor, NewServiceRequest, ServiceType};
use icbb_requests::infrastructure::channels::InMemoryChannel;
use icbb_requests::infrastructure::in_memory::InMemoryRequestStore;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const MOMO_NUMBER: &str = "0241234567";
pub const TRANSACTION_ID: &str = "MP240210.1234.A12345";

pub fn fast_dispatch() -> DispatchConfig {
    DispatchConfig {
        attempts: 3,
        send_timeout: Duration::from_millis(50),
        retry_backoff: Duration::from_millis(1),
        ..DispatchConfig::default()
    }
}

pub fn lifecycle_with(channel: Arc<dyn NotificationChannel>) -> RequestLifecycle {
    lifecycle_over(Box::new(InMemoryRequestStore::new()), channel)
}

pub fn lifecycle_over(
    store: RequestStoreBox,
    channel: Arc<dyn NotificationChannel>,
) -> RequestLifecycle {
    let config = TrackerConfig {
        notifications: fast_dispatch(),
        ..TrackerConfig::default()
    };
    let dispatcher = NotificationDispatcher::spawn(
        channel,
        config.operator_email.clone(),
        config.notifications.clone(),
    );
    RequestLifecycle::new(store, Arc::new(dispatcher), config)
}

pub fn lifecycle() -> (RequestLifecycle, InMemoryChannel) {
    let channel = InMemoryChannel::new();
    (lifecycle_with(Arc::new(channel.clone())), channel)
}

pub fn new_request(service_type: ServiceType) -> NewServiceRequest {
    NewServiceRequest::new(
        "Ama Mensah",
        "ama@ug.edu.gh",
        service_type,
        "Survival analysis of cohort data",
    )
}

pub fn result_file(name: &str) -> FileDescriptor {
    FileDescriptor {
        filename: format!("{name}-stored"),
        original_name: name.to_string(),
        path: format!("results/{name}"),
        size: 2048,
        mimetype: "application/pdf".to_string(),
        uploaded_at: Utc::now(),
    }
}

/// Writes an event log that submits `rows` requests and pays for every one of them.
pub fn generate_events_csv(path: &Path, rows: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record([
        "event",
        "reference",
        "service_type",
        "client_name",
        "client_email",
        "value",
    ])?;

    for i in 1..=rows {
        let reference = format!("ICBB-2402-{i:06}");
        wtr.write_record([
            "submit",
            &reference,
            "paper-review",
            "Kofi Boateng",
            "kofi@knust.edu.gh",
            "Review my manuscript",
        ])?;
        wtr.write_record(["confirm", &reference, "", "", "", &format!("TX{i}")])?;
    }

    wtr.flush()?;
    Ok(())
}
