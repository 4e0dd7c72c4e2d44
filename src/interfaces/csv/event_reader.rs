use crate::domain::lifecycle::LifecycleEvent;
use crate::domain::reference::ReferenceCode;
use crate::domain::request::{FileDescriptor, FulfillmentStatus, NewServiceRequest, ServiceType};
use crate::error::{Result, TrackerError};
use chrono::Utc;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Submit,
    Initiate,
    Confirm,
    Status,
    Upload,
}

/// One line of an event log.
///
/// `value` carries the event's argument: the description for `submit`, the payer's
/// number for `initiate`, the transaction id for `confirm`, the target status for
/// `status` and the file names for `upload`, separated by `;`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct EventRow {
    pub event: EventKind,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub service_type: Option<ServiceType>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum ReplayCommand {
    Submit(NewServiceRequest),
    Apply {
        reference: ReferenceCode,
        event: LifecycleEvent,
    },
}

impl TryFrom<EventRow> for ReplayCommand {
    type Error = TrackerError;

    fn try_from(row: EventRow) -> Result<Self> {
        let reference = row
            .reference
            .as_deref()
            .filter(|reference| !reference.is_empty())
            .map(ReferenceCode::parse)
            .transpose()?;
        let value = row.value.unwrap_or_default();
        let required = |reference: Option<ReferenceCode>| {
            reference.ok_or_else(|| TrackerError::validation("reference", "required"))
        };

        let (reference, event) = match row.event {
            EventKind::Submit => {
                let service_type = row.service_type.ok_or_else(|| {
                    TrackerError::validation("service_type", "required for submit")
                })?;
                let mut input = NewServiceRequest::new(
                    row.client_name.unwrap_or_default(),
                    row.client_email.unwrap_or_default(),
                    service_type,
                    value,
                );
                input.reference = reference;
                return Ok(Self::Submit(input));
            }
            EventKind::Initiate => (
                required(reference)?,
                LifecycleEvent::InitiatePayment { momo_number: value },
            ),
            EventKind::Confirm => (
                required(reference)?,
                LifecycleEvent::ConfirmPayment {
                    transaction_id: value,
                },
            ),
            EventKind::Status => (
                required(reference)?,
                LifecycleEvent::SetStatus {
                    target: parse_status(&value)?,
                    admin_notes: None,
                },
            ),
            EventKind::Upload => {
                let reference = required(reference)?;
                let files = value
                    .split(';')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(|name| result_file(&reference, name))
                    .collect();
                (reference, LifecycleEvent::UploadResult { files })
            }
        };
        Ok(Self::Apply { reference, event })
    }
}

fn parse_status(value: &str) -> Result<FulfillmentStatus> {
    FulfillmentStatus::ALL
        .into_iter()
        .find(|status| status.as_str() == value)
        .ok_or_else(|| TrackerError::validation("status", format!("unknown status '{value}'")))
}

fn result_file(reference: &ReferenceCode, name: &str) -> FileDescriptor {
    FileDescriptor {
        filename: format!("{reference}-{name}"),
        path: format!("results/{reference}/{name}"),
        original_name: name.to_string(),
        size: 0,
        mimetype: "application/octet-stream".to_string(),
        uploaded_at: Utc::now(),
    }
}

/// Reads lifecycle events from a CSV source.
///
/// Wraps `csv::Reader`, trimming whitespace and accepting short records.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads rows and turns each into a command.
    pub fn commands(self) -> impl Iterator<Item = Result<ReplayCommand>> {
        self.reader.into_deserialize().map(|row| {
            let row: EventRow = row?;
            ReplayCommand::try_from(row)
        })
    }
}
