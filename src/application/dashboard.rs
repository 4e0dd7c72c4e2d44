use super::intake::{IntakeCounts, RegistrationDesk};
use super::lifecycle::{RequestLifecycle, RequestStats};
use crate::domain::caller::Caller;
use crate::error::Result;
use serde::Serialize;

/// Operator overview across requests, registrations and contact messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub requests: RequestStats,
    pub intake: IntakeCounts,
}

pub async fn overview(
    caller: &Caller,
    lifecycle: &RequestLifecycle,
    desk: &RegistrationDesk,
) -> Result<Dashboard> {
    Ok(Dashboard {
        requests: lifecycle.stats(caller).await?,
        intake: desk.counts(caller).await?,
    })
}
