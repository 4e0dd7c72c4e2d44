mod common;

use common::{lifecycle, new_request};
use icbb_requests::domain::reference::{ReferenceCode, ReferenceSource};
use icbb_requests::domain::request::ServiceType;
use icbb_requests::error::{Result, TrackerError};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

#[tokio::test]
async fn test_ten_thousand_unique_references() {
    let (lifecycle, _) = lifecycle();
    let format = Regex::new(r"^ICBB-\d{4}-[A-Z0-9]{6}$").unwrap();

    let mut seen = HashSet::new();
    for _ in 0..10_000 {
        let request = lifecycle
            .submit(new_request(ServiceType::DataAnalysis))
            .await
            .unwrap();
        assert!(format.is_match(request.reference.as_str()));
        assert!(seen.insert(request.reference));
    }
    assert_eq!(seen.len(), 10_000);
}

/// Always hands out the same reference.
struct Stuck;

impl ReferenceSource for Stuck {
    fn next(&self, _: &str, _: NaiveDate) -> Result<ReferenceCode> {
        ReferenceCode::parse("ICBB-2402-AAAAAA")
    }
}

/// Repeats the first reference `repeats` times, then counts upwards.
struct Colliding {
    repeats: usize,
    calls: AtomicUsize,
}

impl ReferenceSource for Colliding {
    fn next(&self, _: &str, _: NaiveDate) -> Result<ReferenceCode> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let suffix = call.saturating_sub(self.repeats);
        ReferenceCode::parse(&format!("ICBB-2402-{suffix:06}"))
    }
}

#[tokio::test]
async fn test_collision_is_retried() {
    let (lifecycle, _) = lifecycle();
    let lifecycle = lifecycle.with_reference_source(Box::new(Colliding {
        repeats: 3,
        calls: AtomicUsize::new(0),
    }));

    let first = lifecycle
        .submit(new_request(ServiceType::DataAnalysis))
        .await
        .unwrap();
    let second = lifecycle
        .submit(new_request(ServiceType::DataAnalysis))
        .await
        .unwrap();
    assert_eq!(first.reference.as_str(), "ICBB-2402-000000");
    assert_eq!(second.reference.as_str(), "ICBB-2402-000001");
}

#[tokio::test]
async fn test_generation_exhausted() {
    let (lifecycle, _) = lifecycle();
    let lifecycle = lifecycle.with_reference_source(Box::new(Stuck));

    lifecycle
        .submit(new_request(ServiceType::DataAnalysis))
        .await
        .unwrap();
    let err = lifecycle
        .submit(new_request(ServiceType::DataAnalysis))
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::GenerationExhausted { attempts: 5 }));
}

#[tokio::test]
async fn test_explicit_duplicate_reference_rejected() {
    let (lifecycle, _) = lifecycle();
    let mut input = new_request(ServiceType::DataAnalysis);
    input.reference = Some(ReferenceCode::parse("ICBB-2402-ABC123").unwrap());

    lifecycle.submit(input.clone()).await.unwrap();
    assert!(matches!(
        lifecycle.submit(input).await,
        Err(TrackerError::DuplicateReference(_))
    ));
}
