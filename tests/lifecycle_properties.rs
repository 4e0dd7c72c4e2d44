use chrono::{Duration, TimeZone, Utc};
use icbb_requests::domain::lifecycle::{Decision, LifecycleEvent, decide};
use icbb_requests::domain::payment::{Amount, Payment};
use icbb_requests::domain::reference::ReferenceCode;
use icbb_requests::domain::request::{
    FileDescriptor, FulfillmentStatus, NewServiceRequest, ServiceRequest, ServiceType,
};
use proptest::prelude::*;
use rust_decimal_macros::dec;

fn fresh_request() -> ServiceRequest {
    let input = NewServiceRequest::new(
        "Ama Mensah",
        "ama@ug.edu.gh",
        ServiceType::DataAnalysis,
        "Survival analysis",
    );
    ServiceRequest::create(
        input,
        ReferenceCode::parse("ICBB-2402-ABC123").unwrap(),
        Payment::new(Amount::new(dec!(700)).unwrap(), "GHS"),
        Utc.with_ymd_and_hms(2024, 2, 10, 9, 0, 0).unwrap(),
    )
}

fn status_strategy() -> impl Strategy<Value = FulfillmentStatus> {
    prop::sample::select(FulfillmentStatus::ALL.to_vec())
}

fn event_strategy() -> impl Strategy<Value = LifecycleEvent> {
    prop_oneof![
        prop::sample::select(vec!["0241234567", "0551234567", "12345", ""]).prop_map(|number| {
            LifecycleEvent::InitiatePayment {
                momo_number: number.to_string(),
            }
        }),
        prop::sample::select(vec!["MP240210.1234.A12345", "TX-2", " "]).prop_map(|id| {
            LifecycleEvent::ConfirmPayment {
                transaction_id: id.to_string(),
            }
        }),
        status_strategy().prop_map(|target| LifecycleEvent::SetStatus {
            target,
            admin_notes: None,
        }),
        prop::collection::vec("[a-z]{1,8}\\.pdf", 0..12).prop_map(|names| {
            LifecycleEvent::UploadResult {
                files: names
                    .into_iter()
                    .map(|name| FileDescriptor {
                        filename: name.clone(),
                        path: format!("results/{name}"),
                        original_name: name,
                        size: 1,
                        mimetype: "application/pdf".to_string(),
                        uploaded_at: Utc.with_ymd_and_hms(2024, 2, 10, 9, 0, 0).unwrap(),
                    })
                    .collect(),
            }
        }),
    ]
}

proptest! {
    #[test]
    fn invariants_hold_after_every_event(events in prop::collection::vec(event_strategy(), 1..40)) {
        let start = Utc.with_ymd_and_hms(2024, 2, 10, 9, 0, 0).unwrap();
        let mut current = fresh_request();

        for (step, event) in events.iter().enumerate() {
            let now = start + Duration::minutes(step as i64);
            match decide(&current, event, now) {
                Ok(Decision::Applied { request, .. }) => {
                    prop_assert!(request.check_succession(&current).is_ok());
                    if request.status != FulfillmentStatus::PendingPayment {
                        prop_assert!(request.payment.is_settled());
                    }
                    if current.status.is_terminal() {
                        prop_assert_eq!(request.status, current.status);
                    }
                    current = request;
                }
                Ok(Decision::Unchanged(_)) => {}
                Err(_) => {}
            }
            prop_assert!(current.check_invariants().is_ok());
        }
    }

    #[test]
    fn settled_payment_never_changes(events in prop::collection::vec(event_strategy(), 1..40)) {
        let start = Utc.with_ymd_and_hms(2024, 2, 10, 9, 0, 0).unwrap();
        let mut current = fresh_request();
        let mut settled = None;

        for (step, event) in events.iter().enumerate() {
            let now = start + Duration::minutes(step as i64);
            if let Ok(Decision::Applied { request, .. }) = decide(&current, event, now) {
                current = request;
            }
            if let Some(payment) = &settled {
                prop_assert_eq!(&current.payment, payment);
            } else if current.payment.is_settled() {
                settled = Some(current.payment.clone());
            }
        }
    }

    #[test]
    fn terminal_states_reject_status_changes(target in status_strategy()) {
        let now = Utc.with_ymd_and_hms(2024, 2, 10, 9, 0, 0).unwrap();
        let mut request = fresh_request();
        for event in [
            LifecycleEvent::ConfirmPayment { transaction_id: "TX-1".to_string() },
            LifecycleEvent::SetStatus { target: FulfillmentStatus::Cancelled, admin_notes: None },
        ] {
            match decide(&request, &event, now).unwrap() {
                Decision::Applied { request: next, .. } => request = next,
                Decision::Unchanged(reason) => panic!("unexpected no-op: {reason:?}"),
            }
        }

        let event = LifecycleEvent::SetStatus { target, admin_notes: None };
        prop_assert!(decide(&request, &event, now).is_err());
    }
}
