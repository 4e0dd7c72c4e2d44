use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

const HEADER: &str = "event,reference,service_type,client_name,client_email,value";

#[test]
fn test_malformed_rows_are_skipped() {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv, "{HEADER}").unwrap();
    // Valid submission
    writeln!(csv, "submit,ICBB-2402-ABC123,data-cleaning,Ama,ama@ug.edu.gh,Clean it").unwrap();
    // Unknown event
    writeln!(csv, "refund,ICBB-2402-ABC123,,,,500").unwrap();
    // Unknown service
    writeln!(csv, "submit,ICBB-2402-DEF456,astrology,Ama,ama@ug.edu.gh,Stars").unwrap();
    // Malformed reference
    writeln!(csv, "confirm,not-a-reference,,,,TX1").unwrap();
    // Valid confirmation
    writeln!(csv, "confirm,ICBB-2402-ABC123,,,,TX1").unwrap();

    let mut cmd = Command::new(cargo_bin!("icbb-requests"));
    cmd.arg(csv.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading event"))
        .stdout(predicate::str::contains(
            "ICBB-2402-ABC123,data-cleaning,received,completed,500,GHS,TX1,0",
        ))
        .stdout(predicate::str::contains("ICBB-2402-DEF456").not());
}

#[test]
fn test_rejected_transitions_are_reported() {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv, "{HEADER}").unwrap();
    writeln!(csv, "submit,ICBB-2402-ABC123,data-analysis,Ama,ama@ug.edu.gh,Analysis").unwrap();
    // Work cannot start before payment
    writeln!(csv, "status,ICBB-2402-ABC123,,,,in-progress").unwrap();
    // Unknown request
    writeln!(csv, "confirm,ICBB-2402-ZZZZZZ,,,,TX1").unwrap();
    // Bad payer number
    writeln!(csv, "initiate,ICBB-2402-ABC123,,,,12345").unwrap();
    // Invalid email on submission
    writeln!(csv, "submit,ICBB-2402-QQQ111,data-analysis,Ama,not-an-email,Analysis").unwrap();

    let mut cmd = Command::new(cargo_bin!("icbb-requests"));
    cmd.arg(csv.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains(
            "Error processing event: request ICBB-2402-ABC123 is pending-payment; cannot move to in-progress",
        ))
        .stderr(predicate::str::contains("request ICBB-2402-ZZZZZZ not found"))
        .stderr(predicate::str::contains("invalid momo_number"))
        .stderr(predicate::str::contains("invalid client_email"))
        .stdout(predicate::str::contains(
            "ICBB-2402-ABC123,data-analysis,pending-payment,pending,700,GHS,,0",
        ));
}
