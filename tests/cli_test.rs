use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("icbb-requests"));
    cmd.arg("tests/fixtures/events.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "reference,service_type,status,payment_status,amount,currency,transaction_id,result_files",
        ))
        .stdout(predicate::str::contains(
            "ICBB-2402-ABC123,data-analysis,completed,completed,700,GHS,MP240210.1234.A12345,1",
        ))
        .stdout(predicate::str::contains(
            "ICBB-2402-XYZ789,paper-review,pending-payment,processing,500,GHS,,0",
        ));

    Ok(())
}

#[test]
fn test_cli_missing_input_fails() {
    let mut cmd = Command::new(cargo_bin!("icbb-requests"));
    cmd.arg("tests/fixtures/does_not_exist.csv");

    cmd.assert().failure();
}
