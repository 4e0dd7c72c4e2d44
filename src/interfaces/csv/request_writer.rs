use crate::domain::payment::PaymentStatus;
use crate::domain::reference::ReferenceCode;
use crate::domain::request::{FulfillmentStatus, ServiceRequest, ServiceType};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct RequestRow {
    reference: ReferenceCode,
    service_type: ServiceType,
    status: FulfillmentStatus,
    payment_status: PaymentStatus,
    amount: Decimal,
    currency: String,
    transaction_id: Option<String>,
    result_files: usize,
}

impl From<&ServiceRequest> for RequestRow {
    fn from(request: &ServiceRequest) -> Self {
        Self {
            reference: request.reference.clone(),
            service_type: request.service_type,
            status: request.status,
            payment_status: request.payment.status,
            amount: request.payment.amount.value().normalize(),
            currency: request.payment.currency.clone(),
            transaction_id: request.payment.transaction_id.clone(),
            result_files: request.completed_files.len(),
        }
    }
}

/// Writes the request table as CSV, one row per request.
pub struct RequestWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> RequestWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_requests<'a>(
        &mut self,
        requests: impl IntoIterator<Item = &'a ServiceRequest>,
    ) -> Result<()> {
        for request in requests {
            self.writer.serialize(RequestRow::from(request))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::fixtures::unpaid_request;

    #[test]
    fn test_writes_header_and_rows() {
        let request = unpaid_request("ICBB-2402-ABC123");
        let mut out = Vec::new();
        RequestWriter::new(&mut out)
            .write_requests([&request])
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(
                "reference,service_type,status,payment_status,amount,currency,transaction_id,result_files"
            )
        );
        assert_eq!(
            lines.next(),
            Some("ICBB-2402-ABC123,data-analysis,pending-payment,pending,700,GHS,,0")
        );
    }
}
