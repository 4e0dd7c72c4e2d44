use crate::domain::reference::ReferenceCode;
use crate::error::TrackerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A positive monetary amount.
///
/// Wraps `rust_decimal::Decimal` so a zero or negative deposit can never be recorded.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, TrackerError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(TrackerError::validation("amount", "amount must be positive"))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = TrackerError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// Settlement state of the deposit.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment sub-record embedded in a service request. It has no lifecycle of its own.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    pub status: PaymentStatus,
    pub amount: Amount,
    pub currency: String,
    pub method: String,
    /// Number the client pays from.
    pub momo_number: Option<String>,
    /// Set once, on the first successful confirmation.
    pub transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub const METHOD_MOMO: &'static str = "momo";

    pub fn new(amount: Amount, currency: impl Into<String>) -> Self {
        Self {
            status: PaymentStatus::Pending,
            amount,
            currency: currency.into(),
            method: Self::METHOD_MOMO.to_string(),
            momo_number: None,
            transaction_id: None,
            paid_at: None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status == PaymentStatus::Completed
    }
}

/// The mobile-money account clients pay into.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct MomoAccount {
    pub name: String,
    pub number: String,
    pub network: String,
}

/// What a client needs to complete a manual mobile-money transfer.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentInstructions {
    pub reference: ReferenceCode,
    pub amount: Amount,
    pub currency: String,
    pub pay_to: MomoAccount,
    pub steps: Vec<String>,
}

impl PaymentInstructions {
    pub fn new(reference: ReferenceCode, payment: &Payment, pay_to: &MomoAccount) -> Self {
        let steps = vec![
            "Open your MTN MoMo app or dial *170#".to_string(),
            "Select \"Transfer Money\" or \"Send Money\"".to_string(),
            format!("Enter the amount: {} {}", payment.currency, payment.amount),
            format!("Enter recipient number: {}", pay_to.number),
            "Confirm the transaction".to_string(),
            format!("Use your request ID as reference: {reference}"),
        ];
        Self {
            reference,
            amount: payment.amount,
            currency: payment.currency.clone(),
            pay_to: pay_to.clone(),
            steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(700)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0)),
            Err(TrackerError::Validation { field: "amount", .. })
        ));
        assert!(Amount::new(dec!(-1.5)).is_err());
        assert!(serde_json::from_str::<Amount>("\"-3\"").is_err());
    }

    #[test]
    fn test_new_payment_defaults() {
        let payment = Payment::new(Amount::new(dec!(700)).unwrap(), "GHS");
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.method, "momo");
        assert!(!payment.is_settled());
        assert!(payment.transaction_id.is_none());
    }

    #[test]
    fn test_instructions_quote_reference_and_amount() {
        let payment = Payment::new(Amount::new(dec!(700.00)).unwrap(), "GHS");
        let account = MomoAccount {
            name: "ICBB".to_string(),
            number: "0559759592".to_string(),
            network: "MTN Ghana".to_string(),
        };
        let reference = ReferenceCode::parse("ICBB-2402-ABC123").unwrap();
        let instructions = PaymentInstructions::new(reference, &payment, &account);

        assert_eq!(instructions.steps.len(), 6);
        assert_eq!(instructions.steps[2], "Enter the amount: GHS 700");
        assert!(instructions.steps[5].ends_with("ICBB-2402-ABC123"));
        assert_eq!(instructions.pay_to, account);
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Processing).unwrap(),
            "\"processing\""
        );
        assert_eq!(PaymentStatus::Refunded.to_string(), "refunded");
    }
}
