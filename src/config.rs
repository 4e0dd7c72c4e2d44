//! Runtime configuration, with defaults matching the production deployment and
//! `ICBB_*` environment overrides.

use crate::domain::payment::MomoAccount;
use crate::domain::request::ServiceType;
use crate::error::{Result, TrackerError};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Account clients transfer deposits to.
    pub momo_account: MomoAccount,
    pub currency: String,
    /// Address that receives operator-facing notifications.
    pub operator_email: String,
    /// Price per service; services missing here fall back to their base price.
    pub pricing: HashMap<ServiceType, Decimal>,
    /// Attempts at drawing an unused reference before giving up.
    pub reference_attempts: u32,
    pub notifications: DispatchConfig,
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Sends per notification, including the first.
    pub attempts: u32,
    pub send_timeout: Duration,
    pub retry_backoff: Duration,
    /// Intents waiting for delivery; more are dropped and counted.
    pub outbox_capacity: usize,
    /// Notifications being sent at the same time.
    pub max_in_flight: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            send_timeout: Duration::from_secs(5),
            retry_backoff: Duration::from_millis(200),
            outbox_capacity: 1024,
            max_in_flight: 8,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            momo_account: MomoAccount {
                name: "Jesse Azebiik Anak".to_string(),
                number: "0559759592".to_string(),
                network: "MTN Ghana".to_string(),
            },
            currency: "GHS".to_string(),
            operator_email: "admin@icbb.org".to_string(),
            pricing: ServiceType::ALL
                .into_iter()
                .map(|service| (service, service.base_price()))
                .collect(),
            reference_attempts: 5,
            notifications: DispatchConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Defaults overridden by whichever `ICBB_*` variables are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(name) = lookup("ICBB_MOMO_NAME") {
            config.momo_account.name = name;
        }
        if let Some(number) = lookup("ICBB_MOMO_NUMBER") {
            config.momo_account.number = number;
        }
        if let Some(network) = lookup("ICBB_MOMO_NETWORK") {
            config.momo_account.network = network;
        }
        if let Some(currency) = lookup("ICBB_CURRENCY") {
            config.currency = currency;
        }
        if let Some(email) = lookup("ICBB_OPERATOR_EMAIL") {
            config.operator_email = email;
        }
        for service in ServiceType::ALL {
            let key = format!(
                "ICBB_PRICE_{}",
                service.as_str().replace('-', "_").to_ascii_uppercase()
            );
            if let Some(price) = lookup(&key) {
                let price = parse::<Decimal>(&key, &price)?;
                if price <= Decimal::ZERO {
                    return Err(TrackerError::Config(format!("{key} must be positive")));
                }
                config.pricing.insert(service, price);
            }
        }
        if let Some(attempts) = lookup("ICBB_REFERENCE_ATTEMPTS") {
            config.reference_attempts = parse("ICBB_REFERENCE_ATTEMPTS", &attempts)?;
        }
        if let Some(attempts) = lookup("ICBB_NOTIFY_ATTEMPTS") {
            config.notifications.attempts = parse("ICBB_NOTIFY_ATTEMPTS", &attempts)?;
        }
        if let Some(ms) = lookup("ICBB_NOTIFY_TIMEOUT_MS") {
            config.notifications.send_timeout =
                Duration::from_millis(parse("ICBB_NOTIFY_TIMEOUT_MS", &ms)?);
        }
        if let Some(ms) = lookup("ICBB_NOTIFY_BACKOFF_MS") {
            config.notifications.retry_backoff =
                Duration::from_millis(parse("ICBB_NOTIFY_BACKOFF_MS", &ms)?);
        }

        if let Some(capacity) = lookup("ICBB_NOTIFY_QUEUE_CAPACITY") {
            config.notifications.outbox_capacity = parse("ICBB_NOTIFY_QUEUE_CAPACITY", &capacity)?;
        }
        if let Some(limit) = lookup("ICBB_NOTIFY_MAX_IN_FLIGHT") {
            config.notifications.max_in_flight = parse("ICBB_NOTIFY_MAX_IN_FLIGHT", &limit)?;
        }

        if config.reference_attempts == 0 || config.notifications.attempts == 0 {
            return Err(TrackerError::Config(
                "attempt counts must be at least 1".to_string(),
            ));
        }
        if config.notifications.outbox_capacity == 0 || config.notifications.max_in_flight == 0 {
            return Err(TrackerError::Config(
                "notification queue capacity and concurrency must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn price_of(&self, service: ServiceType) -> Decimal {
        self.pricing
            .get(&service)
            .copied()
            .unwrap_or_else(|| service.base_price())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| TrackerError::Config(format!("Invalid {key}: '{value}'")))
}
