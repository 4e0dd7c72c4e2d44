//! Domain layer: records, the pure state machine and the ports the application depends on.

pub mod caller;
pub mod contact;
pub mod lifecycle;
pub mod notification;
pub mod payment;
pub mod ports;
pub mod reference;
pub mod registration;
pub mod request;
pub mod validation;
