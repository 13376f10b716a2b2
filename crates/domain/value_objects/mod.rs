pub mod charge_outcomes;
pub mod collections;
pub mod enums;
pub mod payment_failures;
pub mod payment_requests;
pub mod provisioning;
