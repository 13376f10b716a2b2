pub mod charge_statuses;
pub mod event_statuses;
pub mod failure_reasons;
