pub mod customer_provisioning;
pub mod payment_requests;
