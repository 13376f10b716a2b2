pub mod customers;
pub mod payments;
