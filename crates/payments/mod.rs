pub mod gateway;
pub mod settings;
pub mod stripe_client;
