pub mod document_events;
pub mod payments;
pub mod users;
