pub mod document_events;
pub mod documents;
pub mod payments;
pub mod users;
