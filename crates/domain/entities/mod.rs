pub mod document_events;
pub mod documents;
