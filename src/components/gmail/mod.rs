pub mod body;
mod client;
pub mod mime;
pub mod models;
mod notes;

pub use client::{GmailClient, MessageFormat};
pub use mime::OutgoingMessage;
pub use notes::{note_query, INBOX_LABEL, NOTE_NOT_FOUND, NOTE_PREFIX, NOTE_UNDECODABLE};
