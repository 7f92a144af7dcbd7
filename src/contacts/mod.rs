//! Contact directory — durable contact records with engagement state.

pub mod directory;
pub mod model;

pub use directory::ContactDirectory;
pub use model::{Contact, HistoryEntry};
