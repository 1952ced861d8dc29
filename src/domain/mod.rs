//! Domain layer types and invariants.

pub mod content;
pub mod listing;
pub mod headings;
pub mod slug;
pub mod submission;
