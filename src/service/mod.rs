pub mod verse_service;

pub use verse_service::{CreatedVerse, VerseService};
