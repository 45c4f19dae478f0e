//! Page rendering and its inverse.

pub mod parse;
pub mod template;

pub use parse::parse_verse_page;
pub use template::VerseRenderer;
