pub mod verse;

pub use verse::{DailyVerse, VerseForm, format_display_date, parse_display_date};
