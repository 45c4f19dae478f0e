use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::VerseError;

/// Human-facing date format used on the wire and inside rendered pages.
pub const DISPLAY_DATE_FORMAT: &str = "%B %d, %Y";

/// Date format embedded in stored file names.
pub const FILE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a display date such as `August 05, 2025`.
pub fn parse_display_date(raw: &str) -> Result<NaiveDate, VerseError> {
    NaiveDate::parse_from_str(raw.trim(), DISPLAY_DATE_FORMAT)
        .map_err(|_| VerseError::InvalidDate(raw.to_string()))
}

pub fn format_display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

/// One daily devotional, keyed by its calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyVerse {
    #[serde(with = "display_date")]
    pub date: NaiveDate,
    pub malayalam_verse: String,
    pub malayalam_ref: String,
    pub english_verse: String,
    pub english_ref: String,
    pub message_title: String,
    pub message_paragraph1: String,
    pub message_paragraph2: String,
}

impl DailyVerse {
    pub fn display_date(&self) -> String {
        format_display_date(self.date)
    }

    /// Text fields in template order, paired with their wire names.
    pub fn text_fields(&self) -> [(&'static str, &str); 7] {
        [
            ("malayalam_verse", &self.malayalam_verse),
            ("malayalam_ref", &self.malayalam_ref),
            ("english_verse", &self.english_verse),
            ("english_ref", &self.english_ref),
            ("message_title", &self.message_title),
            ("message_paragraph1", &self.message_paragraph1),
            ("message_paragraph2", &self.message_paragraph2),
        ]
    }
}

/// Raw body of `POST /generate_and_upload_verse`. Every field is optional so
/// that absence is reported as a validation error rather than a decode error.
#[derive(Debug, Default, Deserialize)]
pub struct VerseForm {
    pub date: Option<String>,
    pub malayalam_verse: Option<String>,
    pub malayalam_ref: Option<String>,
    pub english_verse: Option<String>,
    pub english_ref: Option<String>,
    pub message_title: Option<String>,
    pub message_paragraph1: Option<String>,
    pub message_paragraph2: Option<String>,
}

impl TryFrom<VerseForm> for DailyVerse {
    type Error = VerseError;

    fn try_from(form: VerseForm) -> Result<Self, Self::Error> {
        let mut missing = Vec::new();
        let mut take = |name: &'static str, value: Option<String>| match value {
            Some(v) if !v.is_empty() => v,
            _ => {
                missing.push(name);
                String::new()
            }
        };

        let date = take("date", form.date);
        let malayalam_verse = take("malayalam_verse", form.malayalam_verse);
        let malayalam_ref = take("malayalam_ref", form.malayalam_ref);
        let english_verse = take("english_verse", form.english_verse);
        let english_ref = take("english_ref", form.english_ref);
        let message_title = take("message_title", form.message_title);
        let message_paragraph1 = take("message_paragraph1", form.message_paragraph1);
        let message_paragraph2 = take("message_paragraph2", form.message_paragraph2);

        if !missing.is_empty() {
            return Err(VerseError::MissingFields(missing.join(", ")));
        }

        Ok(DailyVerse {
            date: parse_display_date(&date)?,
            malayalam_verse,
            malayalam_ref,
            english_verse,
            english_ref,
            message_title,
            message_paragraph1,
            message_paragraph2,
        })
    }
}

mod display_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_display_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_display_date(&raw).map_err(D::Error::custom)
    }
}
