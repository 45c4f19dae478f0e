use minijinja::{AutoEscape, Environment, context};
use tracing::warn;

use crate::error::VerseError;
use crate::types::DailyVerse;

const TEMPLATE_NAME: &str = "daily_verse.html";
const TEMPLATE_SOURCE: &str = include_str!("../templates/daily_verse.html");

/// Version of the machine-readable record embedded in every rendered page.
pub const RECORD_SCHEMA_VERSION: u32 = 1;

/// Renders a [`DailyVerse`] into the fixed page template.
///
/// Field values are inserted verbatim: markup in the input ends up as markup
/// in the page. Inputs containing markup characters are logged.
pub struct VerseRenderer {
    env: Environment<'static>,
}

impl VerseRenderer {
    pub fn new() -> Result<Self, VerseError> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_template(TEMPLATE_NAME, TEMPLATE_SOURCE)?;
        Ok(Self { env })
    }

    pub fn render(&self, verse: &DailyVerse) -> Result<String, VerseError> {
        for (field, value) in verse.text_fields() {
            if contains_markup(value) {
                warn!(field, date = %verse.date, "field contains markup; embedding unescaped");
            }
        }

        let tmpl = self.env.get_template(TEMPLATE_NAME)?;
        let html = tmpl.render(context! {
            display_date => verse.display_date(),
            schema_version => RECORD_SCHEMA_VERSION,
            record_json => record_json(verse)?,
            malayalam_verse => &verse.malayalam_verse,
            malayalam_ref => &verse.malayalam_ref,
            english_verse => &verse.english_verse,
            english_ref => &verse.english_ref,
            message_title => &verse.message_title,
            message_paragraph1 => &verse.message_paragraph1,
            message_paragraph2 => &verse.message_paragraph2,
        })?;
        Ok(html)
    }
}

/// JSON safe to place inside a `<script>` element: `<` never appears raw, so
/// user text cannot close the element early.
fn record_json(verse: &DailyVerse) -> Result<String, VerseError> {
    Ok(serde_json::to_string(verse)?.replace('<', "\\u003c"))
}

fn contains_markup(value: &str) -> bool {
    value.contains(['<', '>'])
}
