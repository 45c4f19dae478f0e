//! Recovers a [`DailyVerse`] from a rendered page.
//!
//! Pages carry a JSON copy of the record in `script#daily-verse-record`;
//! that copy is authoritative. Pages without it fall back to reading the
//! visible markup by position, which only works while the template keeps its
//! current structure.

use scraper::{ElementRef, Html, Selector};

use super::template::RECORD_SCHEMA_VERSION;
use crate::error::VerseError;
use crate::types::{DailyVerse, parse_display_date};

pub fn parse_verse_page(html: &str) -> Result<DailyVerse, VerseError> {
    let doc = Html::parse_document(html);
    match embedded_record(&doc)? {
        Some(verse) => Ok(verse),
        None => from_markup(&doc),
    }
}

fn embedded_record(doc: &Html) -> Result<Option<DailyVerse>, VerseError> {
    let sel = selector("script#daily-verse-record")?;
    let Some(script) = doc.select(&sel).next() else {
        return Ok(None);
    };

    let schema = script.value().attr("data-schema").unwrap_or("1");
    if schema != RECORD_SCHEMA_VERSION.to_string() {
        return Err(VerseError::Parse(format!(
            "unsupported record schema `{schema}`"
        )));
    }

    let json: String = script.text().collect();
    Ok(Some(serde_json::from_str(&json)?))
}

fn from_markup(doc: &Html) -> Result<DailyVerse, VerseError> {
    let date = text_at(doc, "p.date", 0)?;
    let quotes = texts(doc, ".bible-verse-block blockquote")?;
    let cites = texts(doc, ".bible-verse-block cite")?;
    let title = text_at(doc, ".message-section h3", 0)?;
    let paragraphs = texts(doc, ".message-section p")?;

    let nth = |items: &[String], idx: usize, what: &str| {
        items
            .get(idx)
            .cloned()
            .ok_or_else(|| VerseError::Parse(format!("missing {what}")))
    };

    Ok(DailyVerse {
        date: parse_display_date(&date)
            .map_err(|_| VerseError::Parse(format!("unreadable date `{date}`")))?,
        malayalam_verse: nth(&quotes, 0, "Malayalam verse")?,
        malayalam_ref: strip_dash(&nth(&cites, 0, "Malayalam reference")?),
        english_verse: strip_quotes(&nth(&quotes, 1, "English verse")?),
        english_ref: strip_dash(&nth(&cites, 1, "English reference")?),
        message_title: title.strip_suffix(':').unwrap_or(&title).trim_end().to_string(),
        message_paragraph1: nth(&paragraphs, 0, "first message paragraph")?,
        message_paragraph2: nth(&paragraphs, 1, "second message paragraph")?,
    })
}

fn selector(css: &str) -> Result<Selector, VerseError> {
    Selector::parse(css).map_err(|e| VerseError::Parse(format!("bad selector `{css}`: {e:?}")))
}

fn texts(doc: &Html, css: &str) -> Result<Vec<String>, VerseError> {
    let sel = selector(css)?;
    Ok(doc.select(&sel).map(element_text).collect())
}

fn text_at(doc: &Html, css: &str, idx: usize) -> Result<String, VerseError> {
    texts(doc, css)?
        .into_iter()
        .nth(idx)
        .ok_or_else(|| VerseError::Parse(format!("no element matches `{css}`")))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn strip_dash(cite: &str) -> String {
    cite.trim_start_matches('—').trim().to_string()
}

fn strip_quotes(verse: &str) -> String {
    verse
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(verse)
        .trim()
        .to_string()
}
