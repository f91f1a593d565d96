//! Deep links
//!
//! A reading position travels in two URL shapes:
//!
//! - the reader's own query form: `/?book=John&chapter=3&verse=16&display=1&translation=AKJV`
//! - the shareable path form: `/verse/{book}/{chapter}/{display}[/{verse}]?verse=..&translation=..`
//!
//! Both parse to a [`ReadingPosition`]. Shareable links also get a preview
//! (title and verse text) for link unfurling.

use crate::client::{find_book, TextClient};
use crate::config::DEFAULT_TRANSLATION;
use crate::error::{AppError, Result};
use crate::models::DisplayMode;
use reqwest::Url;
use serde::Serialize;

/// Base for resolving links given without scheme and host
const RELATIVE_BASE: &str = "http://localhost/";

const PREVIEW_FALLBACK: &str = "Bible verse from In His Path.";

/// Where a link points. Display mode and translation are `None` when the
/// link leaves them out, so applying it keeps the reader's own choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingPosition {
    /// Book name or numeric id, as it appeared in the link
    pub book: String,
    pub chapter: u32,
    pub verse: Option<u32>,
    pub display: Option<DisplayMode>,
    pub translation: Option<String>,
}

impl ReadingPosition {
    pub fn new(book: impl Into<String>, chapter: u32) -> Self {
        Self {
            book: book.into(),
            chapter,
            verse: None,
            display: None,
            translation: None,
        }
    }

    pub fn with_verse(mut self, verse: u32) -> Self {
        self.verse = Some(verse);
        self
    }

    pub fn with_display(mut self, display: DisplayMode) -> Self {
        self.display = Some(display);
        self
    }

    pub fn with_translation(mut self, translation: impl Into<String>) -> Self {
        self.translation = Some(translation.into());
        self
    }

    /// Parse either link shape. Absolute URLs, paths and bare query strings
    /// are all accepted.
    pub fn parse(link: &str) -> Result<Self> {
        let url = parse_url(link.trim())?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let mut position = match segments.as_slice() {
            ["verse", book, chapter, rest @ ..] if rest.len() <= 2 => {
                let mut position = Self::new(decode(book)?, parse_chapter(chapter)?);
                if let Some(display) = rest.first() {
                    position.display = Some(parse_display(display)?);
                }
                if let Some(verse) = rest.get(1) {
                    position.verse = Some(parse_verse(verse)?);
                }
                position
            }
            [] => {
                let book = query_value(&url, "book")
                    .ok_or_else(|| AppError::InvalidUrl(format!("{}: missing book", link)))?;
                let chapter = query_value(&url, "chapter")
                    .ok_or_else(|| AppError::InvalidUrl(format!("{}: missing chapter", link)))?;
                let mut position = Self::new(book, parse_chapter(&chapter)?);
                if let Some(display) = query_value(&url, "display") {
                    position.display = Some(parse_display(&display)?);
                }
                position
            }
            _ => {
                return Err(AppError::InvalidUrl(format!(
                    "{}: not a reading position",
                    link
                )))
            }
        };

        if let Some(verse) = query_value(&url, "verse") {
            position.verse = Some(parse_verse(&verse)?);
        }
        if let Some(translation) = query_value(&url, "translation") {
            position.translation = Some(translation);
        }

        Ok(position)
    }

    /// Translation the link reads in, falling back to the default
    pub fn translation_or_default(&self) -> &str {
        self.translation.as_deref().unwrap_or(DEFAULT_TRANSLATION)
    }

    /// The reader's own query form, e.g. `book=John&chapter=3&display=1&translation=AKJV&verse=16`.
    /// Parts the position leaves open are left out.
    pub fn to_query(&self) -> Result<String> {
        let mut url = Url::parse(RELATIVE_BASE).map_err(|e| AppError::InvalidUrl(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("book", &self.book)
                .append_pair("chapter", &self.chapter.to_string());
            if let Some(display) = self.display {
                query.append_pair("display", &display.to_string());
            }
            if let Some(translation) = &self.translation {
                query.append_pair("translation", translation);
            }
            if let Some(verse) = self.verse {
                query.append_pair("verse", &verse.to_string());
            }
        }
        Ok(url.query().unwrap_or_default().to_string())
    }

    /// Shareable link on `site`, defaulting the verse to 1
    pub fn share_url(&self, site: &str) -> Result<String> {
        let base = format!("{}/", site.trim_end_matches('/'));
        let mut url = Url::parse(&base).map_err(|e| AppError::InvalidUrl(format!("{}: {}", site, e)))?;

        url.path_segments_mut()
            .map_err(|_| AppError::InvalidUrl(format!("{}: cannot hold a path", site)))?
            .pop_if_empty()
            .push("verse")
            .push(&self.book)
            .push(&self.chapter.to_string())
            .push(&self.display.unwrap_or_default().to_string());

        url.query_pairs_mut()
            .append_pair("verse", &self.verse.unwrap_or(1).to_string())
            .append_pair("translation", self.translation_or_default());

        Ok(url.into())
    }

    /// Title and description for a shared link.
    ///
    /// Falls back to the link's own book name and a generic description
    /// when the text API cannot be reached.
    pub async fn preview(&self, client: &TextClient, site: &str) -> Result<LinkPreview> {
        let verse = self.verse.unwrap_or(1);
        let translation = self.translation_or_default();
        let client = client.for_translation(translation);

        let mut book_name = self.book.clone();
        let mut description = PREVIEW_FALLBACK.to_string();

        let books = client.list_books().await;
        if let Some(book) = find_book(&books, &self.book) {
            book_name = book.name.clone();
            let verses = client.list_verses(book.id, self.chapter).await;
            if let Some(found) = verses.iter().find(|v| v.verse == verse) {
                description = found.text.clone();
            }
        }

        Ok(LinkPreview {
            title: format!(
                "{} {}:{} ({}) | In His Path",
                book_name, self.chapter, verse, translation
            ),
            description,
            url: self.share_url(site)?,
        })
    }
}

/// Link unfurling metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkPreview {
    pub title: String,
    pub description: String,
    pub url: String,
}

fn parse_url(link: &str) -> Result<Url> {
    match Url::parse(link) {
        Ok(url) => Ok(url),
        Err(_) => Url::parse(RELATIVE_BASE)
            .and_then(|base| base.join(link))
            .map_err(|e| AppError::InvalidUrl(format!("{}: {}", link, e))),
    }
}

fn query_value(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, value)| key == name && !value.trim().is_empty())
        .map(|(_, value)| value.trim().to_string())
}

fn decode(segment: &str) -> Result<String> {
    // Path segments stay percent-encoded; run them through the query decoder
    let url = Url::parse(&format!("{}?v={}", RELATIVE_BASE, segment))
        .map_err(|e| AppError::InvalidUrl(e.to_string()))?;
    query_value(&url, "v").ok_or_else(|| AppError::InvalidUrl("empty book".to_string()))
}

fn parse_chapter(value: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| AppError::InvalidUrl(format!("invalid chapter: {}", value)))
}

fn parse_verse(value: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| AppError::InvalidUrl(format!("invalid verse: {}", value)))
}

fn parse_display(value: &str) -> Result<DisplayMode> {
    value
        .parse()
        .map_err(|_| AppError::InvalidUrl(format!("invalid display mode: {}", value)))
}
