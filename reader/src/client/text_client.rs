//! Text API client
//!
//! Fetches translations, books, chapter counts and verses from the
//! In His Path REST API.
//!
//! Every endpoint has two forms:
//! - `fetch_*` returns the error, for callers that track loading/error state
//! - the plain form logs the failure and returns an empty value
//!
//! An empty value from the plain form means "unknown", never "definitely
//! none": a network failure and a genuinely empty response look the same.

use crate::config::ApiConfig;
use crate::error::{AppError, Result};
use crate::models::{Book, Translation, Verse};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// One translation's rendering of a verse, for side-by-side comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerseComparison {
    pub translation: String,
    /// `None` when the translation lacks the verse or the fetch failed
    pub verse: Option<Verse>,
}

/// Client bound to one translation
#[derive(Clone)]
pub struct TextClient {
    http: reqwest::Client,
    base_url: String,
    translation: String,
}

impl TextClient {
    pub fn new(config: &ApiConfig, translation: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            translation: translation.into(),
        })
    }

    /// Short code of the translation this client reads from
    pub fn translation(&self) -> &str {
        &self.translation
    }

    /// Same connection pool, different translation
    pub fn for_translation(&self, translation: impl Into<String>) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            translation: translation.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {}", url);

        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Status {
                status: status.as_u16(),
                url,
            });
        }

        Ok(response.json().await?)
    }

    fn book_path(&self, book_id: u32) -> String {
        format!("/translations/{}/books/{}", self.translation, book_id)
    }

    /// `GET /translations`
    pub async fn fetch_translations(&self) -> Result<Vec<Translation>> {
        self.get_json("/translations").await
    }

    /// `GET /translations/{code}/books`
    pub async fn fetch_books(&self) -> Result<Vec<Book>> {
        self.get_json(&format!("/translations/{}/books", self.translation))
            .await
    }

    /// Number of chapters in a book.
    ///
    /// The endpoint returns an object keyed by chapter; its key count is
    /// the chapter count.
    pub async fn fetch_chapter_count(&self, book_id: u32) -> Result<u32> {
        let chapters: serde_json::Value = self
            .get_json(&format!("{}/chapters", self.book_path(book_id)))
            .await?;

        let count = match chapters {
            serde_json::Value::Object(map) => map.len(),
            serde_json::Value::Array(items) => items.len(),
            other => {
                return Err(AppError::Generic(format!(
                    "Unexpected chapters payload for book {}: {}",
                    book_id, other
                )))
            }
        };

        Ok(count as u32)
    }

    /// Verses of a chapter, ordered by verse number
    pub async fn fetch_verses(&self, book_id: u32, chapter: u32) -> Result<Vec<Verse>> {
        let mut verses: Vec<Verse> = self
            .get_json(&format!(
                "{}/chapters/{}/verses",
                self.book_path(book_id),
                chapter
            ))
            .await?;

        verses.sort_by_key(|v| v.verse);
        Ok(verses)
    }

    pub async fn list_translations(&self) -> Vec<Translation> {
        or_empty(self.fetch_translations().await, "translations")
    }

    pub async fn list_books(&self) -> Vec<Book> {
        or_empty(self.fetch_books().await, "books")
    }

    /// Chapter count, or 0 when unknown
    pub async fn chapter_count(&self, book_id: u32) -> u32 {
        or_empty(
            self.fetch_chapter_count(book_id).await,
            &format!("chapter count for book {}", book_id),
        )
    }

    pub async fn list_verses(&self, book_id: u32, chapter: u32) -> Vec<Verse> {
        or_empty(
            self.fetch_verses(book_id, chapter).await,
            &format!("verses for {}-{}", book_id, chapter),
        )
    }

    /// Look a book up by id or case-insensitive name
    pub async fn find_book(&self, query: &str) -> Option<Book> {
        let books = self.list_books().await;
        find_book(&books, query).cloned()
    }

    /// Fetch one verse from several translations
    pub async fn compare_verse(
        &self,
        book_id: u32,
        chapter: u32,
        verse: u32,
        translations: &[&str],
    ) -> Vec<VerseComparison> {
        let mut comparisons = Vec::with_capacity(translations.len());

        for code in translations {
            let verses = self
                .for_translation(*code)
                .list_verses(book_id, chapter)
                .await;

            comparisons.push(VerseComparison {
                translation: code.to_string(),
                verse: verses.into_iter().find(|v| v.verse == verse),
            });
        }

        comparisons
    }
}

fn or_empty<T: Default>(result: Result<T>, what: &str) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!("Failed to fetch {}: {}", what, e);
        T::default()
    })
}

/// Match a book by numeric id or by name, ignoring case
pub fn find_book<'a>(books: &'a [Book], query: &str) -> Option<&'a Book> {
    let query = query.trim();
    books
        .iter()
        .find(|b| b.id.to_string() == query || b.name.eq_ignore_ascii_case(query))
}
