//! Reference search
//!
//! Parses what the reader types into the search box ("John 3:16-18",
//! "gen 1", "1 John 2") and resolves it against the book list and the
//! text API. Typing is debounced through [`SearchDebouncer`], which keeps
//! only the newest query alive.

use crate::client::{FetchState, LatestRequest, TextClient};
use crate::config::{MAX_SEARCH_QUERY_LENGTH, SEARCH_DEBOUNCE_MS};
use crate::error::Result;
use crate::models::{Book, Verse, VerseRange};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A parsed search box entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Book name, prefix or id as typed
    pub book: String,
    pub chapter: Option<u32>,
    /// Requires `chapter`
    pub verses: Option<VerseRange>,
}

impl SearchQuery {
    /// Parse a reference. `Err` carries the message to show the reader.
    pub fn parse(input: &str) -> std::result::Result<Self, String> {
        let input = input.trim();

        if input.is_empty() {
            return Err("Type a book, chapter or verse".to_string());
        }
        if input.chars().count() > MAX_SEARCH_QUERY_LENGTH {
            return Err(format!(
                "Search is limited to {} characters",
                MAX_SEARCH_QUERY_LENGTH
            ));
        }

        // The reference, if any, is the last word: "3", "3:16" or "3:16-18"
        let (book, reference) = match input.rsplit_once(char::is_whitespace) {
            Some((book, last)) if last.starts_with(|c: char| c.is_ascii_digit()) => {
                (book.trim(), Some(last))
            }
            _ => (input, None),
        };

        let Some(reference) = reference else {
            return Ok(Self {
                book: input.to_string(),
                chapter: None,
                verses: None,
            });
        };

        let (chapter, verses) = match reference.split_once(':') {
            Some((chapter, verses)) => (chapter, Some(verses)),
            None => (reference, None),
        };

        let chapter = parse_number(chapter)
            .ok_or_else(|| format!("\"{}\" is not a chapter number", chapter))?;

        let verses = match verses {
            None => None,
            Some(verses) => {
                let range = match verses.split_once('-') {
                    Some((start, end)) => parse_number(start)
                        .zip(parse_number(end))
                        .map(|(start, end)| VerseRange::new(start, end)),
                    None => parse_number(verses).map(VerseRange::single),
                };
                Some(range.ok_or_else(|| format!("\"{}\" is not a verse or verse range", verses))?)
            }
        };

        Ok(Self {
            book: book.to_string(),
            chapter: Some(chapter),
            verses,
        })
    }
}

fn parse_number(s: &str) -> Option<u32> {
    s.trim().parse().ok().filter(|n| *n > 0)
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Books matching a typed name.
///
/// An exact id or name match wins outright; otherwise every book whose
/// name starts with the query, ignoring case and spaces ("1jo" finds
/// "1 John").
pub fn match_books<'a>(books: &'a [Book], query: &str) -> Vec<&'a Book> {
    if let Some(book) = crate::client::find_book(books, query) {
        return vec![book];
    }

    let needle = squash(query);
    if needle.is_empty() {
        return Vec::new();
    }

    books
        .iter()
        .filter(|b| squash(&b.name).starts_with(&needle))
        .collect()
}

/// What a search resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SearchOutcome {
    /// Candidate books for a name-only query
    Books { books: Vec<Book> },
    /// A whole chapter
    Chapter {
        book: Book,
        chapter: u32,
        verses: Vec<Verse>,
    },
    /// Selected verses of a chapter
    Verses {
        book: Book,
        chapter: u32,
        range: VerseRange,
        verses: Vec<Verse>,
    },
    /// Nothing to show; tell the reader why
    Message { message: String },
}

impl SearchOutcome {
    fn message(message: impl Into<String>) -> Self {
        SearchOutcome::Message {
            message: message.into(),
        }
    }
}

/// Resolve a search box entry.
///
/// Unparsable input and references that do not exist come back as
/// [`SearchOutcome::Message`]; `Err` is reserved for failed requests.
pub async fn search(client: &TextClient, books: &[Book], input: &str) -> Result<SearchOutcome> {
    let query = match SearchQuery::parse(input) {
        Ok(query) => query,
        Err(message) => return Ok(SearchOutcome::message(message)),
    };

    let matches = match_books(books, &query.book);
    let Some(first) = matches.first() else {
        return Ok(SearchOutcome::message(format!(
            "No book matches \"{}\"",
            query.book
        )));
    };

    let Some(chapter) = query.chapter else {
        return Ok(SearchOutcome::Books {
            books: matches.into_iter().cloned().collect(),
        });
    };

    let book = (*first).clone();
    let count = client.fetch_chapter_count(book.id).await?;
    if chapter > count {
        return Ok(SearchOutcome::message(format!(
            "{} has {} chapters",
            book.name, count
        )));
    }

    let verses = client.fetch_verses(book.id, chapter).await?;

    let Some(range) = query.verses else {
        return Ok(SearchOutcome::Chapter {
            book,
            chapter,
            verses,
        });
    };

    let selected: Vec<Verse> = verses.into_iter().filter(|v| range.contains(v.verse)).collect();
    if selected.is_empty() {
        return Ok(SearchOutcome::message(format!(
            "{} {} has no verse {}",
            book.name, chapter, range
        )));
    }

    Ok(SearchOutcome::Verses {
        book,
        chapter,
        range,
        verses: selected,
    })
}

/// Debounced search box: each keystroke supersedes the previous query
pub struct SearchDebouncer {
    client: TextClient,
    books: Arc<Vec<Book>>,
    delay: Duration,
    request: LatestRequest<SearchOutcome>,
}

impl SearchDebouncer {
    pub fn new(client: TextClient, books: Vec<Book>) -> Self {
        Self {
            client,
            books: Arc::new(books),
            delay: Duration::from_millis(SEARCH_DEBOUNCE_MS),
            request: LatestRequest::new(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Swap the book list, e.g. after changing translation
    pub fn set_books(&mut self, books: Vec<Book>) {
        self.books = Arc::new(books);
    }

    /// Queue a search for `input`, cancelling any pending one
    pub fn submit(&mut self, input: &str) -> JoinHandle<()> {
        let client = self.client.clone();
        let books = Arc::clone(&self.books);
        let input = input.to_string();
        let delay = self.delay;

        self.request.start(async move {
            tokio::time::sleep(delay).await;
            search(&client, &books, &input).await
        })
    }

    /// Clear the search box
    pub fn clear(&mut self) {
        self.request.cancel();
    }

    pub fn state(&self) -> FetchState<SearchOutcome> {
        self.request.state()
    }

    pub fn generation(&self) -> u64 {
        self.request.generation()
    }

    pub async fn settled(&self) -> FetchState<SearchOutcome> {
        self.request.settled().await
    }
}
