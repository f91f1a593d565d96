//! Reading commands
//!
//! Translations, books, chapters, read marks and progress.

use super::resolve_book;
use crate::app::AppState;
use crate::client::{FetchState, VerseComparison};
use crate::error::{AppError, Result};
use crate::models::{Book, DisplayMode, Note, Translation, Verse};
use crate::services::progress::{BookProgress, TestamentProgress};
use crate::services::BookCompleted;
use serde::Serialize;

/// List available translations
pub async fn list_translations(state: &AppState) -> Result<Vec<Translation>> {
    state.session.client().fetch_translations().await
}

/// Switch translation by short code
pub async fn select_translation(state: &mut AppState, code: &str) -> Result<Translation> {
    let translations = state.session.client().fetch_translations().await?;
    let translation = translations
        .into_iter()
        .find(|t| t.short_code.eq_ignore_ascii_case(code))
        .ok_or_else(|| AppError::Generic(format!("Unknown translation {:?}", code)))?;

    state.session.select_translation(&translation).await?;
    Ok(translation)
}

/// List books of the selected translation
pub async fn list_books(state: &mut AppState) -> Result<Vec<Book>> {
    Ok(state.session.load_books().await.to_vec())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterView {
    pub book: Book,
    pub chapter: u32,
    pub chapter_count: Option<u32>,
    pub read: bool,
    pub verses: Vec<Verse>,
    /// Notes written on this chapter, in verse order
    pub notes: Vec<Note>,
}

/// Fetch a chapter's verses along with its read mark and notes
pub async fn read_chapter(state: &mut AppState, book: &str, chapter: u32) -> Result<ChapterView> {
    let book = resolve_book(state, book).await?;
    let chapter_count = state.session.ensure_chapter_count(book.id).await?;

    state.session.open_chapter(book.id, chapter);
    let verses = match state.session.chapter_settled().await {
        FetchState::Loaded(verses) => verses,
        FetchState::Failed(message) => return Err(AppError::Generic(message)),
        FetchState::Idle | FetchState::Loading => return Err(AppError::Cancelled),
    };

    let store = state.session.store();
    let notes = store
        .annotations()
        .notes_for_chapter(book.id, chapter)
        .into_iter()
        .cloned()
        .collect();

    Ok(ChapterView {
        read: store.is_chapter_read(book.id, chapter),
        notes,
        book,
        chapter,
        chapter_count,
        verses,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkView {
    pub book_id: u32,
    pub chapter: u32,
    pub read: bool,
    pub book_completed: bool,
    pub celebrations: Vec<BookCompleted>,
}

/// Toggle a chapter's read mark
pub async fn toggle_read(state: &mut AppState, book: &str, chapter: u32) -> Result<MarkView> {
    let book = resolve_book(state, book).await?;
    let count = state.session.ensure_chapter_count(book.id).await?;

    let outcome = state
        .session
        .store_mut()
        .toggle_chapter_read(book.id, chapter)
        .await?
        .ok_or_else(|| match count {
            Some(count) => AppError::Generic(format!(
                "{} has chapters 1 to {}",
                book.name, count
            )),
            None => AppError::Generic(format!("Chapter count of {} is unknown", book.name)),
        })?;

    if !outcome.celebrations.is_empty() {
        tracing::info!("Finished reading {}", book.name);
    }

    Ok(MarkView {
        book_id: book.id,
        chapter,
        read: outcome.read,
        book_completed: state.session.store().is_book_completed(book.id),
        celebrations: outcome.celebrations,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub testaments: Vec<TestamentProgress>,
    pub books: Vec<BookProgress>,
}

/// Reading progress across every book
pub async fn get_progress(state: &mut AppState) -> Result<ProgressView> {
    if state.session.store().books().is_empty() {
        state.session.load_books().await;
    }
    state.session.load_all_chapter_counts().await?;

    let store = state.session.store();
    Ok(ProgressView {
        testaments: store.testament_progress(),
        books: store.book_progress(),
    })
}

/// One verse in several translations
pub async fn compare_verse(
    state: &mut AppState,
    book: &str,
    chapter: u32,
    verse: u32,
    translations: &[&str],
) -> Result<Vec<VerseComparison>> {
    let book = resolve_book(state, book).await?;
    Ok(state
        .session
        .client()
        .compare_verse(book.id, chapter, verse, translations)
        .await)
}

/// Persist the reading layout
pub async fn set_display_mode(state: &mut AppState, mode: DisplayMode) -> Result<DisplayMode> {
    state.session.store_mut().set_display_mode(mode).await?;
    Ok(mode)
}
