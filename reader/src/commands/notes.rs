//! Note-related commands
//!
//! Notes, note categories and highlights.

use super::resolve_book;
use crate::app::AppState;
use crate::client::FetchState;
use crate::error::{AppError, Result};
use crate::models::{Highlight, Note, VerseRange};
use crate::services::{Anchor, NoteFilter, Selection, SelectionPoint};

/// Matches every category in `notes <category>`
const ANY_CATEGORY: &str = "all";

/// List notes newest first, optionally by category and book
pub async fn list_notes(
    state: &mut AppState,
    category: Option<&str>,
    book: Option<&str>,
) -> Result<Vec<Note>> {
    let book_id = match book {
        Some(book) => Some(resolve_book(state, book).await?.id),
        None => None,
    };

    let filter = NoteFilter {
        category: category
            .filter(|c| !c.eq_ignore_ascii_case(ANY_CATEGORY))
            .map(str::to_string),
        book_id,
    };

    Ok(state
        .session
        .store()
        .filter_notes(&filter)
        .into_iter()
        .cloned()
        .collect())
}

/// Parse `"3"` or `"3-5"`
fn parse_range(verses: &str) -> Result<VerseRange> {
    let number = |s: &str| {
        s.trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| AppError::Generic(format!("Invalid verse range {:?}", verses)))
    };

    match verses.split_once('-') {
        Some((start, end)) => Ok(VerseRange::new(number(start)?, number(end)?)),
        None => Ok(VerseRange::single(number(verses)?)),
    }
}

/// Write a note on a verse range, quoting the verses
pub async fn add_note(
    state: &mut AppState,
    book: &str,
    chapter: u32,
    verses: &str,
    category: &str,
    user_note: Option<String>,
) -> Result<Note> {
    let range = parse_range(verses)?;
    let book = resolve_book(state, book).await?;

    state.session.open_chapter(book.id, chapter);
    if let FetchState::Failed(message) = state.session.chapter_settled().await {
        return Err(AppError::Generic(message));
    }

    // Both ends must exist, or the draft would quietly cover fewer verses
    let in_chapter = state.session.verse_index().is_some_and(|index| {
        index.contains_verse(range.start) && index.contains_verse(range.end)
    });
    if !in_chapter {
        return Err(AppError::Generic(format!(
            "{} {} has no verse {}",
            book.name, chapter, range
        )));
    }

    let selection = Selection::Text {
        start: SelectionPoint::marked(0, range.start),
        end: SelectionPoint::marked(0, range.end),
    };
    let draft = state
        .session
        .draft_note(&selection, Anchor { x: 0.0, y: 0.0 })
        .ok_or_else(|| {
            AppError::Generic(format!("{} {} has no verse {}", book.name, chapter, range))
        })?;

    state.session.save_note(&draft, category, user_note).await
}

/// Replace a note's own text. `false` if the id is unknown.
pub async fn edit_note(state: &mut AppState, id: &str, text: &str) -> Result<bool> {
    state.session.store_mut().edit_user_note(id, text).await
}

/// Delete a note by id
pub async fn delete_note(state: &mut AppState, id: &str) -> Result<bool> {
    state.session.store_mut().delete_note(id).await
}

/// Search notes by quoted text, commentary or reference
pub async fn search_notes(state: &AppState, query: &str) -> Result<Vec<Note>> {
    Ok(state
        .session
        .store()
        .annotations()
        .search_notes(query)
        .into_iter()
        .cloned()
        .collect())
}

/// Categories in display order, "General" first
pub async fn list_categories(state: &AppState) -> Result<Vec<String>> {
    Ok(state.session.store().annotations().categories().to_vec())
}

/// Add a category. `false` if blank or already present.
pub async fn add_category(state: &mut AppState, name: &str) -> Result<bool> {
    state.session.store_mut().add_category(name).await
}

/// Rename a category and move its notes along
pub async fn rename_category(state: &mut AppState, old: &str, new: &str) -> Result<bool> {
    state.session.store_mut().rename_category(old, new).await
}

/// Delete a category; its notes move to General
pub async fn delete_category(state: &mut AppState, name: &str) -> Result<bool> {
    state.session.store_mut().delete_category(name).await
}

/// Every highlight, in the order they were made
pub async fn list_highlights(state: &AppState) -> Result<Vec<Highlight>> {
    Ok(state.session.store().annotations().highlights().to_vec())
}

/// Highlight a verse. Highlighting the same verse again returns the
/// existing highlight.
pub async fn add_highlight(
    state: &mut AppState,
    book: &str,
    chapter: u32,
    verse: u32,
) -> Result<Highlight> {
    let book = resolve_book(state, book).await?;

    state.session.open_chapter(book.id, chapter);
    if let FetchState::Failed(message) = state.session.chapter_settled().await {
        return Err(AppError::Generic(message));
    }

    state
        .session
        .highlight_verse(verse)
        .await?
        .ok_or_else(|| AppError::Generic(format!("{} {} has no verse {}", book.name, chapter, verse)))
}

/// Remove a highlight by id
pub async fn delete_highlight(state: &mut AppState, id: &str) -> Result<bool> {
    state.session.store_mut().delete_highlight(id).await
}
