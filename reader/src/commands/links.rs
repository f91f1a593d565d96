//! Search and link commands

use super::resolve_book;
use crate::app::AppState;
use crate::client::FetchState;
use crate::error::{AppError, Result};
use crate::models::{Book, Verse};
use crate::services::search::{self, SearchOutcome};
use crate::services::{LinkPreview, ReadingPosition};
use serde::Serialize;

/// Resolve a reference typed into the search box
pub async fn search(state: &mut AppState, query: &str) -> Result<SearchOutcome> {
    if state.session.store().books().is_empty() {
        state.session.load_books().await;
    }

    let session = &state.session;
    search::search(session.client(), session.store().books(), query).await
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkView {
    pub position: ReadingPosition,
    pub book: Book,
    pub verses: Vec<Verse>,
}

/// Open a deep link: switch translation and layout, then load the chapter
pub async fn open_link(state: &mut AppState, link: &str) -> Result<LinkView> {
    let position = ReadingPosition::parse(link)?;

    let book = state
        .session
        .apply_link(&position)
        .await?
        .ok_or_else(|| AppError::Generic(format!("No book matches {:?}", position.book)))?;

    let verses = match state.session.chapter_settled().await {
        FetchState::Loaded(verses) => verses,
        FetchState::Failed(message) => return Err(AppError::Generic(message)),
        FetchState::Idle | FetchState::Loading => return Err(AppError::Cancelled),
    };

    Ok(LinkView {
        position,
        book,
        verses,
    })
}

/// Shareable link for a chapter or verse in the current translation and layout
pub async fn share_link(
    state: &mut AppState,
    book: &str,
    chapter: u32,
    verse: Option<u32>,
) -> Result<String> {
    let book = resolve_book(state, book).await?;
    let preferences = state.session.store().preferences();

    let mut position = ReadingPosition::new(book.name, chapter)
        .with_display(preferences.display_mode)
        .with_translation(preferences.translation.as_str());
    position.verse = verse;

    position.share_url(&state.config.site_url)
}

/// Link unfurling preview for a shared link
pub async fn preview_link(state: &AppState, link: &str) -> Result<LinkPreview> {
    let position = ReadingPosition::parse(link)?;
    position
        .preview(state.session.client(), &state.config.site_url)
        .await
}
