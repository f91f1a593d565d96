//! Reader session
//!
//! One reader window: the text client for the selected translation, the
//! reading state store and the open chapter. Opening a chapter supersedes
//! whatever chapter fetch was still in flight.

use super::annotations::NewNote;
use super::deep_link::ReadingPosition;
use super::reading_state::{MarkOutcome, ReadingStateStore};
use super::selection::{Anchor, NoteDraft, Selection, VerseIndex};
use crate::client::{find_book, FetchState, LatestRequest, TextClient};
use crate::config::ApiConfig;
use crate::error::Result;
use crate::models::{Book, Highlight, Note, Translation, Verse};
use crate::storage::LocalStorage;
use tokio::task::JoinHandle;

pub struct ReaderSession {
    client: TextClient,
    store: ReadingStateStore,
    chapter: LatestRequest<Vec<Verse>>,
    open_chapter: Option<(u32, u32)>,
}

impl ReaderSession {
    pub fn new(client: TextClient, store: ReadingStateStore) -> Self {
        Self {
            client,
            store,
            chapter: LatestRequest::new(),
            open_chapter: None,
        }
    }

    /// Load persisted state and bind a client to the saved translation
    pub async fn open(config: &ApiConfig, storage: LocalStorage) -> Result<Self> {
        let store = ReadingStateStore::open(storage).await?;
        let client = TextClient::new(config, store.preferences().translation.as_str())?;
        Ok(Self::new(client, store))
    }

    /// Client bound to the selected translation
    pub fn client(&self) -> &TextClient {
        &self.client
    }

    /// Persisted reading state
    pub fn store(&self) -> &ReadingStateStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ReadingStateStore {
        &mut self.store
    }

    /// Fetch the book list of the current translation.
    /// An empty list means the API could not be reached.
    pub async fn load_books(&mut self) -> &[Book] {
        let books = self.client.list_books().await;
        tracing::info!(
            "Loaded {} books for {}",
            books.len(),
            self.client.translation()
        );
        self.store.set_books(books);
        self.store.books()
    }

    /// Chapter count of a book, fetching it on first use
    pub async fn ensure_chapter_count(&mut self, book_id: u32) -> Result<Option<u32>> {
        if let Some(count) = self.store.chapter_count(book_id) {
            return Ok(Some(count));
        }

        let count = self.client.chapter_count(book_id).await;
        self.store.set_chapter_count(book_id, count).await?;
        Ok(self.store.chapter_count(book_id))
    }

    /// Fetch every chapter count so progress covers the whole canon
    pub async fn load_all_chapter_counts(&mut self) -> Result<()> {
        let ids: Vec<u32> = self.store.books().iter().map(|b| b.id).collect();
        for book_id in ids {
            self.ensure_chapter_count(book_id).await?;
        }
        Ok(())
    }

    /// Switch translation: persist it, rebind the client and reload books.
    /// Any chapter still loading is cancelled.
    pub async fn select_translation(&mut self, translation: &Translation) -> Result<()> {
        self.store.select_translation(translation).await?;
        self.client = self.client.for_translation(translation.short_code.as_str());

        self.chapter.cancel();
        self.open_chapter = None;
        self.load_books().await;
        Ok(())
    }

    /// Start loading a chapter, superseding any chapter still loading
    pub fn open_chapter(&mut self, book_id: u32, chapter: u32) -> JoinHandle<()> {
        tracing::debug!("Opening chapter {}-{}", book_id, chapter);
        self.open_chapter = Some((book_id, chapter));

        let client = self.client.clone();
        self.chapter
            .start(async move { client.fetch_verses(book_id, chapter).await })
    }

    /// Book id and chapter of the open chapter
    pub fn current_chapter(&self) -> Option<(u32, u32)> {
        self.open_chapter
    }

    /// Current load state of the open chapter
    pub fn chapter_state(&self) -> FetchState<Vec<Verse>> {
        self.chapter.state()
    }

    /// Wait until the open chapter has loaded or failed
    pub async fn chapter_settled(&self) -> FetchState<Vec<Verse>> {
        self.chapter.settled().await
    }

    /// Index of the open chapter, once its verses have loaded
    pub fn verse_index(&self) -> Option<VerseIndex> {
        let (book_id, chapter) = self.open_chapter?;
        match self.chapter.state() {
            FetchState::Loaded(verses) => Some(VerseIndex::from_verses(book_id, chapter, &verses)),
            _ => None,
        }
    }

    /// Toggle the read mark of the open chapter
    pub async fn toggle_current_chapter_read(&mut self) -> Result<Option<MarkOutcome>> {
        let Some((book_id, chapter)) = self.open_chapter else {
            return Ok(None);
        };

        self.ensure_chapter_count(book_id).await?;
        self.store.toggle_chapter_read(book_id, chapter).await
    }

    /// Jump to a deep-linked position. Translation and display mode change
    /// only when the link names them. Returns the resolved book, or `None`
    /// if no book matches.
    pub async fn apply_link(&mut self, position: &ReadingPosition) -> Result<Option<Book>> {
        tracing::info!("Applying link to {} {}", position.book, position.chapter);

        if let Some(code) = position.translation.as_deref() {
            if !self.client.translation().eq_ignore_ascii_case(code) {
                let translation = self.resolve_translation(code).await;
                self.select_translation(&translation).await?;
            }
        }
        if let Some(display) = position.display {
            self.store.set_display_mode(display).await?;
        }

        if self.store.books().is_empty() {
            self.load_books().await;
        }

        let Some(book) = find_book(self.store.books(), &position.book).cloned() else {
            tracing::warn!("No book matches {:?}", position.book);
            return Ok(None);
        };

        self.ensure_chapter_count(book.id).await?;
        self.open_chapter(book.id, position.chapter);
        Ok(Some(book))
    }

    /// Full translation for a linked code. The code doubles as the title
    /// when the API does not list it.
    async fn resolve_translation(&self, code: &str) -> Translation {
        let listed = self.client.list_translations().await;
        listed
            .into_iter()
            .find(|t| t.short_code.eq_ignore_ascii_case(code))
            .unwrap_or_else(|| {
                tracing::warn!("Translation {:?} is not listed, keeping the code as title", code);
                Translation {
                    title: code.to_string(),
                    short_code: code.to_string(),
                }
            })
    }

    /// Resolve a selection over the open chapter into a note draft
    pub fn draft_note(&self, selection: &Selection, anchor: Anchor) -> Option<NoteDraft> {
        self.verse_index()?.draft(selection, anchor)
    }

    /// Save a drafted note
    pub async fn save_note(
        &mut self,
        draft: &NoteDraft,
        category: &str,
        user_note: Option<String>,
    ) -> Result<Note> {
        let book_name = self
            .store
            .book(draft.book_id)
            .map(|b| b.name.clone())
            .unwrap_or_default();

        self.store
            .add_note(NewNote {
                book_id: draft.book_id,
                book_name,
                chapter: draft.chapter,
                range: draft.range,
                text: draft.quoted_text.clone(),
                category: category.to_string(),
                user_note,
            })
            .await
    }

    /// Highlight a verse of the open chapter
    pub async fn highlight_verse(&mut self, verse: u32) -> Result<Option<Highlight>> {
        let Some((book_id, chapter)) = self.open_chapter else {
            return Ok(None);
        };
        let FetchState::Loaded(verses) = self.chapter.state() else {
            return Ok(None);
        };
        let Some(found) = verses.into_iter().find(|v| v.verse == verse) else {
            return Ok(None);
        };

        let book_name = self
            .store
            .book(book_id)
            .map(|b| b.name.clone())
            .unwrap_or_default();

        self.store
            .add_highlight(book_id, &book_name, chapter, verse, &found.text)
            .await
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DisplayMode;

    async fn offline_session() -> ReaderSession {
        let config = ApiConfig::default().with_base_url("http://127.0.0.1:9");
        ReaderSession::open(&config, LocalStorage::in_memory())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_session_uses_saved_translation() {
        let storage = LocalStorage::in_memory();
        storage
            .save(crate::config::KEY_SELECTED_TRANSLATION_SHORT, "KJV")
            .await
            .unwrap();

        let session = ReaderSession::open(&ApiConfig::default(), storage).await.unwrap();
        assert_eq!(session.client().translation(), "KJV");
    }

    #[tokio::test]
    async fn test_unreachable_api_leaves_counts_unknown() {
        let mut session = offline_session().await;

        assert!(session.load_books().await.is_empty());
        assert_eq!(session.ensure_chapter_count(1).await.unwrap(), None);

        session.open_chapter(1, 1);
        assert!(matches!(session.chapter_settled().await, FetchState::Failed(_)));
        assert!(session.verse_index().is_none());

        // No count, so the mark is refused
        assert!(session.toggle_current_chapter_read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_link_without_display_or_translation_keeps_preferences() {
        let storage = LocalStorage::in_memory();
        storage
            .save(crate::config::KEY_SELECTED_TRANSLATION_SHORT, "KJV")
            .await
            .unwrap();
        storage
            .save(crate::config::KEY_DISPLAY_MODE, &DisplayMode::Book)
            .await
            .unwrap();
        let config = ApiConfig::default().with_base_url("http://127.0.0.1:9");
        let mut session = ReaderSession::open(&config, storage).await.unwrap();

        let position = ReadingPosition::parse("/?book=John&chapter=3").unwrap();
        assert!(session.apply_link(&position).await.unwrap().is_none());

        assert_eq!(session.client().translation(), "KJV");
        assert_eq!(session.store().preferences().translation, "KJV");
        assert_eq!(session.store().preferences().display_mode, DisplayMode::Book);
    }

    #[tokio::test]
    async fn test_link_to_unlisted_translation_uses_code_as_title() {
        let mut session = offline_session().await;

        let position = ReadingPosition::parse("/?book=John&chapter=3&translation=WEB").unwrap();
        session.apply_link(&position).await.unwrap();

        let preferences = session.store().preferences();
        assert_eq!(preferences.translation, "WEB");
        assert_eq!(preferences.translation_title, "WEB");
        assert_eq!(session.client().translation(), "WEB");
    }

    #[tokio::test]
    async fn test_nothing_open_means_nothing_to_mark() {
        let mut session = offline_session().await;

        assert!(session.current_chapter().is_none());
        assert!(session.toggle_current_chapter_read().await.unwrap().is_none());
        assert!(session.highlight_verse(1).await.unwrap().is_none());
    }
}
