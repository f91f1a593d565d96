//! Reading state store
//!
//! Owns everything the reader persists locally: read marks, book
//! completion, notes, note categories, highlights and display
//! preferences. Every mutation writes the affected collection back in
//! full, and completion is re-derived explicitly after any change to its
//! inputs (books' chapter counts or read marks).

use super::annotations::{Annotations, NewNote, NoteFilter};
use super::progress::{
    self, BookProgress, ChapterCounts, CompletedBooks, CompletionUpdate, ReadChapters,
    TestamentProgress,
};
use crate::config::{
    DEFAULT_TRANSLATION, KEY_COMPLETED_BOOKS, KEY_DISPLAY_MODE, KEY_HIGHLIGHTS,
    KEY_NOTES, KEY_NOTE_CATEGORIES, KEY_READ_CHAPTERS, KEY_SELECTED_TRANSLATION,
    KEY_SELECTED_TRANSLATION_SHORT,
};
use crate::error::Result;
use crate::models::{Book, DisplayMode, Highlight, Note, Translation};
use crate::storage::LocalStorage;
use serde::Serialize;

/// Display preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Title of the selected translation, e.g. "American King James Version"
    pub translation_title: String,
    /// Short code of the selected translation, e.g. "AKJV"
    pub translation: String,
    pub display_mode: DisplayMode,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            translation_title: String::new(),
            translation: DEFAULT_TRANSLATION.to_string(),
            display_mode: DisplayMode::default(),
        }
    }
}

/// A book that just had its last chapter marked read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookCompleted {
    pub book_id: u32,
    pub book_name: Option<String>,
}

/// Result of setting or toggling a read mark
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkOutcome {
    /// Mark state after the change
    pub read: bool,
    pub completion: CompletionUpdate,
    /// Books to celebrate
    pub celebrations: Vec<BookCompleted>,
}

pub struct ReadingStateStore {
    storage: LocalStorage,
    books: Vec<Book>,
    chapter_counts: ChapterCounts,
    read_chapters: ReadChapters,
    completed_books: CompletedBooks,
    annotations: Annotations,
    preferences: Preferences,
}

impl ReadingStateStore {
    /// Load persisted state. Malformed entries come back as defaults.
    pub async fn open(storage: LocalStorage) -> Result<Self> {
        tracing::info!("Loading reading state");

        let mut read_chapters: ReadChapters =
            storage.load(KEY_READ_CHAPTERS, ReadChapters::new()).await;
        read_chapters.retain(|_, read| *read);

        let mut completed_books: CompletedBooks =
            storage.load(KEY_COMPLETED_BOOKS, CompletedBooks::new()).await;
        completed_books.retain(|_, complete| *complete);

        let notes: Vec<Note> = storage.load(KEY_NOTES, Vec::new()).await;
        let saved_categories: Option<Vec<String>> = storage.load(KEY_NOTE_CATEGORIES, None).await;
        let highlights: Vec<Highlight> = storage.load(KEY_HIGHLIGHTS, Vec::new()).await;

        let annotations = Annotations::new(notes, saved_categories.clone(), highlights);
        if saved_categories.as_deref() != Some(annotations.categories()) {
            storage
                .save(KEY_NOTE_CATEGORIES, annotations.categories())
                .await?;
        }

        let defaults = Preferences::default();
        let preferences = Preferences {
            translation_title: storage
                .load(KEY_SELECTED_TRANSLATION, defaults.translation_title)
                .await,
            translation: storage
                .load(KEY_SELECTED_TRANSLATION_SHORT, defaults.translation)
                .await,
            display_mode: storage.load(KEY_DISPLAY_MODE, defaults.display_mode).await,
        };

        tracing::info!(
            "Reading state loaded: {} read chapters, {} notes, {} highlights",
            read_chapters.len(),
            annotations.notes().len(),
            annotations.highlights().len()
        );

        Ok(Self {
            storage,
            books: Vec::new(),
            chapter_counts: ChapterCounts::new(),
            read_chapters,
            completed_books,
            annotations,
            preferences,
        })
    }

    /// Backing storage, shared with anything else the session persists
    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    // ===== Catalog =====

    /// Books of the selected translation, empty until loaded
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    /// Look up a loaded book by id
    pub fn book(&self, book_id: u32) -> Option<&Book> {
        self.books.iter().find(|b| b.id == book_id)
    }

    /// Replace the book list, e.g. after switching translation.
    /// Chapter counts are translation-specific and are dropped.
    pub fn set_books(&mut self, books: Vec<Book>) {
        self.books = books;
        self.chapter_counts.clear();
    }

    /// Known chapter count of a book
    pub fn chapter_count(&self, book_id: u32) -> Option<u32> {
        self.chapter_counts.get(&book_id).copied()
    }

    pub fn chapter_counts(&self) -> &ChapterCounts {
        &self.chapter_counts
    }

    /// Record a fetched chapter count. Zero means unknown and is ignored.
    pub async fn set_chapter_count(&mut self, book_id: u32, count: u32) -> Result<CompletionUpdate> {
        if count == 0 {
            tracing::debug!("Ignoring unknown chapter count for book {}", book_id);
            return Ok(CompletionUpdate {
                completed: self.completed_books.clone(),
                ..Default::default()
            });
        }

        self.chapter_counts.insert(book_id, count);
        self.recompute_completion().await
    }

    // ===== Read marks & completion =====

    /// Read marks keyed `"{book}-{chapter}"`, only `true` entries
    pub fn read_chapters(&self) -> &ReadChapters {
        &self.read_chapters
    }

    pub fn is_chapter_read(&self, book_id: u32, chapter: u32) -> bool {
        progress::is_chapter_read(&self.read_chapters, book_id, chapter)
    }

    pub fn completed_books(&self) -> &CompletedBooks {
        &self.completed_books
    }

    /// True iff the book's chapter count is known and every chapter is read
    pub fn is_book_completed(&self, book_id: u32) -> bool {
        progress::is_book_complete(&self.read_chapters, book_id, self.chapter_count(book_id))
    }

    fn accepts_mark(&self, book_id: u32, chapter: u32) -> bool {
        match self.chapter_count(book_id) {
            Some(count) => chapter >= 1 && chapter <= count,
            None => false,
        }
    }

    /// Flip a chapter's read mark.
    ///
    /// Returns `None` when the chapter is outside the book's known range,
    /// or the book's chapter count is not known yet.
    pub async fn toggle_chapter_read(
        &mut self,
        book_id: u32,
        chapter: u32,
    ) -> Result<Option<MarkOutcome>> {
        if !self.accepts_mark(book_id, chapter) {
            tracing::debug!("Ignoring read mark for {}-{}: out of range", book_id, chapter);
            return Ok(None);
        }

        let read = progress::toggle_mark(&mut self.read_chapters, book_id, chapter);
        self.after_mark(read).await.map(Some)
    }

    /// Set a chapter's read mark to `read`
    pub async fn set_chapter_read(
        &mut self,
        book_id: u32,
        chapter: u32,
        read: bool,
    ) -> Result<Option<MarkOutcome>> {
        if self.is_chapter_read(book_id, chapter) == read {
            if !self.accepts_mark(book_id, chapter) {
                return Ok(None);
            }
            return Ok(Some(MarkOutcome {
                read,
                completion: CompletionUpdate {
                    completed: self.completed_books.clone(),
                    ..Default::default()
                },
                celebrations: Vec::new(),
            }));
        }

        self.toggle_chapter_read(book_id, chapter).await
    }

    async fn after_mark(&mut self, read: bool) -> Result<MarkOutcome> {
        self.storage
            .save(KEY_READ_CHAPTERS, &self.read_chapters)
            .await?;

        let completion = self.recompute_completion().await?;
        let celebrations = completion
            .newly_completed
            .iter()
            .map(|&book_id| BookCompleted {
                book_id,
                book_name: self.book(book_id).map(|b| b.name.clone()),
            })
            .collect();

        Ok(MarkOutcome {
            read,
            completion,
            celebrations,
        })
    }

    /// Re-derive book completion and persist it if anything changed
    pub async fn recompute_completion(&mut self) -> Result<CompletionUpdate> {
        let update = progress::compute_completion(
            &self.chapter_counts,
            &self.read_chapters,
            &self.completed_books,
        );

        if update.changed() {
            for book_id in &update.newly_completed {
                let name = self.book(*book_id).map(|b| b.name.as_str()).unwrap_or("?");
                tracing::info!("Book {} ({}) completed", book_id, name);
            }

            self.completed_books = update.completed.clone();
            self.storage
                .save(KEY_COMPLETED_BOOKS, &self.completed_books)
                .await?;
        }

        Ok(update)
    }

    pub fn book_progress(&self) -> Vec<BookProgress> {
        progress::book_progress(&self.books, &self.chapter_counts, &self.read_chapters)
    }

    pub fn testament_progress(&self) -> Vec<TestamentProgress> {
        progress::testament_progress(&self.books, &self.chapter_counts, &self.read_chapters)
    }

    // ===== Notes & highlights =====

    /// Notes, categories and highlights
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn filter_notes(&self, filter: &NoteFilter) -> Vec<&Note> {
        self.annotations.filter_notes(filter)
    }

    async fn save_notes(&self) -> Result<()> {
        self.storage.save(KEY_NOTES, self.annotations.notes()).await
    }

    async fn save_categories(&self) -> Result<()> {
        self.storage
            .save(KEY_NOTE_CATEGORIES, self.annotations.categories())
            .await
    }

    async fn save_highlights(&self) -> Result<()> {
        self.storage
            .save(KEY_HIGHLIGHTS, self.annotations.highlights())
            .await
    }

    /// Create a note and persist the note list
    pub async fn add_note(&mut self, new: NewNote) -> Result<Note> {
        tracing::info!(
            "Adding note on {} {}:{}",
            new.book_name,
            new.chapter,
            new.range
        );

        let note = self.annotations.add_note(new);
        self.save_notes().await?;

        tracing::info!("Note created successfully: {}", note.id);
        Ok(note)
    }

    /// Replace a note's own text. `false` if no note has that id.
    pub async fn edit_user_note(&mut self, id: &str, text: &str) -> Result<bool> {
        if !self.annotations.edit_user_note(id, text) {
            return Ok(false);
        }
        self.save_notes().await?;
        Ok(true)
    }

    pub async fn delete_note(&mut self, id: &str) -> Result<bool> {
        if !self.annotations.delete_note(id) {
            return Ok(false);
        }
        self.save_notes().await?;
        tracing::info!("Note deleted: {}", id);
        Ok(true)
    }

    pub async fn add_category(&mut self, name: &str) -> Result<bool> {
        if !self.annotations.add_category(name) {
            tracing::debug!("Ignoring category {:?}: blank or already present", name);
            return Ok(false);
        }
        self.save_categories().await?;
        Ok(true)
    }

    pub async fn rename_category(&mut self, old: &str, new: &str) -> Result<bool> {
        if !self.annotations.rename_category(old, new) {
            tracing::debug!("Ignoring rename of category {:?} to {:?}", old, new);
            return Ok(false);
        }
        self.save_notes().await?;
        self.save_categories().await?;
        tracing::info!("Category {:?} renamed to {:?}", old, new.trim());
        Ok(true)
    }

    /// Delete a category, moving its notes to "General"
    pub async fn delete_category(&mut self, name: &str) -> Result<bool> {
        if !self.annotations.delete_category(name) {
            tracing::debug!("Ignoring delete of category {:?}", name);
            return Ok(false);
        }
        self.save_notes().await?;
        self.save_categories().await?;
        tracing::info!("Category {:?} deleted", name);
        Ok(true)
    }

    pub async fn add_highlight(
        &mut self,
        book_id: u32,
        book_name: &str,
        chapter: u32,
        verse: u32,
        text: &str,
    ) -> Result<Highlight> {
        let (highlight, created) = self
            .annotations
            .add_highlight(book_id, book_name, chapter, verse, text);

        if created {
            self.save_highlights().await?;
        }
        Ok(highlight)
    }

    pub async fn delete_highlight(&mut self, id: &str) -> Result<bool> {
        if !self.annotations.delete_highlight(id) {
            return Ok(false);
        }
        self.save_highlights().await?;
        Ok(true)
    }

    // ===== Preferences =====

    /// Selected translation and display mode
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Persist both the title and the short code of a translation
    pub async fn select_translation(&mut self, translation: &Translation) -> Result<()> {
        tracing::info!("Selecting translation {}", translation.short_code);

        self.preferences.translation_title = translation.title.clone();
        self.preferences.translation = translation.short_code.clone();

        self.storage
            .save(KEY_SELECTED_TRANSLATION, &self.preferences.translation_title)
            .await?;
        self.storage
            .save(KEY_SELECTED_TRANSLATION_SHORT, &self.preferences.translation)
            .await?;
        Ok(())
    }

    pub async fn set_display_mode(&mut self, mode: DisplayMode) -> Result<()> {
        self.preferences.display_mode = mode;
        self.storage.save(KEY_DISPLAY_MODE, &mode).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{chapter_key, VerseRange};

    async fn open_store() -> ReadingStateStore {
        ReadingStateStore::open(LocalStorage::in_memory()).await.unwrap()
    }

    fn genesis_note(category: &str, range: VerseRange) -> NewNote {
        NewNote {
            book_id: 1,
            book_name: "Genesis".to_string(),
            chapter: 1,
            range,
            text: "combined verse text".to_string(),
            category: category.to_string(),
            user_note: None,
        }
    }

    #[tokio::test]
    async fn test_fresh_store_seeds_categories() {
        let store = open_store().await;

        assert_eq!(
            store.annotations().categories(),
            &["General", "Prayer", "Study", "Question", "Insight"]
        );
        let saved: Vec<String> = store.storage().load(KEY_NOTE_CATEGORIES, Vec::new()).await;
        assert_eq!(saved, store.annotations().categories());
        assert_eq!(store.preferences().translation, "AKJV");
    }

    #[tokio::test]
    async fn test_mark_requires_known_chapter_range() {
        let mut store = open_store().await;

        assert!(store.toggle_chapter_read(1, 1).await.unwrap().is_none());

        store.set_chapter_count(1, 50).await.unwrap();
        assert!(store.toggle_chapter_read(1, 0).await.unwrap().is_none());
        assert!(store.toggle_chapter_read(1, 51).await.unwrap().is_none());
        assert!(store.read_chapters().is_empty());

        let outcome = store.toggle_chapter_read(1, 50).await.unwrap().unwrap();
        assert!(outcome.read);
        assert!(store.is_chapter_read(1, 50));
    }

    #[tokio::test]
    async fn test_completion_follows_marks() {
        let mut store = open_store().await;
        store.set_books(vec![Book {
            id: 31,
            name: "Obadiah".to_string(),
        }]);
        store.set_chapter_count(31, 1).await.unwrap();

        let outcome = store.toggle_chapter_read(31, 1).await.unwrap().unwrap();
        assert!(store.is_book_completed(31));
        assert_eq!(outcome.completion.newly_completed, vec![31]);
        assert_eq!(
            outcome.celebrations,
            vec![BookCompleted {
                book_id: 31,
                book_name: Some("Obadiah".to_string())
            }]
        );

        let saved: CompletedBooks = store.storage().load(KEY_COMPLETED_BOOKS, CompletedBooks::new()).await;
        assert_eq!(saved.get(&31), Some(&true));

        // Removing the mark un-completes without celebration
        let outcome = store.toggle_chapter_read(31, 1).await.unwrap().unwrap();
        assert!(!outcome.read);
        assert!(outcome.celebrations.is_empty());
        assert_eq!(outcome.completion.no_longer_completed, vec![31]);
        assert!(!store.is_book_completed(31));
        assert!(store.completed_books().is_empty());
    }

    #[tokio::test]
    async fn test_set_chapter_read_is_idempotent() {
        let mut store = open_store().await;
        store.set_chapter_count(2, 40).await.unwrap();

        store.set_chapter_read(2, 3, true).await.unwrap();
        let again = store.set_chapter_read(2, 3, true).await.unwrap().unwrap();

        assert!(again.read);
        assert_eq!(store.read_chapters().len(), 1);
        assert_eq!(store.read_chapters().get(&chapter_key(2, 3)), Some(&true));
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let storage = LocalStorage::in_memory();

        {
            let mut store = ReadingStateStore::open(storage.clone()).await.unwrap();
            store.set_chapter_count(1, 50).await.unwrap();
            store.toggle_chapter_read(1, 1).await.unwrap();
            store
                .add_note(genesis_note("Study", VerseRange::new(1, 2)))
                .await
                .unwrap();
            store.add_category("Family").await.unwrap();
            store.add_highlight(1, "Genesis", 1, 3, "And God said").await.unwrap();
            store.set_display_mode(DisplayMode::Book).await.unwrap();
        }

        let store = ReadingStateStore::open(storage).await.unwrap();
        assert!(store.is_chapter_read(1, 1));
        assert_eq!(store.annotations().notes().len(), 1);
        assert!(store.annotations().has_category("Family"));
        assert_eq!(store.annotations().highlights().len(), 1);
        assert_eq!(store.preferences().display_mode, DisplayMode::Book);
    }

    #[tokio::test]
    async fn test_category_deletion_persists_both_collections() {
        let mut store = open_store().await;
        let prayer = store
            .add_note(genesis_note("Prayer", VerseRange::single(1)))
            .await
            .unwrap();

        assert!(store.delete_category("Prayer").await.unwrap());
        assert!(!store.delete_category("General").await.unwrap());

        let notes: Vec<Note> = store.storage().load(KEY_NOTES, Vec::new()).await;
        assert_eq!(notes[0].id, prayer.id);
        assert_eq!(notes[0].category, "General");

        let categories: Vec<String> = store.storage().load(KEY_NOTE_CATEGORIES, Vec::new()).await;
        assert!(!categories.contains(&"Prayer".to_string()));
        assert!(categories.contains(&"General".to_string()));
    }

    #[tokio::test]
    async fn test_deleted_default_category_stays_deleted_after_reopen() {
        let storage = LocalStorage::in_memory();
        storage
            .save(KEY_NOTE_CATEGORIES, &["General", "Prayer", "Study"])
            .await
            .unwrap();

        {
            let mut store = ReadingStateStore::open(storage.clone()).await.unwrap();
            assert_eq!(store.annotations().categories(), &["General", "Prayer", "Study"]);

            store
                .add_note(genesis_note("Prayer", VerseRange::single(1)))
                .await
                .unwrap();
            store
                .add_note(genesis_note("Study", VerseRange::single(2)))
                .await
                .unwrap();
            assert!(store.delete_category("Prayer").await.unwrap());
        }

        let store = ReadingStateStore::open(storage.clone()).await.unwrap();
        assert_eq!(store.annotations().categories(), &["General", "Study"]);

        let categories: Vec<&str> = store
            .annotations()
            .notes()
            .iter()
            .map(|n| n.category.as_str())
            .collect();
        assert_eq!(categories, vec!["General", "Study"]);

        let saved: Vec<String> = storage.load(KEY_NOTE_CATEGORIES, Vec::new()).await;
        assert_eq!(saved, vec!["General", "Study"]);
    }

    #[tokio::test]
    async fn test_malformed_categories_are_reseeded() {
        let storage = LocalStorage::in_memory();
        storage.save(KEY_NOTE_CATEGORIES, "Prayer").await.unwrap();

        let store = ReadingStateStore::open(storage).await.unwrap();

        assert_eq!(
            store.annotations().categories(),
            &["General", "Prayer", "Study", "Question", "Insight"]
        );
    }

    #[tokio::test]
    async fn test_corrupt_notes_load_as_empty() {
        let storage = LocalStorage::in_memory();
        storage.save(KEY_NOTES, "definitely not a list").await.unwrap();

        let store = ReadingStateStore::open(storage.clone()).await.unwrap();

        assert!(store.annotations().notes().is_empty());
        assert_eq!(storage.raw(KEY_NOTES).await.unwrap(), Some("[]".to_string()));
    }

    #[tokio::test]
    async fn test_select_translation_persists_title_and_code() {
        let mut store = open_store().await;

        store
            .select_translation(&Translation {
                title: "King James Version".to_string(),
                short_code: "KJV".to_string(),
            })
            .await
            .unwrap();

        let code: String = store
            .storage()
            .load(KEY_SELECTED_TRANSLATION_SHORT, String::new())
            .await;
        let title: String = store.storage().load(KEY_SELECTED_TRANSLATION, String::new()).await;
        assert_eq!(code, "KJV");
        assert_eq!(title, "King James Version");
    }
}
