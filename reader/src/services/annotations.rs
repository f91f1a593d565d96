//! Notes, note categories and highlights
//!
//! In-memory collections and the rules that govern them. Persistence is
//! the caller's job: every mutating method reports whether it changed
//! anything, and [`ReadingStateStore`](super::ReadingStateStore) writes the
//! affected collections back in full.

use crate::config::{DEFAULT_CATEGORIES, GENERAL_CATEGORY};
use crate::models::{Highlight, Note, VerseRange};
use chrono::Utc;
use uuid::Uuid;

/// Input for [`Annotations::add_note`]
#[derive(Debug, Clone)]
pub struct NewNote {
    pub book_id: u32,
    pub book_name: String,
    pub chapter: u32,
    pub range: VerseRange,
    /// Quoted verse text
    pub text: String,
    pub category: String,
    pub user_note: Option<String>,
}

/// Criteria for listing notes. `None` matches everything.
#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    pub category: Option<String>,
    pub book_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotations {
    notes: Vec<Note>,
    categories: Vec<String>,
    highlights: Vec<Highlight>,
}

impl Default for Annotations {
    fn default() -> Self {
        Self::new(Vec::new(), None, Vec::new())
    }
}

fn new_id() -> String {
    Uuid::now_v7().to_string()
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn clean_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl Annotations {
    /// Build from loaded collections. `saved_categories` is `None` when
    /// nothing was stored yet, in which case the defaults are seeded.
    pub fn new(
        notes: Vec<Note>,
        saved_categories: Option<Vec<String>>,
        highlights: Vec<Highlight>,
    ) -> Self {
        let categories = merge_categories(saved_categories.as_deref(), &notes);
        Self {
            notes,
            categories,
            highlights,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    pub fn has_category(&self, name: &str) -> bool {
        self.categories.iter().any(|c| c == name)
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    /// Create a note. Unknown categories fall back to "General".
    pub fn add_note(&mut self, new: NewNote) -> Note {
        let category = if self.has_category(&new.category) {
            new.category
        } else {
            tracing::debug!(
                "Unknown category {:?}, filing note under {}",
                new.category,
                GENERAL_CATEGORY
            );
            GENERAL_CATEGORY.to_string()
        };

        let note = Note {
            id: new_id(),
            book_id: new.book_id,
            book_name: new.book_name,
            chapter: new.chapter,
            verse: Some(new.range.start),
            verse_end: new.range.verse_end(),
            text: new.text,
            category,
            created_at: now_millis(),
            user_note: new.user_note.as_deref().and_then(clean_text),
        };

        self.notes.push(note.clone());
        note
    }

    /// Replace a note's commentary. Blank text clears it.
    pub fn edit_user_note(&mut self, id: &str, text: &str) -> bool {
        match self.notes.iter_mut().find(|n| n.id == id) {
            Some(note) => {
                note.user_note = clean_text(text);
                true
            }
            None => false,
        }
    }

    pub fn delete_note(&mut self, id: &str) -> bool {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        self.notes.len() != before
    }

    /// Add a category. Blank or existing names are ignored.
    pub fn add_category(&mut self, name: &str) -> bool {
        let Some(name) = clean_text(name) else {
            return false;
        };
        if self.has_category(&name) {
            return false;
        }

        self.categories.push(name);
        true
    }

    /// Rename a category and every note filed under it.
    ///
    /// Ignored for "General", for unknown categories, for blank names and
    /// for names taken by another category.
    pub fn rename_category(&mut self, old: &str, new: &str) -> bool {
        let Some(new) = clean_text(new) else {
            return false;
        };
        if old == GENERAL_CATEGORY || !self.has_category(old) {
            return false;
        }
        if new == old {
            return false;
        }
        if self.has_category(&new) {
            return false;
        }

        for note in self.notes.iter_mut().filter(|n| n.category == old) {
            note.category = new.clone();
        }
        for category in self.categories.iter_mut().filter(|c| *c == old) {
            *category = new.clone();
        }
        true
    }

    /// Delete a category, moving its notes to "General"
    pub fn delete_category(&mut self, name: &str) -> bool {
        if name == GENERAL_CATEGORY || !self.has_category(name) {
            return false;
        }

        for note in self.notes.iter_mut().filter(|n| n.category == name) {
            note.category = GENERAL_CATEGORY.to_string();
        }
        self.categories.retain(|c| c != name);
        true
    }

    pub fn highlight_at(&self, book_id: u32, chapter: u32, verse: u32) -> Option<&Highlight> {
        self.highlights
            .iter()
            .find(|h| h.book_id == book_id && h.chapter == chapter && h.verse == verse)
    }

    /// Highlight a verse. Returns the highlight and whether it is new;
    /// an already highlighted verse is returned unchanged.
    pub fn add_highlight(
        &mut self,
        book_id: u32,
        book_name: &str,
        chapter: u32,
        verse: u32,
        text: &str,
    ) -> (Highlight, bool) {
        if let Some(existing) = self.highlight_at(book_id, chapter, verse) {
            return (existing.clone(), false);
        }

        let highlight = Highlight {
            id: new_id(),
            book_id,
            book_name: book_name.to_string(),
            chapter,
            verse,
            text: text.to_string(),
            created_at: now_millis(),
        };

        self.highlights.push(highlight.clone());
        (highlight, true)
    }

    pub fn delete_highlight(&mut self, id: &str) -> bool {
        let before = self.highlights.len();
        self.highlights.retain(|h| h.id != id);
        self.highlights.len() != before
    }

    /// Notes matching `filter`, newest first
    pub fn filter_notes(&self, filter: &NoteFilter) -> Vec<&Note> {
        let mut notes: Vec<&Note> = self
            .notes
            .iter()
            .filter(|n| filter.category.as_deref().map_or(true, |c| n.category == c))
            .filter(|n| filter.book_id.map_or(true, |b| n.book_id == b))
            .collect();

        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notes
    }

    /// Notes attached to a chapter, in verse order
    pub fn notes_for_chapter(&self, book_id: u32, chapter: u32) -> Vec<&Note> {
        let mut notes: Vec<&Note> = self
            .notes
            .iter()
            .filter(|n| n.book_id == book_id && n.chapter == chapter)
            .collect();

        notes.sort_by_key(|n| n.verse.unwrap_or(0));
        notes
    }

    /// Distinct books that have notes, in first-seen order
    pub fn note_books(&self) -> Vec<(u32, String)> {
        let mut books: Vec<(u32, String)> = Vec::new();
        for note in &self.notes {
            if !books.iter().any(|(id, _)| *id == note.book_id) {
                books.push((note.book_id, note.book_name.clone()));
            }
        }
        books
    }

    /// Case-insensitive search over quoted text, commentary and reference
    pub fn search_notes(&self, query: &str) -> Vec<&Note> {
        let query_lower = query.trim().to_lowercase();
        if query_lower.is_empty() {
            return Vec::new();
        }

        self.notes
            .iter()
            .filter(|note| {
                note.text.to_lowercase().contains(&query_lower)
                    || note
                        .user_note
                        .as_deref()
                        .map_or(false, |u| u.to_lowercase().contains(&query_lower))
                    || note.reference().to_lowercase().contains(&query_lower)
            })
            .collect()
    }
}

/// Saved categories (or the defaults when none were saved), then any
/// category a note still refers to, without duplicates.
/// "General" is always present and comes first.
pub fn merge_categories(saved: Option<&[String]>, notes: &[Note]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();

    let base: Vec<String> = match saved {
        Some(saved) => saved.to_vec(),
        None => DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
    };

    let candidates = std::iter::once(GENERAL_CATEGORY.to_string())
        .chain(base)
        .chain(notes.iter().map(|n| n.category.clone()));

    for category in candidates {
        if !category.trim().is_empty() && !merged.contains(&category) {
            merged.push(category);
        }
    }

    merged
}
