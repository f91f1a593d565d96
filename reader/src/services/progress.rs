//! Reading progress
//!
//! Read marks and the book completion derivation. Completion is never
//! written directly: [`compute_completion`] derives it from the marks and
//! the known chapter counts, and the caller persists the result when
//! something changed.

use crate::models::{chapter_key, Book, Testament};
use serde::Serialize;
use std::collections::BTreeMap;

/// `"{bookId}-{chapter}"` → read
pub type ReadChapters = BTreeMap<String, bool>;

/// bookId → completed. Only completed books have an entry.
pub type CompletedBooks = BTreeMap<u32, bool>;

/// bookId → number of chapters, for books whose count is known
pub type ChapterCounts = BTreeMap<u32, u32>;

pub fn is_chapter_read(read: &ReadChapters, book_id: u32, chapter: u32) -> bool {
    read.get(&chapter_key(book_id, chapter))
        .copied()
        .unwrap_or(false)
}

/// Flip a chapter's mark and return the new state.
///
/// Unmarking removes the key, so two toggles leave the map as it was.
pub fn toggle_mark(read: &mut ReadChapters, book_id: u32, chapter: u32) -> bool {
    let key = chapter_key(book_id, chapter);
    if read.get(&key).copied().unwrap_or(false) {
        read.remove(&key);
        false
    } else {
        read.insert(key, true);
        true
    }
}

/// Count of chapters in `1..=count` marked read
pub fn chapters_read(read: &ReadChapters, book_id: u32, count: u32) -> u32 {
    (1..=count)
        .filter(|chapter| is_chapter_read(read, book_id, *chapter))
        .count() as u32
}

/// True iff `count` is known, non-zero, and every chapter is marked
pub fn is_book_complete(read: &ReadChapters, book_id: u32, count: Option<u32>) -> bool {
    match count {
        Some(count) if count > 0 => chapters_read(read, book_id, count) == count,
        _ => false,
    }
}

/// Result of re-deriving completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionUpdate {
    pub completed: CompletedBooks,
    /// Books that just became complete, in book order
    pub newly_completed: Vec<u32>,
    /// Books whose completion was removed
    pub no_longer_completed: Vec<u32>,
}

impl CompletionUpdate {
    pub fn changed(&self) -> bool {
        !self.newly_completed.is_empty() || !self.no_longer_completed.is_empty()
    }
}

/// Derive completion for every book with a known chapter count.
///
/// Books without a known count keep whatever `previous` says about them.
pub fn compute_completion(
    counts: &ChapterCounts,
    read: &ReadChapters,
    previous: &CompletedBooks,
) -> CompletionUpdate {
    let mut update = CompletionUpdate {
        completed: previous.clone(),
        ..Default::default()
    };

    for (&book_id, &count) in counts {
        let is_complete = is_book_complete(read, book_id, Some(count));
        let was_complete = previous.get(&book_id).copied().unwrap_or(false);

        if is_complete == was_complete {
            continue;
        }

        if is_complete {
            update.completed.insert(book_id, true);
            update.newly_completed.push(book_id);
        } else {
            update.completed.remove(&book_id);
            update.no_longer_completed.push(book_id);
        }
    }

    update
}

/// Read progress of one book
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookProgress {
    pub book_id: u32,
    pub name: String,
    pub chapters_read: u32,
    pub chapter_count: u32,
    pub complete: bool,
}

/// Aggregate progress over a testament
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestamentProgress {
    pub testament: Testament,
    pub books_complete: u32,
    pub books: u32,
    pub chapters_read: u32,
    pub chapters: u32,
}

/// Progress of every book whose chapter count is known
pub fn book_progress(books: &[Book], counts: &ChapterCounts, read: &ReadChapters) -> Vec<BookProgress> {
    books
        .iter()
        .filter_map(|book| {
            let count = *counts.get(&book.id)?;
            let read_count = chapters_read(read, book.id, count);
            Some(BookProgress {
                book_id: book.id,
                name: book.name.clone(),
                chapters_read: read_count,
                chapter_count: count,
                complete: count > 0 && read_count == count,
            })
        })
        .collect()
}

/// Progress grouped by testament, Old then New then Other.
/// Testaments with no known books are left out.
pub fn testament_progress(
    books: &[Book],
    counts: &ChapterCounts,
    read: &ReadChapters,
) -> Vec<TestamentProgress> {
    let mut totals: BTreeMap<Testament, TestamentProgress> = BTreeMap::new();

    for (book, progress) in books
        .iter()
        .filter(|b| counts.contains_key(&b.id))
        .zip(book_progress(books, counts, read))
    {
        let entry = totals
            .entry(book.testament())
            .or_insert_with(|| TestamentProgress {
                testament: book.testament(),
                books_complete: 0,
                books: 0,
                chapters_read: 0,
                chapters: 0,
            });

        entry.books += 1;
        entry.chapters += progress.chapter_count;
        entry.chapters_read += progress.chapters_read;
        if progress.complete {
            entry.books_complete += 1;
        }
    }

    totals.into_values().collect()
}
