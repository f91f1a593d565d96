//! Verse range selection
//!
//! Maps a click on a verse, or a free text selection over a rendered
//! chapter, to a verse range. Resolution runs against a [`VerseIndex`]:
//! each rendered verse is a span of the chapter's rendered text, so the
//! host only has to report character offsets (plus any verse marker it
//! found above the selection endpoints). Column layout plays no part.

use crate::models::{Verse, VerseRange};
use serde::Serialize;

/// Where one verse sits in the rendered chapter text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerseSpan {
    pub verse: u32,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
}

/// Logical index of the verses rendered for one chapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerseIndex {
    pub book_id: u32,
    pub chapter: u32,
    spans: Vec<VerseSpan>,
    text: String,
}

/// One end of a text selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPoint {
    /// Offset into the rendered text
    pub offset: usize,
    /// Verse marker found on the nearest marked ancestor, if any
    pub marker: Option<u32>,
}

impl SelectionPoint {
    pub fn at(offset: usize) -> Self {
        Self {
            offset,
            marker: None,
        }
    }

    pub fn marked(offset: usize, verse: u32) -> Self {
        Self {
            offset,
            marker: Some(verse),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Click or context-click on a verse
    Verse(u32),
    /// Free text selection between two points, in either order
    Text {
        start: SelectionPoint,
        end: SelectionPoint,
    },
}

/// Screen position the note composer opens at
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
}

/// A note about to be written: what it covers and where to show the composer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteDraft {
    pub book_id: u32,
    pub chapter: u32,
    pub range: VerseRange,
    /// Text of the covered verses, joined by spaces
    pub quoted_text: String,
    pub anchor: Anchor,
}

/// Verse separator used when laying verses out as one text
const SEPARATOR: &str = " ";

impl VerseIndex {
    /// Index verses laid out in order, separated by single spaces
    pub fn from_verses(book_id: u32, chapter: u32, verses: &[Verse]) -> Self {
        let mut spans = Vec::with_capacity(verses.len());
        let mut text = String::new();

        for (i, verse) in verses.iter().enumerate() {
            if i > 0 {
                text.push_str(SEPARATOR);
            }
            let start = text.len();
            text.push_str(&verse.text);
            spans.push(VerseSpan {
                verse: verse.verse,
                start,
                end: text.len(),
            });
        }

        Self {
            book_id,
            chapter,
            spans,
            text,
        }
    }

    /// Index explicit spans, e.g. from a host with its own layout.
    /// Verse text is not known in this case.
    pub fn from_spans(book_id: u32, chapter: u32, spans: Vec<VerseSpan>) -> Self {
        Self {
            book_id,
            chapter,
            spans,
            text: String::new(),
        }
    }

    pub fn spans(&self) -> &[VerseSpan] {
        &self.spans
    }

    /// True if the chapter has a span for `verse`
    pub fn contains_verse(&self, verse: u32) -> bool {
        self.spans.iter().any(|s| s.verse == verse)
    }

    /// Verse whose span contains `offset`
    pub fn verse_at(&self, offset: usize) -> Option<u32> {
        self.spans
            .iter()
            .find(|s| s.start <= offset && offset < s.end)
            .map(|s| s.verse)
    }

    fn resolve_marker(&self, point: &SelectionPoint) -> Option<u32> {
        point.marker.filter(|verse| self.contains_verse(*verse))
    }

    /// Min and max verse whose span intersects `[from, to)`
    fn scan(&self, from: usize, to: usize) -> Option<VerseRange> {
        let mut hits = self
            .spans
            .iter()
            .filter(|s| s.start < to && from < s.end)
            .map(|s| s.verse);

        let first = hits.next()?;
        let (min, max) = hits.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Some(VerseRange::new(min, max))
    }

    /// Resolve a selection to a verse range, or `None` for an empty
    /// selection or one that touches no verse.
    pub fn resolve(&self, selection: &Selection) -> Option<VerseRange> {
        match selection {
            Selection::Verse(verse) => {
                if self.contains_verse(*verse) {
                    Some(VerseRange::single(*verse))
                } else {
                    None
                }
            }
            Selection::Text { start, end } => self.resolve_text(start, end),
        }
    }

    fn resolve_text(&self, start: &SelectionPoint, end: &SelectionPoint) -> Option<VerseRange> {
        if start.offset == end.offset && start.marker.is_none() && end.marker.is_none() {
            return None;
        }

        match (self.resolve_marker(start), self.resolve_marker(end)) {
            (Some(a), Some(b)) => Some(VerseRange::new(a, b)),
            (Some(v), None) | (None, Some(v)) => Some(VerseRange::single(v)),
            (None, None) => {
                let from = start.offset.min(end.offset);
                let to = start.offset.max(end.offset);
                self.scan(from, to)
            }
        }
    }

    /// Text of the verses in `range`, joined by spaces
    pub fn quoted_text(&self, range: &VerseRange) -> String {
        self.spans
            .iter()
            .filter(|s| range.contains(s.verse))
            .filter_map(|s| self.text.get(s.start..s.end))
            .collect::<Vec<_>>()
            .join(SEPARATOR)
    }

    /// Resolve a selection and prepare the note composer at `anchor`
    pub fn draft(&self, selection: &Selection, anchor: Anchor) -> Option<NoteDraft> {
        let range = self.resolve(selection)?;

        Some(NoteDraft {
            book_id: self.book_id,
            chapter: self.chapter,
            range,
            quoted_text: self.quoted_text(&range),
            anchor,
        })
    }
}
