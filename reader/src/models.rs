//! Reader models
//!
//! Rust structs for the text API payloads and the locally persisted
//! annotation records. Field names follow the camelCase JSON shapes
//! used on the wire and in local storage.

use crate::config::{LAST_NEW_TESTAMENT_BOOK, LAST_OLD_TESTAMENT_BOOK};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A Bible edition offered by the text API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub title: String,
    /// Short code such as `AKJV`
    #[serde(rename = "translation")]
    pub short_code: String,
}

/// A book within a translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: u32,
    pub name: String,
}

impl Book {
    pub fn testament(&self) -> Testament {
        Testament::of(self.id)
    }
}

/// Canon partition used to group books
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Testament {
    Old,
    New,
    /// Deuterocanonical or translation-specific books past Revelation
    Other,
}

impl Testament {
    pub fn of(book_id: u32) -> Self {
        match book_id {
            1..=LAST_OLD_TESTAMENT_BOOK => Testament::Old,
            id if id > LAST_OLD_TESTAMENT_BOOK && id <= LAST_NEW_TESTAMENT_BOOK => Testament::New,
            _ => Testament::Other,
        }
    }
}

/// A single verse of a chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub verse: u32,
    pub text: String,
}

/// Inclusive verse range with `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerseRange {
    pub start: u32,
    pub end: u32,
}

impl VerseRange {
    /// Build a range from two endpoints in either order
    pub fn new(a: u32, b: u32) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn single(verse: u32) -> Self {
        Self {
            start: verse,
            end: verse,
        }
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, verse: u32) -> bool {
        (self.start..=self.end).contains(&verse)
    }

    /// The `verseEnd` value stored on a note: absent for a single verse
    pub fn verse_end(&self) -> Option<u32> {
        if self.is_single() {
            None
        } else {
            Some(self.end)
        }
    }
}

impl fmt::Display for VerseRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A user annotation on a verse or verse range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub book_id: u32,
    pub book_name: String,
    pub chapter: u32,
    /// Start verse. Older records may hold a whole-chapter note with no verse.
    #[serde(default)]
    pub verse: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verse_end: Option<u32>,
    /// Quoted verse text
    pub text: String,
    pub category: String,
    /// Epoch milliseconds
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_note: Option<String>,
}

impl Note {
    /// Verse range the note is anchored to, if it has a start verse
    pub fn range(&self) -> Option<VerseRange> {
        let start = self.verse?;
        Some(VerseRange::new(start, self.verse_end.unwrap_or(start)))
    }

    /// Human-readable reference such as `Genesis 1:1-2`
    pub fn reference(&self) -> String {
        match self.range() {
            Some(range) => format!("{} {}:{}", self.book_name, self.chapter, range),
            None => format!("{} {}", self.book_name, self.chapter),
        }
    }
}

/// A single-verse bookmark with no category or commentary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub id: String,
    pub book_id: u32,
    pub book_name: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
    /// Epoch milliseconds
    pub created_at: i64,
}

/// Reading layout, persisted as its number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DisplayMode {
    /// One verse per line
    #[default]
    Verses,
    /// Verses flowed into a paragraph
    Paragraph,
    /// Two-column book spread
    Book,
}

impl From<DisplayMode> for u8 {
    fn from(mode: DisplayMode) -> Self {
        match mode {
            DisplayMode::Verses => 1,
            DisplayMode::Paragraph => 2,
            DisplayMode::Book => 3,
        }
    }
}

impl TryFrom<u8> for DisplayMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(DisplayMode::Verses),
            2 => Ok(DisplayMode::Paragraph),
            3 => Ok(DisplayMode::Book),
            other => Err(format!("unknown display mode {}", other)),
        }
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u8 = s
            .trim()
            .parse()
            .map_err(|_| format!("unknown display mode {:?}", s))?;
        DisplayMode::try_from(value)
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// Key of a read-chapter mark: `"{bookId}-{chapter}"`
pub fn chapter_key(book_id: u32, chapter: u32) -> String {
    format!("{}-{}", book_id, chapter)
}
