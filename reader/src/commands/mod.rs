//! Commands exposed to the command line
//!
//! All commands follow the pattern:
//! - Take AppState as first parameter
//! - Return Result<T> with a serializable T
//! - Are async when performing I/O
//!
//! `Cli` parses the command line; `run` dispatches one parsed command.
//!
//! Submodules:
//! - `reading`: translations, books, chapters, read marks and progress
//! - `notes`: notes, categories and highlights
//! - `links`: search, deep links and sharing

pub mod links;
pub mod notes;
pub mod reading;

pub use links::*;
pub use notes::*;
pub use reading::*;

use crate::app::AppState;
use crate::error::{AppError, Result};
use crate::models::{Book, DisplayMode};
use crate::services::search::match_books;
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "pathreader")]
#[command(about = "Bible reader with local progress, notes and highlights")]
#[command(
    after_help = "Environment:\n  PATHREADER_API_BASE_URL  Text API base URL\n  PATHREADER_SITE_URL      Site used for shared links\n  PATHREADER_DATA_DIR      Local state directory"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Version, data directory and API
    Info,
    /// List available translations
    Translations,
    /// Switch translation by short code
    Translation { code: String },
    /// List books of the selected translation
    Books,
    /// Show a chapter with its read mark and notes
    Read { book: String, chapter: u32 },
    /// Toggle a chapter's read mark
    Mark { book: String, chapter: u32 },
    /// Reading progress per testament and book
    Progress,
    /// One verse in several translations
    Compare {
        book: String,
        chapter: u32,
        verse: u32,
        #[arg(required = true)]
        translations: Vec<String>,
    },
    /// Resolve a reference such as "John 3:16"
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Open a deep link
    Link { url: String },
    /// Shareable link in the current translation and layout
    Share {
        book: String,
        chapter: u32,
        verse: Option<u32>,
    },
    /// Link unfurling preview
    Preview { url: String },
    /// List notes, optionally by category ("all" for any) and book
    Notes {
        category: Option<String>,
        book: Option<String>,
    },
    /// Write a note on a verse or range such as 3-5
    Note {
        book: String,
        chapter: u32,
        verses: String,
        category: String,
        text: Vec<String>,
    },
    /// Replace a note's own text
    EditNote {
        id: String,
        #[arg(required = true)]
        text: Vec<String>,
    },
    DeleteNote { id: String },
    /// Search notes by text or reference
    FindNotes {
        #[arg(required = true)]
        query: Vec<String>,
    },
    Categories,
    AddCategory { name: String },
    RenameCategory { old: String, new: String },
    DeleteCategory { name: String },
    Highlights,
    Highlight {
        book: String,
        chapter: u32,
        verse: u32,
    },
    DeleteHighlight { id: String },
    /// Reading layout: 1 verses, 2 paragraph, 3 book
    Display { mode: DisplayMode },
}

#[derive(Serialize)]
pub struct AppInfo {
    pub version: String,
    pub data_dir: String,
    pub api_base_url: String,
}

pub async fn get_app_info(state: &AppState) -> Result<AppInfo> {
    Ok(AppInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        data_dir: state.data_dir.to_string_lossy().to_string(),
        api_base_url: state.config.base_url.clone(),
    })
}

/// Run one parsed command and return its output as JSON
pub async fn run(state: &mut AppState, command: Command) -> Result<serde_json::Value> {
    tracing::debug!("Running command {:?}", command);

    match command {
        Command::Info => json(get_app_info(state).await?),
        Command::Translations => json(list_translations(state).await?),
        Command::Translation { code } => json(select_translation(state, &code).await?),
        Command::Books => json(list_books(state).await?),
        Command::Read { book, chapter } => json(read_chapter(state, &book, chapter).await?),
        Command::Mark { book, chapter } => json(toggle_read(state, &book, chapter).await?),
        Command::Progress => json(get_progress(state).await?),
        Command::Compare {
            book,
            chapter,
            verse,
            translations,
        } => {
            let codes: Vec<&str> = translations.iter().map(String::as_str).collect();
            json(compare_verse(state, &book, chapter, verse, &codes).await?)
        }
        Command::Search { query } => json(search(state, &query.join(" ")).await?),
        Command::Link { url } => json(open_link(state, &url).await?),
        Command::Share {
            book,
            chapter,
            verse,
        } => json(share_link(state, &book, chapter, verse).await?),
        Command::Preview { url } => json(preview_link(state, &url).await?),
        Command::Notes { category, book } => {
            json(list_notes(state, category.as_deref(), book.as_deref()).await?)
        }
        Command::Note {
            book,
            chapter,
            verses,
            category,
            text,
        } => {
            let user_note = (!text.is_empty()).then(|| text.join(" "));
            json(add_note(state, &book, chapter, &verses, &category, user_note).await?)
        }
        Command::EditNote { id, text } => json(edit_note(state, &id, &text.join(" ")).await?),
        Command::DeleteNote { id } => json(delete_note(state, &id).await?),
        Command::FindNotes { query } => json(search_notes(state, &query.join(" ")).await?),
        Command::Categories => json(list_categories(state).await?),
        Command::AddCategory { name } => json(add_category(state, &name).await?),
        Command::RenameCategory { old, new } => json(rename_category(state, &old, &new).await?),
        Command::DeleteCategory { name } => json(delete_category(state, &name).await?),
        Command::Highlights => json(list_highlights(state).await?),
        Command::Highlight {
            book,
            chapter,
            verse,
        } => json(add_highlight(state, &book, chapter, verse).await?),
        Command::DeleteHighlight { id } => json(delete_highlight(state, &id).await?),
        Command::Display { mode } => json(set_display_mode(state, mode).await?),
    }
}

fn json<T: Serialize>(value: T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

/// Resolve a book argument by id, name or unambiguous name prefix
pub(crate) async fn resolve_book(state: &mut AppState, query: &str) -> Result<Book> {
    if state.session.store().books().is_empty() {
        state.session.load_books().await;
    }

    let books = state.session.store().books();
    if books.is_empty() {
        return Err(AppError::Generic(
            "Book list unavailable: the text API could not be reached".to_string(),
        ));
    }

    match match_books(books, query).as_slice() {
        [book] => Ok((*book).clone()),
        [] => Err(AppError::Generic(format!("No book matches {:?}", query))),
        many => Err(AppError::Generic(format!(
            "{:?} is ambiguous: {}",
            query,
            many.iter()
                .map(|b| b.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}
