//! Integration tests for Pathreader
//!
//! These tests run against a local fake of the text API and verify:
//! - Client fetches, ordering and degraded failures
//! - Reading progress and notes end to end
//! - Search, deep links and superseded chapter loads
//! - Persistence across restarts through the SQLite store

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use pathreader::app::{self, AppState};
use pathreader::client::{FetchState, TextClient};
use pathreader::commands::{self, Cli};
use pathreader::config::{ApiConfig, KEY_NOTES, KEY_READ_CHAPTERS};
use pathreader::error::AppError;
use pathreader::models::DisplayMode;
use pathreader::services::search::{self, SearchOutcome};
use pathreader::services::{Anchor, ReaderSession, ReadingPosition, Selection, SelectionPoint};
use pathreader::storage::LocalStorage;
use serde_json::{json, Value};
use std::time::Duration;
use tempfile::TempDir;

const VERSES_PER_CHAPTER: u32 = 5;

fn chapter_count(book: u32) -> Option<u32> {
    match book {
        1 => Some(1),
        31 => Some(1),
        43 => Some(3),
        62 => Some(5),
        _ => None,
    }
}

async fn translations() -> Json<Value> {
    Json(json!([
        { "title": "American King James Version", "translation": "AKJV" },
        { "title": "King James Version", "translation": "KJV" }
    ]))
}

async fn books(Path(_code): Path<String>) -> Json<Value> {
    Json(json!([
        { "id": 1, "name": "Genesis" },
        { "id": 31, "name": "Obadiah" },
        { "id": 43, "name": "John" },
        { "id": 62, "name": "1 John" }
    ]))
}

async fn chapters(Path((_code, book)): Path<(String, u32)>) -> Result<Json<Value>, StatusCode> {
    let count = chapter_count(book).ok_or(StatusCode::NOT_FOUND)?;
    let chapters: serde_json::Map<String, Value> = (1..=count)
        .map(|n| (n.to_string(), json!({ "chapter": n })))
        .collect();
    Ok(Json(Value::Object(chapters)))
}

async fn verses(
    Path((code, book, chapter)): Path<(String, u32, u32)>,
) -> Result<Json<Value>, StatusCode> {
    let count = chapter_count(book).ok_or(StatusCode::NOT_FOUND)?;
    if chapter > count {
        return Err(StatusCode::NOT_FOUND);
    }

    // John 1 is slow so a newer chapter request can overtake it
    if book == 43 && chapter == 1 {
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    // Served out of order; the client sorts
    let verses: Vec<Value> = (1..=VERSES_PER_CHAPTER)
        .rev()
        .map(|v| json!({ "verse": v, "text": format!("{} {}:{}:{}", code, book, chapter, v) }))
        .collect();
    Ok(Json(Value::Array(verses)))
}

/// Start the fake text API and return its base URL
async fn spawn_fake_api() -> String {
    let router = Router::new()
        .route("/translations", get(translations))
        .route("/translations/{code}/books", get(books))
        .route("/translations/{code}/books/{book}/chapters", get(chapters))
        .route(
            "/translations/{code}/books/{book}/chapters/{chapter}/verses",
            get(verses),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}

async fn fake_config() -> ApiConfig {
    ApiConfig::default().with_base_url(spawn_fake_api().await)
}

async fn fresh_session() -> ReaderSession {
    ReaderSession::open(&fake_config().await, LocalStorage::in_memory())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_client_fetches_and_sorts() {
    let client = TextClient::new(&fake_config().await, "AKJV").unwrap();

    let translations = client.list_translations().await;
    assert_eq!(translations.len(), 2);
    assert_eq!(translations[1].short_code, "KJV");

    assert_eq!(client.list_books().await.len(), 4);
    assert_eq!(client.chapter_count(43).await, 3);

    let verses = client.list_verses(62, 2).await;
    let numbers: Vec<u32> = verses.iter().map(|v| v.verse).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    assert_eq!(verses[0].text, "AKJV 62:2:1");
}

#[tokio::test]
async fn test_client_failures_degrade_to_empty() {
    let client = TextClient::new(&fake_config().await, "AKJV").unwrap();

    match client.fetch_chapter_count(999).await {
        Err(AppError::Status { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected a 404, got {:?}", other.map(|_| ())),
    }

    assert_eq!(client.chapter_count(999).await, 0);
    assert!(client.list_verses(1, 40).await.is_empty());
}

#[tokio::test]
async fn test_compare_verse_across_translations() {
    let client = TextClient::new(&fake_config().await, "AKJV").unwrap();

    let comparisons = client.compare_verse(43, 3, 2, &["AKJV", "KJV"]).await;

    assert_eq!(comparisons.len(), 2);
    assert_eq!(comparisons[0].verse.as_ref().unwrap().text, "AKJV 43:3:2");
    assert_eq!(comparisons[1].verse.as_ref().unwrap().text, "KJV 43:3:2");
}

#[tokio::test]
async fn test_marking_single_chapter_book_completes_it() {
    let mut session = fresh_session().await;
    session.load_books().await;

    let position = ReadingPosition::new("Genesis", 1);
    let book = session.apply_link(&position).await.unwrap().unwrap();
    assert_eq!(book.id, 1);
    assert!(matches!(session.chapter_settled().await, FetchState::Loaded(_)));

    let outcome = session
        .toggle_current_chapter_read()
        .await
        .unwrap()
        .unwrap();

    assert!(outcome.read);
    assert_eq!(outcome.completion.newly_completed, vec![1]);
    assert_eq!(outcome.celebrations[0].book_name.as_deref(), Some("Genesis"));
    assert!(session.store().is_book_completed(1));

    let raw = session
        .store()
        .storage()
        .raw(KEY_READ_CHAPTERS)
        .await
        .unwrap()
        .unwrap();
    let marks: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(marks["1-1"], json!(true));
}

#[tokio::test]
async fn test_note_from_selection_persists_range_and_category() {
    let mut session = fresh_session().await;
    session.load_books().await;
    session.open_chapter(1, 1);
    session.chapter_settled().await;

    assert!(session.store().annotations().has_category("Study"));

    let selection = Selection::Text {
        start: SelectionPoint::marked(40, 2),
        end: SelectionPoint::marked(0, 1),
    };
    let draft = session
        .draft_note(&selection, Anchor { x: 10.0, y: 20.0 })
        .unwrap();
    assert_eq!(draft.quoted_text, "AKJV 1:1:1 AKJV 1:1:2");

    let note = session.save_note(&draft, "Study", None).await.unwrap();
    assert_eq!(note.book_name, "Genesis");

    let raw = session
        .store()
        .storage()
        .raw(KEY_NOTES)
        .await
        .unwrap()
        .unwrap();
    let notes: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(notes[0]["verse"], json!(1));
    assert_eq!(notes[0]["verseEnd"], json!(2));
    assert_eq!(notes[0]["category"], json!("Study"));
    assert!(notes[0].get("userNote").is_none());
}

#[tokio::test]
async fn test_newer_chapter_supersedes_slow_one() {
    let mut session = fresh_session().await;

    session.open_chapter(43, 1);
    session.open_chapter(43, 2);

    let verses = match session.chapter_settled().await {
        FetchState::Loaded(verses) => verses,
        other => panic!("unexpected state: {:?}", other),
    };
    assert_eq!(verses[0].text, "AKJV 43:2:1");

    // Give the slow request time to finish; it must not overwrite chapter 2
    tokio::time::sleep(Duration::from_millis(400)).await;
    let current = session.chapter_state();
    assert_eq!(current.loaded().unwrap()[0].text, "AKJV 43:2:1");
    assert_eq!(session.current_chapter(), Some((43, 2)));
}

#[tokio::test]
async fn test_search_resolves_references() {
    let mut session = fresh_session().await;
    session.load_books().await;
    let client = session.client().clone();
    let books = session.store().books().to_vec();

    match search::search(&client, &books, "John 3:4-2").await.unwrap() {
        SearchOutcome::Verses { book, range, verses, .. } => {
            assert_eq!(book.name, "John");
            assert_eq!((range.start, range.end), (2, 4));
            assert_eq!(verses.len(), 3);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    match search::search(&client, &books, "1 jo 2").await.unwrap() {
        SearchOutcome::Chapter { book, chapter, verses } => {
            assert_eq!(book.id, 62);
            assert_eq!(chapter, 2);
            assert_eq!(verses.len(), VERSES_PER_CHAPTER as usize);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    assert!(matches!(
        search::search(&client, &books, "John 9").await.unwrap(),
        SearchOutcome::Message { .. }
    ));
    assert!(matches!(
        search::search(&client, &books, "John 3:40").await.unwrap(),
        SearchOutcome::Message { .. }
    ));
}

#[tokio::test]
async fn test_deep_link_switches_translation_and_layout() {
    let mut session = fresh_session().await;

    let position = ReadingPosition::parse("/verse/john/3/3?verse=2&translation=KJV").unwrap();
    let book = session.apply_link(&position).await.unwrap().unwrap();

    assert_eq!(book.name, "John");
    assert_eq!(session.client().translation(), "KJV");
    assert_eq!(session.store().preferences().translation, "KJV");
    assert_eq!(
        session.store().preferences().translation_title,
        "King James Version"
    );
    assert_eq!(session.store().preferences().display_mode, DisplayMode::Book);
    assert_eq!(session.store().chapter_count(43), Some(3));

    let state = session.chapter_settled().await;
    assert_eq!(state.loaded().unwrap()[1].text, "KJV 43:3:2");
}

#[tokio::test]
async fn test_link_preview_uses_verse_text() {
    let session = fresh_session().await;
    let position = ReadingPosition::new("john", 3).with_verse(2);

    let preview = position
        .preview(session.client(), "https://beta.inhispath.com")
        .await
        .unwrap();

    assert_eq!(preview.title, "John 3:2 (AKJV) | In His Path");
    assert_eq!(preview.description, "AKJV 43:3:2");
    assert_eq!(
        preview.url,
        "https://beta.inhispath.com/verse/john/3/1?verse=2&translation=AKJV"
    );
}

/// Parse and run one command line, as the binary does
async fn run(state: &mut AppState, line: &str) -> Result<Value, AppError> {
    let argv = std::iter::once("pathreader").chain(line.split_whitespace());
    let cli = Cli::try_parse_from(argv).unwrap();
    commands::run(state, cli.command).await
}

#[tokio::test]
async fn test_state_persists_across_restarts() {
    let temp_dir = TempDir::new().unwrap();
    let config = fake_config().await;

    {
        let mut state = app::setup(temp_dir.path().to_path_buf(), config.clone())
            .await
            .unwrap();

        let marked = run(&mut state, "mark Obadiah 1").await.unwrap();
        assert_eq!(marked["read"], json!(true));
        assert_eq!(marked["bookCompleted"], json!(true));

        let note = run(&mut state, "note John 3 2-3 Prayer for the family")
            .await
            .unwrap();
        assert_eq!(note["verse"], json!(2));
        assert_eq!(note["userNote"], json!("for the family"));

        run(&mut state, "add-category Family").await.unwrap();
        run(&mut state, "highlight Genesis 1 3").await.unwrap();
        run(&mut state, "delete-category Prayer").await.unwrap();
    }

    let mut state = app::setup(temp_dir.path().to_path_buf(), config).await.unwrap();
    let store = state.session.store();

    assert!(store.is_chapter_read(31, 1));
    assert_eq!(store.completed_books().get(&31), Some(&true));
    assert_eq!(
        store.annotations().categories(),
        &["General", "Study", "Question", "Insight", "Family"]
    );
    assert_eq!(store.annotations().notes()[0].category, "General");
    assert_eq!(store.annotations().highlights().len(), 1);

    let notes = run(&mut state, "notes General John").await.unwrap();
    assert_eq!(notes.as_array().unwrap().len(), 1);

    let progress = run(&mut state, "progress").await.unwrap();
    assert_eq!(progress["testaments"][0]["booksComplete"], json!(1));
}

#[tokio::test]
async fn test_out_of_range_mark_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let mut state = app::setup(temp_dir.path().to_path_buf(), fake_config().await)
        .await
        .unwrap();

    assert!(run(&mut state, "mark John 4").await.is_err());
    assert!(run(&mut state, "mark Hezekiah 1").await.is_err());
    assert!(state.session.store().read_chapters().is_empty());
}

#[tokio::test]
async fn test_note_range_past_chapter_end_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let mut state = app::setup(temp_dir.path().to_path_buf(), fake_config().await)
        .await
        .unwrap();

    assert!(run(&mut state, "note John 3 2-99 Study").await.is_err());
    assert!(run(&mut state, "note John 3 9 Study").await.is_err());
    assert!(state.session.store().annotations().notes().is_empty());

    let note = run(&mut state, "note John 3 4-5 Study").await.unwrap();
    assert_eq!(note["verse"], json!(4));
    assert_eq!(note["verseEnd"], json!(5));
}

#[tokio::test]
async fn test_read_chapter_lists_its_notes() {
    let temp_dir = TempDir::new().unwrap();
    let mut state = app::setup(temp_dir.path().to_path_buf(), fake_config().await)
        .await
        .unwrap();

    run(&mut state, "note John 3 4 Study later").await.unwrap();
    run(&mut state, "note John 3 1-2 Prayer first").await.unwrap();
    run(&mut state, "note John 2 1 Study elsewhere").await.unwrap();

    let chapter = run(&mut state, "read John 3").await.unwrap();
    let notes = chapter["notes"].as_array().unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0]["userNote"], json!("first"));
    assert_eq!(notes[1]["userNote"], json!("later"));
    assert_eq!(chapter["verses"].as_array().unwrap().len(), VERSES_PER_CHAPTER as usize);
}
