//! Application configuration constants
//!
//! Central location for defaults, storage keys and validation boundaries
//! used throughout the reader, plus the environment-driven API settings.

use std::path::PathBuf;
use std::time::Duration;

// ===== Remote Text API =====

/// Base URL used when `PATHREADER_API_BASE_URL` is not set
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Public site used when building shareable links
pub const DEFAULT_SITE_URL: &str = "https://beta.inhispath.com";

/// Translation opened when nothing is selected yet
pub const DEFAULT_TRANSLATION: &str = "AKJV";

/// Per-request timeout in seconds.
/// The API serves small JSON documents; anything slower is treated as a failure.
pub const REQUEST_TIMEOUT_SECS: u64 = 15;

/// User agent sent with every API request
pub const USER_AGENT: &str = concat!("pathreader/", env!("CARGO_PKG_VERSION"));

// ===== Environment Variables =====

pub const ENV_API_BASE_URL: &str = "PATHREADER_API_BASE_URL";
pub const ENV_SITE_URL: &str = "PATHREADER_SITE_URL";
pub const ENV_DATA_DIR: &str = "PATHREADER_DATA_DIR";

// ===== Local Storage Keys =====

pub const KEY_READ_CHAPTERS: &str = "readChapters";
pub const KEY_COMPLETED_BOOKS: &str = "completedBooks";
pub const KEY_NOTES: &str = "notes";
pub const KEY_NOTE_CATEGORIES: &str = "noteCategories";
pub const KEY_HIGHLIGHTS: &str = "highlights";
pub const KEY_SELECTED_TRANSLATION: &str = "selectedTranslation";
pub const KEY_SELECTED_TRANSLATION_SHORT: &str = "selectedTranslationShort";
pub const KEY_DISPLAY_MODE: &str = "displayMode";

// ===== Notes =====

/// Protected category: never renamed or deleted, receives orphaned notes
pub const GENERAL_CATEGORY: &str = "General";

/// Categories that are always available, in display order
pub const DEFAULT_CATEGORIES: &[&str] = &["General", "Prayer", "Study", "Question", "Insight"];

// ===== Canon =====

/// Last book id of the Old Testament (Genesis = 1 .. Malachi = 39)
pub const LAST_OLD_TESTAMENT_BOOK: u32 = 39;

/// Last book id of the New Testament (Matthew = 40 .. Revelation = 66)
pub const LAST_NEW_TESTAMENT_BOOK: u32 = 66;

// ===== Search =====

/// Delay before a typed search query is sent
pub const SEARCH_DEBOUNCE_MS: u64 = 300;

/// Maximum accepted search query length in characters
pub const MAX_SEARCH_QUERY_LENGTH: usize = 100;

/// File name of the local database inside the data directory
pub const DATABASE_FILE: &str = "reader.db";

/// Settings for talking to the text API and building links
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub site_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl ApiConfig {
    /// Build from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(ENV_API_BASE_URL) {
            if !url.trim().is_empty() {
                config.base_url = url.trim().trim_end_matches('/').to_string();
            }
        }

        if let Ok(url) = std::env::var(ENV_SITE_URL) {
            if !url.trim().is_empty() {
                config.site_url = url.trim().trim_end_matches('/').to_string();
            }
        }

        config
    }

    /// Point the client at a different API root (used by tests and the CLI)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Resolve the data directory: `PATHREADER_DATA_DIR`, else `./.pathreader`
pub fn data_dir_from_env() -> PathBuf {
    std::env::var(ENV_DATA_DIR)
        .ok()
        .filter(|dir| !dir.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".pathreader"))
}
