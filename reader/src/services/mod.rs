//! Services module
//!
//! Reading-state logic that sits between the commands and storage:
//! - `progress`: read marks and book completion
//! - `annotations`: notes, note categories and highlights
//! - `reading_state`: the persisted store that owns all of the above
//! - `selection`: verse range selection over a rendered chapter
//! - `search`: reference search with a debounced runner
//! - `deep_link`: reading positions in URLs
//! - `session`: one reader window tying client and store together

pub mod annotations;
pub mod deep_link;
pub mod progress;
pub mod reading_state;
pub mod search;
pub mod selection;
pub mod session;

pub use annotations::{Annotations, NewNote, NoteFilter};
pub use deep_link::{LinkPreview, ReadingPosition};
pub use reading_state::{BookCompleted, MarkOutcome, Preferences, ReadingStateStore};
pub use search::{SearchDebouncer, SearchOutcome, SearchQuery};
pub use selection::{Anchor, NoteDraft, Selection, SelectionPoint, VerseIndex};
pub use session::ReaderSession;
