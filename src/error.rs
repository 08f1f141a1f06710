//! Error taxonomy shared by the resolver, the text provider and the renderer.
//!
//! Lookup errors are recoverable at the render boundary: the orchestration in
//! [`crate::app`] turns them into a fallback book or a placeholder verse.
//! Infrastructure failures (files, JSON, PNG) travel as `anyhow::Error`.

use std::fmt;

/// Errors raised while turning the clock into a rendered verse
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerseError {
    /// The book name is not part of the active catalog
    UnknownBook(String),
    /// The catalog has no chapters (or no verses) for the book
    EmptyCatalog(String),
    /// The provider has no text for the reference in that translation
    NotFound(String),
    /// Transient failure talking to the verse provider
    NetworkError(String),
    /// A style or device setting is outside its accepted values
    InvalidStyle(String),
    /// Hour or minute outside the clock range
    InvalidTime { hour: u32, minute: u32 },
    /// Text that is not an `HH:MM` time
    UnreadableTime(String),
    /// Translation code not in the supported set
    UnknownTranslation(String),
}

impl VerseError {
    /// Errors worth retrying as-is
    pub fn is_transient(&self) -> bool {
        matches!(self, VerseError::NetworkError(_))
    }
}

impl fmt::Display for VerseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerseError::UnknownBook(book) => write!(f, "unknown book '{}'", book),
            VerseError::EmptyCatalog(book) => write!(f, "catalog has no chapters for '{}'", book),
            VerseError::NotFound(what) => write!(f, "no verse text for {}", what),
            VerseError::NetworkError(msg) => write!(f, "network error: {}", msg),
            VerseError::InvalidStyle(msg) => write!(f, "invalid style: {}", msg),
            VerseError::InvalidTime { hour, minute } => {
                write!(f, "invalid clock time {:02}:{:02}", hour, minute)
            }
            VerseError::UnreadableTime(text) => write!(f, "'{}' is not an HH:MM time", text),
            VerseError::UnknownTranslation(code) => write!(f, "unknown translation '{}'", code),
        }
    }
}

impl std::error::Error for VerseError {}
