//! Bible verse clock for e-ink displays.
//!
//! The hour picks the chapter and the minute picks the verse: at 03:16 the
//! display shows John 3:16 (or another book with a third chapter). Verse text
//! comes from the bolls.life API and is cached on disk, optionally downloaded in
//! bulk for offline use, and drawn into a PNG frame for the panel.

pub mod app;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod download;
pub mod error;
pub mod provider;
pub mod render;
pub mod resolver;
pub mod style;
pub mod translation;

pub use error::VerseError;
pub use resolver::{resolve, Reference, TimeSample};
pub use translation::Translation;
