//! Book catalogs: chapter and verse counts per book, one table per translation.
//!
//! The built-in table follows the standard English versification. A translation
//! whose versification differs can be overridden with a JSON file named after
//! its code (`KJV.json`, `NIV.json`, ...) inside the configured catalog directory:
//!
//! ```json
//! { "books": [ { "name": "John", "id": 43, "verses": [51, 25, 36] } ] }
//! ```
//!
//! Catalogs are loaded once at startup and never mutated afterwards.

mod canon;

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::VerseError;
use crate::translation::Translation;

/// One book of the canon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    /// Display name, e.g. "Psalm" or "1 Corinthians"
    pub name: String,
    /// Book number used by the verse provider (Genesis = 1)
    pub id: u8,
    verses: Vec<u16>,
}

impl Book {
    pub fn new(name: impl Into<String>, id: u8, verses: Vec<u16>) -> Self {
        Self {
            name: name.into(),
            id,
            verses,
        }
    }

    pub fn chapter_count(&self) -> u16 {
        self.verses.len() as u16
    }

    /// Verse count of a 1-based chapter
    pub fn verse_count(&self, chapter: u16) -> Option<u16> {
        let index = usize::from(chapter).checked_sub(1)?;
        self.verses.get(index).copied()
    }

    pub fn verses_per_chapter(&self) -> &[u16] {
        &self.verses
    }
}

/// Static table of books for one translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookCatalog {
    books: Vec<Book>,
}

#[derive(Deserialize)]
struct CatalogFile {
    books: Vec<CatalogFileBook>,
}

#[derive(Deserialize)]
struct CatalogFileBook {
    name: String,
    #[serde(default)]
    id: Option<u8>,
    verses: Vec<u16>,
}

impl BookCatalog {
    pub fn new(books: Vec<Book>) -> Self {
        Self { books }
    }

    /// The 66 book canon with standard English verse counts
    pub fn builtin() -> Self {
        let books = canon::CANON
            .iter()
            .enumerate()
            .map(|(index, (name, verses))| Book::new(*name, index as u8 + 1, verses.to_vec()))
            .collect();
        Self { books }
    }

    /// Parse a catalog document; books without an `id` are numbered by position
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let file: CatalogFile =
            serde_json::from_reader(reader).context("Catalog is not valid JSON")?;
        let books = file
            .books
            .into_iter()
            .enumerate()
            .map(|(index, book)| {
                let id = match book.id {
                    Some(id) => id,
                    None => u8::try_from(index + 1).map_err(|_| {
                        anyhow!("Book {} '{}' needs an explicit id", index + 1, book.name)
                    })?,
                };
                Ok(Book::new(book.name, id, book.verses))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { books })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open catalog {}", path.display()))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to read catalog {}", path.display()))
    }

    /// Look a book up by name, ignoring case and surrounding whitespace
    pub fn get(&self, name: &str) -> Result<&Book, VerseError> {
        let wanted = name.trim();
        self.books
            .iter()
            .find(|book| book.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| VerseError::UnknownBook(wanted.to_string()))
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.books.iter().map(|book| book.name.as_str())
    }

    /// Books that actually have the given chapter
    pub fn books_with_chapter(&self, chapter: u16) -> impl Iterator<Item = &Book> {
        self.books
            .iter()
            .filter(move |book| book.chapter_count() >= chapter)
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

/// Catalog per translation, built-in table unless overridden on disk
#[derive(Debug, Clone)]
pub struct Catalogs {
    standard: BookCatalog,
    overrides: HashMap<Translation, BookCatalog>,
}

impl Catalogs {
    pub fn builtin() -> Self {
        Self {
            standard: BookCatalog::builtin(),
            overrides: HashMap::new(),
        }
    }

    /// Load `<dir>/<CODE>.json` overrides for each translation that has one
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let mut catalogs = Self::builtin();
        let Some(dir) = dir else {
            return Ok(catalogs);
        };

        for translation in Translation::ALL {
            let path = dir.join(format!("{}.json", translation.code()));
            if !path.exists() {
                continue;
            }
            let catalog = BookCatalog::load(&path)?;
            if catalog.is_empty() {
                warn!("Catalog {} has no books, keeping the built-in table", path.display());
                continue;
            }
            info!(
                "Loaded {} catalog with {} books from {}",
                translation,
                catalog.books().len(),
                path.display()
            );
            catalogs.insert(translation, catalog);
        }

        Ok(catalogs)
    }

    pub fn insert(&mut self, translation: Translation, catalog: BookCatalog) {
        self.overrides.insert(translation, catalog);
    }

    pub fn for_translation(&self, translation: Translation) -> &BookCatalog {
        self.overrides.get(&translation).unwrap_or(&self.standard)
    }
}

impl Default for Catalogs {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_canon_is_complete() {
        let catalog = BookCatalog::builtin();
        assert_eq!(catalog.books().len(), 66);

        let chapters: usize = catalog
            .books()
            .iter()
            .map(|b| usize::from(b.chapter_count()))
            .sum();
        assert_eq!(chapters, 1189);

        let verses: u32 = catalog
            .books()
            .iter()
            .flat_map(|b| b.verses_per_chapter())
            .map(|&v| u32::from(v))
            .sum();
        assert_eq!(verses, 31102);
    }

    #[test]
    fn provider_ids_follow_canonical_order() {
        let catalog = BookCatalog::builtin();
        assert_eq!(catalog.get("Genesis").unwrap().id, 1);
        assert_eq!(catalog.get("John").unwrap().id, 43);
        assert_eq!(catalog.get("Revelation").unwrap().id, 66);
    }

    #[test]
    fn lookup_ignores_case_and_padding() {
        let catalog = BookCatalog::builtin();
        let book = catalog.get("  song of solomon ").unwrap();
        assert_eq!(book.name, "Song of Solomon");
        assert_eq!(book.chapter_count(), 8);
        assert_eq!(
            catalog.get("Hezekiah"),
            Err(VerseError::UnknownBook("Hezekiah".into()))
        );
    }

    #[test]
    fn verse_counts_are_one_based() {
        let catalog = BookCatalog::builtin();
        let john = catalog.get("John").unwrap();
        assert_eq!(john.verse_count(3), Some(36));
        assert_eq!(john.verse_count(0), None);
        assert_eq!(john.verse_count(22), None);
        assert_eq!(catalog.get("Psalm").unwrap().verse_count(119), Some(176));
    }

    #[test]
    fn books_with_chapter_filters_short_books() {
        let catalog = BookCatalog::builtin();
        let names: Vec<&str> = catalog.books_with_chapter(51).map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Psalm", "Isaiah", "Jeremiah"]);
        assert_eq!(catalog.books_with_chapter(1).count(), 66);
    }

    #[test]
    fn parses_catalog_document() {
        let json = r#"{"books":[
            {"name":"John","id":43,"verses":[51,25,35]},
            {"name":"Jude","verses":[25]}
        ]}"#;
        let catalog = BookCatalog::from_reader(json.as_bytes()).unwrap();
        assert_eq!(catalog.get("john").unwrap().verse_count(3), Some(35));
        assert_eq!(catalog.get("Jude").unwrap().id, 2);
    }

    #[test]
    fn positional_ids_stop_at_255_books() {
        let books: Vec<String> = (1..=256)
            .map(|n| format!(r#"{{"name":"Book {}","verses":[1]}}"#, n))
            .collect();
        let json = format!(r#"{{"books":[{}]}}"#, books.join(","));
        let err = BookCatalog::from_reader(json.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Book 256"), "{}", err);

        let mut books = books;
        books[255] = r#"{"name":"Book 256","id":7,"verses":[1]}"#.to_string();
        let json = format!(r#"{{"books":[{}]}}"#, books.join(","));
        let catalog = BookCatalog::from_reader(json.as_bytes()).unwrap();
        assert_eq!(catalog.get("Book 255").unwrap().id, 255);
        assert_eq!(catalog.get("Book 256").unwrap().id, 7);
    }

    #[test]
    fn override_applies_to_one_translation_only() {
        let mut catalogs = Catalogs::builtin();
        catalogs.insert(
            Translation::Kjv,
            BookCatalog::new(vec![Book::new("Jude", 65, vec![25])]),
        );
        assert_eq!(catalogs.for_translation(Translation::Kjv).books().len(), 1);
        assert_eq!(catalogs.for_translation(Translation::Esv).books().len(), 66);
    }
}
