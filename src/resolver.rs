//! Time to verse resolution.
//!
//! The hour picks the chapter and the minute picks the verse. Clock values do not
//! line up with real chapter and verse ranges, so both are normalized:
//!
//! - hour: the 24-hour clock shows hour 0 as 24, the 12-hour clock shows 0 as 12;
//!   the result wraps into the book as `((h - 1) mod chapter_count) + 1`.
//! - minute: minute 0 shows verse 1, otherwise minute `m` shows verse `m`,
//!   clamped to the last verse of the chapter.
//!
//! Everything here is a pure function of its inputs.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::{Book, BookCatalog};
use crate::error::VerseError;

/// How the display reads the hour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockConvention {
    #[default]
    #[serde(rename = "24h")]
    TwentyFourHour,
    #[serde(rename = "12h")]
    TwelveHour,
}

impl ClockConvention {
    /// Hour as shown on the clock face, never zero
    pub const fn display_hour(self, hour: u32) -> u32 {
        match self {
            ClockConvention::TwentyFourHour => {
                if hour == 0 {
                    24
                } else {
                    hour
                }
            }
            ClockConvention::TwelveHour => {
                let h = hour % 12;
                if h == 0 {
                    12
                } else {
                    h
                }
            }
        }
    }
}

/// Validated wall clock reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSample {
    hour: u32,
    minute: u32,
    convention: ClockConvention,
}

impl TimeSample {
    /// `hour` is always given on the 24-hour scale (0..=23)
    pub fn new(hour: u32, minute: u32, convention: ClockConvention) -> Result<Self, VerseError> {
        if hour > 23 || minute > 59 {
            return Err(VerseError::InvalidTime { hour, minute });
        }
        Ok(Self {
            hour,
            minute,
            convention,
        })
    }

    pub const fn hour(&self) -> u32 {
        self.hour
    }

    pub const fn minute(&self) -> u32 {
        self.minute
    }

    pub const fn convention(&self) -> ClockConvention {
        self.convention
    }

    /// Chapter the clock points at before fitting it into a book
    pub const fn raw_chapter(&self) -> u16 {
        self.convention.display_hour(self.hour) as u16
    }

    /// Verse the clock points at before clamping it into a chapter
    pub const fn raw_verse(&self) -> u16 {
        if self.minute == 0 {
            1
        } else {
            self.minute as u16
        }
    }
}

/// A single verse: book, chapter, verse
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference {
    pub book: String,
    pub book_id: u8,
    pub chapter: u16,
    pub verse: u16,
}

impl Reference {
    /// Cache key, `{book_id}_{chapter}_{verse}`
    pub fn cache_key(&self) -> String {
        format!("{}_{}_{}", self.book_id, self.chapter, self.verse)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.book, self.chapter, self.verse)
    }
}

/// Map a clock reading to a verse of `book` that exists in `catalog`
pub fn resolve(time: TimeSample, book: &str, catalog: &BookCatalog) -> Result<Reference, VerseError> {
    let book = catalog.get(book)?;
    resolve_in(time, book)
}

/// Same as [`resolve`] for an already looked up book
pub fn resolve_in(time: TimeSample, book: &Book) -> Result<Reference, VerseError> {
    let chapter_count = book.chapter_count();
    if chapter_count == 0 {
        return Err(VerseError::EmptyCatalog(book.name.clone()));
    }

    let chapter = (time.raw_chapter() - 1) % chapter_count + 1;
    let verse_count = book
        .verse_count(chapter)
        .filter(|&count| count > 0)
        .ok_or_else(|| VerseError::EmptyCatalog(format!("{} {}", book.name, chapter)))?;
    let verse = time.raw_verse().min(verse_count);

    Ok(Reference {
        book: book.name.clone(),
        book_id: book.id,
        chapter,
        verse,
    })
}

/// Book that follows `current` in `order`, wrapping after the last one
pub fn next_rotation_book<'a, S: AsRef<str>>(
    current: &str,
    order: &'a [S],
) -> Result<&'a str, VerseError> {
    let wanted = current.trim();
    let position = order
        .iter()
        .position(|name| name.as_ref().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| VerseError::UnknownBook(wanted.to_string()))?;
    Ok(order[(position + 1) % order.len()].as_ref())
}

/// How the book is chosen for a render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookSelection {
    /// Any book that has the clock's chapter, varied by day and hour
    Matching,
    /// Always the same book, the chapter wraps when the book is short
    Fixed(String),
    /// A book that advances once per day through `order`, the whole canon
    /// when `order` is empty
    Rotate { current: String, order: Vec<String> },
}

impl BookSelection {
    /// Every book the selection can show on some day, in order
    ///
    /// `Matching` answers with the whole catalog. Rotation entries the catalog
    /// does not know are left out.
    pub fn reachable_books<'a>(&self, catalog: &'a BookCatalog) -> Result<Vec<&'a Book>, VerseError> {
        match self {
            BookSelection::Matching => Ok(catalog.books().iter().collect()),
            BookSelection::Fixed(name) => Ok(vec![catalog.get(name)?]),
            BookSelection::Rotate { current, order } => {
                let mut books: Vec<&Book> = if order.is_empty() {
                    catalog.books().iter().collect()
                } else {
                    order.iter().filter_map(|name| catalog.get(name).ok()).collect()
                };
                if let Ok(today) = catalog.get(current) {
                    if !books.iter().any(|b| b.id == today.id) {
                        books.insert(0, today);
                    }
                }
                if books.is_empty() {
                    return Err(VerseError::UnknownBook(current.trim().to_string()));
                }
                Ok(books)
            }
        }
    }
}

/// Books to try, in order, for one render
pub fn candidate_books<'a>(
    selection: &BookSelection,
    time: TimeSample,
    seed: u32,
    catalog: &'a BookCatalog,
) -> Result<Vec<&'a Book>, VerseError> {
    match selection {
        BookSelection::Fixed(name) | BookSelection::Rotate { current: name, .. } => {
            Ok(vec![catalog.get(name)?])
        }
        BookSelection::Matching => {
            let matching: Vec<&Book> = catalog.books_with_chapter(time.raw_chapter()).collect();
            if matching.is_empty() {
                return Ok(Vec::new());
            }
            let start = (seed as usize) % matching.len();
            Ok(matching[start..]
                .iter()
                .chain(matching[..start].iter())
                .copied()
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32) -> TimeSample {
        TimeSample::new(hour, minute, ClockConvention::TwentyFourHour).unwrap()
    }

    fn small_catalog() -> BookCatalog {
        BookCatalog::new(vec![
            Book::new("John", 43, {
                let mut verses = vec![51, 25, 35];
                verses.extend(std::iter::repeat(30).take(18));
                verses
            }),
            Book::new("Obadiah", 31, vec![21]),
            Book::new("Unit", 99, vec![1, 1]),
            Book::new("Empty", 100, vec![]),
            Book::new("Hollow", 101, vec![0]),
        ])
    }

    #[test]
    fn john_three_sixteen() {
        let reference = resolve(at(3, 16), "John", &small_catalog()).unwrap();
        assert_eq!(reference.to_string(), "John 3:16");
        assert_eq!(reference.book_id, 43);
    }

    #[test]
    fn chapter_stays_in_range_for_every_hour() {
        let catalog = BookCatalog::builtin();
        for book in catalog.books() {
            for hour in 0..24 {
                let r = resolve_in(at(hour, 30), book).unwrap();
                assert!(r.chapter >= 1 && r.chapter <= book.chapter_count(), "{}", r);
            }
        }
    }

    #[test]
    fn verse_stays_in_range_for_every_minute() {
        let catalog = BookCatalog::builtin();
        let john = catalog.get("John").unwrap();
        for minute in 0..60 {
            let r = resolve_in(at(3, minute), john).unwrap();
            assert!(r.verse >= 1 && r.verse <= 36, "{}", r);
        }
    }

    #[test]
    fn minute_zero_is_verse_one_and_late_minutes_clamp() {
        let catalog = small_catalog();
        assert_eq!(resolve(at(2, 0), "John", &catalog).unwrap().verse, 1);
        assert_eq!(resolve(at(2, 24), "John", &catalog).unwrap().verse, 24);
        assert_eq!(resolve(at(2, 25), "John", &catalog).unwrap().verse, 25);
        assert_eq!(resolve(at(2, 59), "John", &catalog).unwrap().verse, 25);
    }

    #[test]
    fn midnight_is_hour_twenty_four() {
        let catalog = BookCatalog::builtin();
        let r = resolve(at(0, 5), "Luke", &catalog).unwrap();
        assert_eq!((r.chapter, r.verse), (24, 5));
        // John has 21 chapters: 24 wraps to 3
        let r = resolve(at(0, 5), "John", &catalog).unwrap();
        assert_eq!(r.chapter, 3);
    }

    #[test]
    fn twelve_hour_convention_wraps_afternoon() {
        let catalog = BookCatalog::builtin();
        let afternoon = TimeSample::new(15, 16, ClockConvention::TwelveHour).unwrap();
        assert_eq!(resolve(afternoon, "John", &catalog).unwrap().to_string(), "John 3:16");
        let noon = TimeSample::new(12, 1, ClockConvention::TwelveHour).unwrap();
        assert_eq!(resolve(noon, "John", &catalog).unwrap().chapter, 12);
        let midnight = TimeSample::new(0, 1, ClockConvention::TwelveHour).unwrap();
        assert_eq!(resolve(midnight, "John", &catalog).unwrap().chapter, 12);
    }

    #[test]
    fn single_chapter_and_single_verse_books() {
        let catalog = small_catalog();
        for hour in 0..24 {
            assert_eq!(resolve(at(hour, 10), "Obadiah", &catalog).unwrap().chapter, 1);
            let r = resolve(at(hour, 59), "Unit", &catalog).unwrap();
            assert_eq!(r.verse, 1);
        }
    }

    #[test]
    fn resolution_is_deterministic() {
        let catalog = BookCatalog::builtin();
        let first = resolve(at(17, 42), "Isaiah", &catalog).unwrap();
        let second = resolve(at(17, 42), "Isaiah", &catalog).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn errors_for_unknown_and_empty_books() {
        let catalog = small_catalog();
        assert_eq!(
            resolve(at(3, 16), "Hezekiah", &catalog),
            Err(VerseError::UnknownBook("Hezekiah".into()))
        );
        assert_eq!(
            resolve(at(3, 16), "Empty", &catalog),
            Err(VerseError::EmptyCatalog("Empty".into()))
        );
        assert!(matches!(
            resolve(at(3, 16), "Hollow", &catalog),
            Err(VerseError::EmptyCatalog(_))
        ));
    }

    #[test]
    fn out_of_range_time_is_rejected() {
        assert_eq!(
            TimeSample::new(25, 0, ClockConvention::TwentyFourHour),
            Err(VerseError::InvalidTime { hour: 25, minute: 0 })
        );
        assert!(TimeSample::new(23, 60, ClockConvention::TwelveHour).is_err());
    }

    #[test]
    fn rotation_wraps_to_first_book() {
        let order = ["Ruth", "Esther", "Jonah"];
        assert_eq!(next_rotation_book("Ruth", &order), Ok("Esther"));
        assert_eq!(next_rotation_book("jonah", &order), Ok("Ruth"));
        assert_eq!(
            next_rotation_book("Job", &order),
            Err(VerseError::UnknownBook("Job".into()))
        );
    }

    #[test]
    fn matching_candidates_all_have_the_chapter() {
        let catalog = BookCatalog::builtin();
        let time = at(23, 1);
        let books = candidate_books(&BookSelection::Matching, time, 7, &catalog).unwrap();
        assert!(!books.is_empty());
        assert!(books.iter().all(|b| b.chapter_count() >= 23));
        let other = candidate_books(&BookSelection::Matching, time, 8, &catalog).unwrap();
        assert_ne!(books[0].name, other[0].name);
        assert_eq!(books.len(), other.len());
    }

    #[test]
    fn rotation_reaches_every_listed_book() {
        let catalog = BookCatalog::builtin();
        let selection = BookSelection::Rotate {
            current: "Ruth".into(),
            order: vec!["Esther".into(), "Tobit".into(), "jonah".into()],
        };
        let names: Vec<&str> = selection
            .reachable_books(&catalog)
            .unwrap()
            .iter()
            .map(|b| b.name.as_str())
            .collect();
        assert_eq!(names, ["Ruth", "Esther", "Jonah"]);

        let everything = BookSelection::Rotate {
            current: "Ruth".into(),
            order: Vec::new(),
        };
        assert_eq!(everything.reachable_books(&catalog).unwrap().len(), 66);
    }

    #[test]
    fn fixed_selection_checks_the_book() {
        let catalog = BookCatalog::builtin();
        let books =
            candidate_books(&BookSelection::Fixed("ruth".into()), at(9, 9), 0, &catalog).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].name, "Ruth");
        let rotate = BookSelection::Rotate {
            current: "Nope".into(),
            order: Vec::new(),
        };
        assert!(candidate_books(&rotate, at(9, 9), 0, &catalog).is_err());
    }
}
