//! Offline verse storage, one JSON file per translation.
//!
//! Files are keyed `"{book_id}_{chapter}_{verse}"`. Every write reloads the file,
//! merges and rewrites it, so concurrent writers lose at most their own entries
//! (last write wins). Unreadable files are logged and treated as empty.

use anyhow::{Context, Result};
use log::{debug, error};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::resolver::Reference;
use crate::translation::Translation;

pub type CacheEntries = BTreeMap<String, String>;

#[derive(Debug, Clone)]
pub struct VerseCache {
    dir: PathBuf,
}

impl VerseCache {
    /// Open (and create) the cache directory
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file(&self, translation: Translation) -> PathBuf {
        self.dir.join(format!("{}.json", translation.code()))
    }

    /// Everything cached for a translation
    pub fn load(&self, translation: Translation) -> CacheEntries {
        let path = self.file(translation);
        if !path.exists() {
            return CacheEntries::new();
        }
        match fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|text| serde_json::from_str(&text).map_err(anyhow::Error::from))
        {
            Ok(entries) => entries,
            Err(e) => {
                error!("Error loading cache for {}: {:#}", translation, e);
                CacheEntries::new()
            }
        }
    }

    pub fn get(&self, translation: Translation, reference: &Reference) -> Option<String> {
        self.load(translation)
            .remove(&reference.cache_key())
            .filter(|text| !text.is_empty())
    }

    pub fn contains(&self, translation: Translation, reference: &Reference) -> bool {
        self.get(translation, reference).is_some()
    }

    pub fn store(&self, translation: Translation, reference: &Reference, text: &str) -> Result<()> {
        self.store_many(
            translation,
            std::iter::once((reference.cache_key(), text.to_string())),
        )
    }

    /// Merge a batch of `(key, text)` entries into the translation's file
    pub fn store_many(
        &self,
        translation: Translation,
        entries: impl IntoIterator<Item = (String, String)>,
    ) -> Result<()> {
        let mut cached = self.load(translation);
        let before = cached.len();
        cached.extend(entries);

        let path = self.file(translation);
        let staging = path.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(&cached)?;
        fs::write(&staging, text)
            .with_context(|| format!("Error saving cache for {}", translation))?;
        fs::rename(&staging, &path)
            .with_context(|| format!("Error replacing cache file {}", path.display()))?;
        debug!(
            "Saved cache for {} ({} new, {} total)",
            translation,
            cached.len() - before,
            cached.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn reference(book_id: u8, chapter: u16, verse: u16) -> Reference {
        Reference {
            book: "Test".into(),
            book_id,
            chapter,
            verse,
        }
    }

    fn scratch() -> (TempDir, VerseCache) {
        let dir = tempdir().unwrap();
        let cache = VerseCache::new(dir.path()).unwrap();
        (dir, cache)
    }

    #[test]
    fn stores_under_book_chapter_verse_key() {
        let (_dir, cache) = scratch();
        cache.store(Translation::Kjv, &reference(43, 3, 16), "For God so loved").unwrap();

        let entries = cache.load(Translation::Kjv);
        assert_eq!(entries.get("43_3_16").map(String::as_str), Some("For God so loved"));
        assert!(cache.get(Translation::Esv, &reference(43, 3, 16)).is_none());
        assert!(cache.file(Translation::Kjv).ends_with("KJV.json"));
    }

    #[test]
    fn later_write_wins_and_earlier_entries_survive() {
        let (_dir, cache) = scratch();
        cache.store(Translation::Nlt, &reference(1, 1, 1), "first").unwrap();
        cache.store(Translation::Nlt, &reference(1, 1, 2), "second").unwrap();
        cache.store(Translation::Nlt, &reference(1, 1, 1), "replaced").unwrap();

        assert_eq!(cache.get(Translation::Nlt, &reference(1, 1, 1)).as_deref(), Some("replaced"));
        assert_eq!(cache.get(Translation::Nlt, &reference(1, 1, 2)).as_deref(), Some("second"));
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let (_dir, cache) = scratch();
        fs::write(cache.file(Translation::Csb), "{ not json").unwrap();
        assert!(cache.load(Translation::Csb).is_empty());
        cache.store(Translation::Csb, &reference(2, 3, 4), "text").unwrap();
        assert!(cache.contains(Translation::Csb, &reference(2, 3, 4)));
    }
}
