//! Verse text lookup: on-disk cache in front of the remote provider.

pub mod bolls;
pub mod cache;
pub mod text;

use log::{debug, warn};

use crate::error::VerseError;
use crate::resolver::Reference;
use crate::translation::Translation;

pub use bolls::BollsClient;
pub use cache::VerseCache;

/// Source of verse text for a resolved reference
pub trait VerseTextProvider {
    /// Fails with `NotFound` when the provider has no text, `NetworkError` on
    /// transient failures
    fn fetch(&mut self, reference: &Reference, translation: Translation)
        -> Result<String, VerseError>;
}

impl<P: VerseTextProvider + ?Sized> VerseTextProvider for Box<P> {
    fn fetch(
        &mut self,
        reference: &Reference,
        translation: Translation,
    ) -> Result<String, VerseError> {
        (**self).fetch(reference, translation)
    }
}

/// Cache first, remote second; remote hits are written back to the cache
pub struct CachedProvider<P> {
    cache: VerseCache,
    remote: P,
}

impl<P: VerseTextProvider> CachedProvider<P> {
    pub fn new(cache: VerseCache, remote: P) -> Self {
        Self { cache, remote }
    }

    pub fn cache(&self) -> &VerseCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut VerseCache {
        &mut self.cache
    }

    pub fn into_parts(self) -> (VerseCache, P) {
        (self.cache, self.remote)
    }
}

impl<P: VerseTextProvider> VerseTextProvider for CachedProvider<P> {
    fn fetch(
        &mut self,
        reference: &Reference,
        translation: Translation,
    ) -> Result<String, VerseError> {
        if let Some(text) = self.cache.get(translation, reference) {
            debug!("Cache hit for {} ({})", reference, translation);
            return Ok(text);
        }

        let text = self.remote.fetch(reference, translation)?;
        if let Err(e) = self.cache.store(translation, reference, &text) {
            warn!("Could not cache {} ({}): {:#}", reference, translation, e);
        }
        Ok(text)
    }
}
