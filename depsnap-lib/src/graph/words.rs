use crate::Result;
use camino::Utf8Path;
use ohno::{EnrichableExt, IntoAppError, bail};
use rand::Rng;
use std::fs;

pub(super) const LOG_TARGET: &str = "     words";

/// An immutable vocabulary used to synthesize names, paths and identifiers.
///
/// Loaded once before generation starts and only read afterwards.
#[derive(Debug, Clone)]
pub struct WordSource {
    words: Box<[String]>,
}

impl WordSource {
    /// Load a newline-separated word list, skipping blank lines
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = fs::read_to_string(path).into_app_err_with(|| format!("reading word list '{path}'"))?;
        let source = Self::from_words(text.lines()).map_err(|e| e.enrich_with(|| format!("loading word list '{path}'")))?;

        log::debug!(target: LOG_TARGET, "Loaded {} words from '{path}'", source.len());
        Ok(source)
    }

    pub fn from_words<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: Box<[String]> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();

        if words.is_empty() {
            bail!("word list is empty");
        }

        Ok(Self { words })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Pick a word uniformly at random
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        &self.words[rng.random_range(0..self.words.len())]
    }
}
