//! The candidate lifecycle of one game: from a dictionary slice to a
//! narrowed, ranked candidate set.

use fxhash::FxHashMap as HashMap;
use log::debug;
use std::sync::Arc;

use crate::cache::{CacheKey, ScoreCache};
use crate::chunked::{Scheduler, ScoringRun};
use crate::filter::{narrow, Attempt, History};
use crate::pattern::{Pattern, Word};
use crate::score::{score, ScoreTable};
use crate::{ensure_len, Result};

/// A curated word list with relative frequencies, in insertion order.
#[derive(Clone, Debug, Default)]
pub struct Dictionary {
    words: Vec<Word>,
    frequencies: HashMap<Word, f64>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a word. A repeated word keeps its first position and takes the
    /// new frequency.
    pub fn insert(&mut self, word: Word, frequency: f64) {
        if self.frequencies.insert(word.clone(), frequency).is_none() {
            self.words.push(word);
        }
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn frequency(&self, word: &Word) -> Option<f64> {
        self.frequencies.get(word).copied()
    }

    pub fn contains(&self, word: &Word) -> bool {
        self.frequencies.contains_key(word)
    }

    pub fn slice(&self, key: &CacheKey) -> Vec<Word> {
        self.words
            .iter()
            .filter(|word| key.admits(word))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl FromIterator<(Word, f64)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (Word, f64)>>(iter: T) -> Self {
        let mut dictionary = Self::new();
        for (word, frequency) in iter {
            dictionary.insert(word, frequency);
        }
        dictionary
    }
}

#[derive(Clone, Debug)]
pub struct Session {
    key: CacheKey,
    base: Vec<Word>,
    history: History,
    candidates: Vec<Word>,
}

impl Session {
    pub fn new(dictionary: &Dictionary, key: CacheKey) -> Self {
        let base = dictionary.slice(&key);
        debug!("session {}: {} candidates", key, base.len());
        Self {
            key,
            candidates: base.clone(),
            base,
            history: History::new(),
        }
    }

    pub fn for_secret(dictionary: &Dictionary, secret: &Word) -> Self {
        Self::new(dictionary, CacheKey::of(secret))
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn candidates(&self) -> &[Word] {
        &self.candidates
    }

    pub fn is_solved(&self) -> bool {
        self.history.is_solved()
    }

    pub fn record(&mut self, guess: Word, pattern: Pattern) -> Result<&[Word]> {
        ensure_len(self.key.len(), guess.len())?;
        let attempt = Attempt::new(guess, pattern)?;
        self.apply(attempt)
    }

    pub fn observe(&mut self, guess: Word, secret: &Word) -> Result<Pattern> {
        ensure_len(self.key.len(), guess.len())?;
        let attempt = Attempt::observe(guess, secret)?;
        let pattern = attempt.pattern().clone();
        self.apply(attempt)?;
        Ok(pattern)
    }

    fn apply(&mut self, attempt: Attempt) -> Result<&[Word]> {
        let narrowed = narrow(attempt.guess(), attempt.pattern(), &self.candidates)?;
        self.history.push(attempt)?;
        self.candidates = narrowed;
        Ok(&self.candidates)
    }

    /// Ranked suggestions for the current candidates. The shared cache is
    /// consulted only while no feedback has been recorded.
    pub fn suggest(&self, cache: &ScoreCache) -> Result<Arc<ScoreTable>> {
        if self.history.is_empty() {
            cache.get_or_compute(&self.key, &self.base)
        } else {
            Ok(Arc::new(score(&self.candidates)?))
        }
    }

    pub fn begin_scoring(&self, scheduler: &mut Scheduler) -> Result<ScoringRun> {
        scheduler.start(self.candidates.clone())
    }
}
