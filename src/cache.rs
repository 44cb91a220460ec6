//! Memoized score tables for unconstrained dictionary slices.

use fxhash::FxHashMap as HashMap;
use log::{debug, info};
use std::convert::TryFrom;
use std::sync::{Arc, Mutex, PoisonError};
use std::{fmt, str};

use crate::pattern::{Letter, Word};
use crate::score::{score, ScoreTable};
use crate::{Error, Result};

/// Every word with this first letter and length. Renders as `"A-6"`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CacheKey {
    first: Letter,
    len: usize,
}

impl CacheKey {
    pub fn new(first: Letter, len: usize) -> Self {
        Self { first, len }
    }

    pub fn of(word: &Word) -> Self {
        Self::new(word.first(), word.len())
    }

    pub fn first(&self) -> Letter {
        self.first
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn admits(&self, word: &Word) -> bool {
        word.len() == self.len && word.first() == self.first
    }

    pub fn covers(&self, words: &[Word]) -> bool {
        !words.is_empty() && words.iter().all(|w| self.admits(w))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.len)
    }
}

impl str::FromStr for CacheKey {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let unknown = || Error::UnknownKey(s.to_string());
        let (letter, len) = s.trim().split_once('-').ok_or_else(unknown)?;
        let mut chars = letter.chars();
        let first = match (chars.next(), chars.next()) {
            (Some(c), None) => Letter::try_from(c).map_err(|_| unknown())?,
            _ => return Err(unknown()),
        };
        let len: usize = len.parse().map_err(|_| unknown())?;
        if len == 0 {
            return Err(unknown());
        }
        Ok(Self::new(first, len))
    }
}

/// Opener tables by dictionary slice. Only valid before any feedback has
/// narrowed the set. The first table stored for a key wins.
#[derive(Debug, Default)]
pub struct ScoreCache {
    tables: Mutex<HashMap<CacheKey, Arc<ScoreTable>>>,
}

impl ScoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Arc<ScoreTable>>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<ScoreTable>> {
        self.tables().get(key).cloned()
    }

    /// Stores a precomputed table, replacing any previous one.
    pub fn insert(&self, key: CacheKey, table: ScoreTable) -> Arc<ScoreTable> {
        let table = Arc::new(table);
        self.tables().insert(key, table.clone());
        table
    }

    /// `candidates` must be the whole slice `key` names. Empty slices are
    /// scored but never stored.
    pub fn get_or_compute(&self, key: &CacheKey, candidates: &[Word]) -> Result<Arc<ScoreTable>> {
        if let Some(word) = candidates.iter().find(|w| !key.admits(w)) {
            return Err(Error::CacheKeyMismatch {
                key: key.to_string(),
                word: word.to_string(),
            });
        }
        if candidates.is_empty() {
            debug!("not caching an empty table for {}", key);
            return Ok(Arc::new(ScoreTable::default()));
        }
        if let Some(table) = self.get(key) {
            debug!("score cache hit for {}", key);
            return Ok(table);
        }
        info!("scoring {} candidates for {}", candidates.len(), key);
        let table = Arc::new(score(candidates)?);
        Ok(self.tables().entry(*key).or_insert(table).clone())
    }

    pub fn len(&self) -> usize {
        self.tables().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables().is_empty()
    }

    pub fn clear(&self) {
        self.tables().clear();
    }
}
