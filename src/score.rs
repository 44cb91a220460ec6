//! Ranking candidates by the entropy of the feedback they would produce.

use float_ord::FloatOrd;
use fxhash::FxHashMap as HashMap;
use serde::{Deserialize, Serialize};
use std::cmp;

use crate::pattern::{Bucket, Pattern, Word};
use crate::{ensure_len, Result};

/// A candidate guess and the information it is expected to reveal, in bits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scored {
    pub word: Word,
    pub entropy: f64,
}

/// Candidates ordered by descending entropy; ties keep dictionary order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreTable {
    ranked: Vec<Scored>,
}

impl ScoreTable {
    pub(crate) fn from_ranked(ranked: Vec<Scored>) -> Self {
        Self { ranked }
    }

    pub fn ranked(&self) -> &[Scored] {
        &self.ranked
    }

    pub fn best(&self) -> Option<&Scored> {
        self.ranked.first()
    }

    pub fn entropy(&self, word: &Word) -> Option<f64> {
        self.ranked
            .iter()
            .find(|s| s.word == *word)
            .map(|s| s.entropy)
    }

    pub fn words(&self) -> impl Iterator<Item = &Word> {
        self.ranked.iter().map(|s| &s.word)
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    pub fn into_vec(self) -> Vec<Scored> {
        self.ranked
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Tally {
    buckets: HashMap<Bucket, u32>,
    counts: Vec<u32>,
}

impl Tally {
    pub(crate) fn entropy_of(&mut self, source: &Word, candidates: &[Word]) -> f64 {
        self.buckets.clear();
        for target in candidates {
            let bucket = Pattern::compute_with(source.letters(), target.letters()).into_bucket();
            *self.buckets.entry(bucket).or_insert(0) += 1;
        }
        // Summing in a fixed order keeps results bit-identical across runs.
        self.counts.clear();
        self.counts.extend(self.buckets.values().copied());
        self.counts.sort_unstable();
        let n = candidates.len() as f64;
        self.counts
            .iter()
            .map(|&count| {
                let p = count as f64 / n;
                p * f64::log2(1.0 / p)
            })
            .sum()
    }
}

pub(crate) fn uniform_len(candidates: &[Word]) -> Result<Option<usize>> {
    let len = match candidates.first() {
        Some(first) => first.len(),
        None => return Ok(None),
    };
    for candidate in candidates {
        ensure_len(len, candidate.len())?;
    }
    Ok(Some(len))
}

/// Inserts `scored` after every entry with an equal or higher entropy.
pub(crate) fn insert_ranked(ranked: &mut Vec<Scored>, scored: Scored) {
    let at = ranked.partition_point(|s| s.entropy >= scored.entropy);
    ranked.insert(at, scored);
}

/// Entropy, in bits, of the feedback `source` would receive across
/// `candidates` taken as equally likely secrets.
pub fn entropy_of(source: &Word, candidates: &[Word]) -> Result<f64> {
    for candidate in candidates {
        ensure_len(source.len(), candidate.len())?;
    }
    if candidates.is_empty() {
        return Ok(0.0);
    }
    Ok(Tally::default().entropy_of(source, candidates))
}

/// `O(n² · L)`; see [`crate::chunked`] for running it in slices.
pub fn score(candidates: &[Word]) -> Result<ScoreTable> {
    uniform_len(candidates)?;
    let mut tally = Tally::default();
    let mut ranked: Vec<Scored> = candidates
        .iter()
        .map(|source| Scored {
            word: source.clone(),
            entropy: tally.entropy_of(source, candidates),
        })
        .collect();
    ranked.sort_by_key(|s| cmp::Reverse(FloatOrd(s.entropy)));
    Ok(ScoreTable::from_ranked(ranked))
}
