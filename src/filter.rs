//! Eliminating candidates that contradict observed feedback.

use log::debug;

use crate::pattern::{derive_feedback, is_consistent, Pattern, Word};
use crate::{ensure_len, Result};

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Attempt {
    guess: Word,
    pattern: Pattern,
}

impl Attempt {
    pub fn new(guess: Word, pattern: Pattern) -> Result<Self> {
        ensure_len(guess.len(), pattern.len())?;
        Ok(Self { guess, pattern })
    }

    pub fn observe(guess: Word, secret: &Word) -> Result<Self> {
        let pattern = derive_feedback(&guess, secret)?;
        Ok(Self { guess, pattern })
    }

    pub fn guess(&self) -> &Word {
        &self.guess
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn admits(&self, candidate: &Word) -> Result<bool> {
        is_consistent(&self.guess, candidate, &self.pattern)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct History {
    attempts: Vec<Attempt>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an attempt. All attempts of a game share one word length.
    pub fn push(&mut self, attempt: Attempt) -> Result<()> {
        if let Some(first) = self.attempts.first() {
            ensure_len(first.guess.len(), attempt.guess.len())?;
        }
        self.attempts.push(attempt);
        Ok(())
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn last(&self) -> Option<&Attempt> {
        self.attempts.last()
    }

    pub fn is_solved(&self) -> bool {
        matches!(self.last(), Some(attempt) if attempt.pattern.is_win())
    }
}

/// Keeps the candidates that could have produced `pattern` for `guess`, in
/// order. The result may be empty.
pub fn narrow(guess: &Word, pattern: &Pattern, candidates: &[Word]) -> Result<Vec<Word>> {
    ensure_len(guess.len(), pattern.len())?;
    let mut kept = Vec::default();
    for candidate in candidates {
        if is_consistent(guess, candidate, pattern)? {
            kept.push(candidate.clone());
        }
    }
    debug!(
        "narrowed {} -> {} candidates with {} {}",
        candidates.len(),
        kept.len(),
        guess,
        pattern
    );
    Ok(kept)
}

pub fn narrow_all(history: &History, candidates: &[Word]) -> Result<Vec<Word>> {
    let mut remaining = candidates.to_vec();
    for attempt in history.attempts() {
        remaining = narrow(&attempt.guess, &attempt.pattern, &remaining)?;
    }
    Ok(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn words(list: &[&str]) -> Vec<Word> {
        list.iter().map(|w| w.parse().unwrap()).collect()
    }

    #[test]
    fn narrow_preserves_order() {
        let candidates = words(&["crate", "trace", "crane", "caret", "react"]);
        let guess: Word = "crane".parse().unwrap();
        let pattern: Pattern = "22202".parse().unwrap();
        assert_eq!(
            narrow(&guess, &pattern, &candidates),
            Ok(words(&["crate"]))
        );
        let pattern: Pattern = "21101".parse().unwrap();
        assert_eq!(
            narrow(&guess, &pattern, &candidates),
            Ok(words(&["caret"]))
        );
    }

    #[test]
    fn contradictory_feedback_empties_the_set() {
        let candidates = words(&["crate", "trace"]);
        let guess: Word = "crane".parse().unwrap();
        let pattern: Pattern = "00000".parse().unwrap();
        assert_eq!(narrow(&guess, &pattern, &candidates), Ok(vec![]));
    }

    #[test]
    fn malformed_queries_fail() {
        let candidates = words(&["crate", "tracer"]);
        let guess: Word = "crane".parse().unwrap();
        let short: Pattern = "2220".parse().unwrap();
        assert!(matches!(
            narrow(&guess, &short, &candidates),
            Err(Error::LengthMismatch { .. })
        ));
        let pattern: Pattern = "22202".parse().unwrap();
        assert_eq!(
            narrow(&guess, &pattern, &candidates),
            Err(Error::LengthMismatch {
                expected: 5,
                found: 6
            })
        );
    }

    #[test]
    fn history_applies_every_attempt() {
        let candidates = words(&["crate", "trace", "crane", "caret", "react", "cater"]);
        let secret: Word = "cater".parse().unwrap();
        let mut history = History::new();
        for guess in ["trace", "caret"] {
            let attempt = Attempt::observe(guess.parse().unwrap(), &secret).unwrap();
            assert!(attempt.admits(&secret).unwrap());
            history.push(attempt).unwrap();
        }
        assert!(!history.is_solved());
        let remaining = narrow_all(&history, &candidates).unwrap();
        assert!(remaining.contains(&secret));
        assert_eq!(remaining, words(&["cater"]));

        history
            .push(Attempt::observe(secret.clone(), &secret).unwrap())
            .unwrap();
        assert!(history.is_solved());
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn history_rejects_mixed_lengths() {
        let mut history = History::new();
        history
            .push(Attempt::new("crane".parse().unwrap(), "00000".parse().unwrap()).unwrap())
            .unwrap();
        let longer = Attempt::new("cranes".parse().unwrap(), "000000".parse().unwrap()).unwrap();
        assert!(history.push(longer).is_err());
        assert!(Attempt::new("crane".parse().unwrap(), "000".parse().unwrap()).is_err());
    }
}
