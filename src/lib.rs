//! Feedback derivation, candidate elimination and entropy ranking for
//! Wordle-like word games.
//!
//! The engine consumes an already curated word list and produces plain
//! data: feedback patterns, narrowed candidate lists and candidates ranked
//! by the expected information a guess would reveal.

#[cfg(not(target_arch = "wasm32"))]
use lazy_static::lazy_static;
#[cfg(not(target_arch = "wasm32"))]
use std::time;
use thiserror::Error;

pub mod cache;
pub mod chunked;
pub mod filter;
pub mod pattern;
pub mod score;
pub mod session;

#[cfg(target_arch = "wasm32")]
mod js;

pub use cache::{CacheKey, ScoreCache};
pub use chunked::{ChunkConfig, Progress, RunId, Scheduler, ScoringRun, Step};
pub use filter::{narrow, narrow_all, Attempt, History};
pub use pattern::{derive_feedback, is_consistent, is_consistent_direct, Feedback, Letter, Pattern, Word};
pub use score::{entropy_of, score, ScoreTable, Scored};
pub use session::{Dictionary, Session};

/// Malformed queries. An empty candidate set is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("length mismatch: expected {expected} letters, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("feedback code {0} is not one of 0 (absent), 1 (misplaced), 2 (exact)")]
    InvalidFeedbackCode(u32),

    #[error("invalid feedback character {0:?}, expected a digit 0, 1 or 2")]
    InvalidFeedbackChar(char),

    #[error("invalid letter: {0:?}")]
    InvalidLetter(char),

    #[error("words must have at least one letter")]
    EmptyWord,

    #[error("word {word} does not belong to dictionary slice {key}")]
    CacheKeyMismatch { key: String, word: String },

    #[error("cannot parse cache key {0:?}, expected e.g. \"A-6\"")]
    UnknownKey(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) fn ensure_len(expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(Error::LengthMismatch { expected, found });
    }
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
lazy_static! {
    static ref REFERENCE_INSTANT: time::Instant = time::Instant::now();
}

#[cfg(not(target_arch = "wasm32"))]
pub fn now() -> f64 {
    let reference = *REFERENCE_INSTANT; // This must run first!
    time::Instant::now().duration_since(reference).as_secs_f64()
}

#[cfg(target_arch = "wasm32")]
pub fn now() -> f64 {
    js::now() / 1e3
}

pub fn render_duration_secs(secs: f64) -> String {
    if !secs.is_finite() {
        "??".to_string()
    } else if secs >= 86400.0 {
        format!("{:.0}d", secs / 86400.0)
    } else if secs >= 3600.0 {
        format!("{:.0}h", secs / 3600.0)
    } else if secs >= 60.0 {
        format!("{:.0}min", secs / 60.0)
    } else if secs >= 1.0 {
        format!("{:.0}s", secs)
    } else {
        format!("{:.0}ms", secs * 1e3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        for (secs, rendered) in [
            (f64::NAN, "??"),
            (f64::INFINITY, "??"),
            (0.25, "250ms"),
            (12.0, "12s"),
            (150.0, "2min"),
            (7200.0, "2h"),
            (172800.0, "2d"),
        ] {
            assert_eq!(render_duration_secs(secs), rendered, "{}", secs);
        }
    }

    #[test]
    fn clock_is_monotonic() {
        let a = now();
        let b = now();
        assert!(b >= a);
    }

    #[test]
    fn length_check() {
        assert_eq!(ensure_len(5, 5), Ok(()));
        assert_eq!(
            ensure_len(5, 6),
            Err(Error::LengthMismatch {
                expected: 5,
                found: 6
            })
        );
    }
}
