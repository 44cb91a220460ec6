//! Letters, words and the feedback a guess receives against a secret.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use static_assertions::const_assert;
use std::convert::TryFrom;
use std::{fmt, str};

use crate::{ensure_len, Error, Result};

const INLINE_LETTERS: usize = 12;

/// Longest pattern whose base-3 code fits in a `u64`.
pub const MAX_CODED_LEN: usize = 40;

const_assert!(u128::pow(3, MAX_CODED_LEN as u32) <= u64::MAX as u128);

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Letter(char);

impl Letter {
    /// Placeholder for a secret letter already claimed by a mark. Never
    /// equal to a valid letter.
    const CONSUMED: Self = Letter('\0');

    pub fn as_char(self) -> char {
        self.0
    }
}

impl TryFrom<char> for Letter {
    type Error = Error;
    fn try_from(c: char) -> Result<Self> {
        if !c.is_alphabetic() {
            return Err(Error::InvalidLetter(c));
        }
        let mut upper = c.to_uppercase();
        match (upper.next(), upper.next()) {
            (Some(u), None) => Ok(Letter(u)),
            _ => Err(Error::InvalidLetter(c)),
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Word(SmallVec<[Letter; INLINE_LETTERS]>);

impl Word {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false: empty words are rejected on construction.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn letters(&self) -> &[Letter] {
        &self.0
    }

    pub fn first(&self) -> Letter {
        self.0[0]
    }
}

impl str::FromStr for Word {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let letters = s
            .trim()
            .chars()
            .map(Letter::try_from)
            .collect::<Result<SmallVec<_>>>()?;
        if letters.is_empty() {
            return Err(Error::EmptyWord);
        }
        Ok(Word(letters))
    }
}

impl TryFrom<&str> for Word {
    type Error = Error;
    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}

impl TryFrom<String> for Word {
    type Error = Error;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Word> for String {
    fn from(word: Word) -> Self {
        word.to_string()
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for letter in &self.0 {
            write!(f, "{}", letter)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Word({:?})", self.to_string())
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Feedback {
    Absent = 0,
    Misplaced = 1,
    Exact = 2,
}

impl Feedback {
    const COUNT: u64 = 3;

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Feedback {
    type Error = Error;
    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Feedback::Absent),
            1 => Ok(Feedback::Misplaced),
            2 => Ok(Feedback::Exact),
            _ => Err(Error::InvalidFeedbackCode(code.into())),
        }
    }
}

impl From<Feedback> for u8 {
    fn from(feedback: Feedback) -> Self {
        feedback.code()
    }
}

#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern(SmallVec<[Feedback; INLINE_LETTERS]>);

/// Key used to tally patterns: the base-3 code when it fits, otherwise the
/// pattern itself.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub(crate) enum Bucket {
    Code(u64),
    Wide(Pattern),
}

impl Pattern {
    pub fn all_exact(len: usize) -> Self {
        Pattern(SmallVec::from_elem(Feedback::Exact, len))
    }

    pub fn from_codes(codes: &[u32]) -> Result<Self> {
        codes
            .iter()
            .map(|&code| {
                u8::try_from(code)
                    .map_err(|_| Error::InvalidFeedbackCode(code))
                    .and_then(Feedback::try_from)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn feedback(&self) -> &[Feedback] {
        &self.0
    }

    pub fn is_win(&self) -> bool {
        self.0.iter().all(|&f| f == Feedback::Exact)
    }

    /// Base-3 code with position 0 as the most significant digit, or `None`
    /// for patterns longer than [`MAX_CODED_LEN`].
    pub fn code(&self) -> Option<u64> {
        if self.0.len() > MAX_CODED_LEN {
            return None;
        }
        Some(
            self.0
                .iter()
                .fold(0, |acc, &f| acc * Feedback::COUNT + f.code() as u64),
        )
    }

    pub(crate) fn into_bucket(self) -> Bucket {
        match self.code() {
            Some(code) => Bucket::Code(code),
            None => Bucket::Wide(self),
        }
    }

    pub(crate) fn compute_with(guess: &[Letter], secret: &[Letter]) -> Self {
        debug_assert_eq!(guess.len(), secret.len());
        let mut secret: SmallVec<[Letter; INLINE_LETTERS]> = SmallVec::from_slice(secret);
        let mut marks: SmallVec<[Feedback; INLINE_LETTERS]> =
            SmallVec::from_elem(Feedback::Absent, guess.len());
        for ((mark, &guess_letter), secret_letter) in
            marks.iter_mut().zip(guess).zip(secret.iter_mut())
        {
            if guess_letter == *secret_letter {
                *mark = Feedback::Exact;
                *secret_letter = Letter::CONSUMED;
            }
        }
        for (mark, &guess_letter) in marks.iter_mut().zip(guess) {
            if *mark == Feedback::Absent {
                if let Some(secret_letter) = secret.iter_mut().find(|s| **s == guess_letter) {
                    *mark = Feedback::Misplaced;
                    *secret_letter = Letter::CONSUMED;
                }
            }
        }
        Pattern(marks)
    }
}

impl FromIterator<Feedback> for Pattern {
    fn from_iter<T: IntoIterator<Item = Feedback>>(iter: T) -> Self {
        Pattern(iter.into_iter().collect())
    }
}

impl str::FromStr for Pattern {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .chars()
            .map(|c| {
                let digit = c
                    .to_digit(10)
                    .ok_or(Error::InvalidFeedbackChar(c))?;
                let digit = u8::try_from(digit).map_err(|_| Error::InvalidFeedbackCode(digit))?;
                Feedback::try_from(digit)
            })
            .collect()
    }
}

impl TryFrom<String> for Pattern {
    type Error = Error;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.to_string()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for feedback in &self.0 {
            write!(f, "{}", feedback.code())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pattern({:?})", self.to_string())
    }
}

/// Exact matches are reserved first; remaining copies of a letter then go to
/// the left-most unresolved occurrences in the guess.
pub fn derive_feedback(guess: &Word, secret: &Word) -> Result<Pattern> {
    ensure_len(guess.len(), secret.len())?;
    Ok(Pattern::compute_with(guess.letters(), secret.letters()))
}

/// Whether `guess` would have received exactly `pattern` had `candidate`
/// been the secret.
pub fn is_consistent(guess: &Word, candidate: &Word, pattern: &Pattern) -> Result<bool> {
    ensure_len(guess.len(), candidate.len())?;
    ensure_len(guess.len(), pattern.len())?;
    Ok(Pattern::compute_with(guess.letters(), candidate.letters()) == *pattern)
}

/// Same answer as [`is_consistent`] without building a pattern.
///
/// Exact must appear exactly where guess and candidate agree. Every other
/// occurrence of a letter in the guess is Misplaced while unclaimed copies
/// of it remain in the candidate, left to right, and Absent afterwards.
pub fn is_consistent_direct(guess: &Word, candidate: &Word, pattern: &Pattern) -> Result<bool> {
    ensure_len(guess.len(), candidate.len())?;
    ensure_len(guess.len(), pattern.len())?;
    let positions = guess
        .letters()
        .iter()
        .zip(candidate.letters())
        .zip(pattern.feedback());
    let mut unclaimed: SmallVec<[(Letter, usize); INLINE_LETTERS]> = SmallVec::new();
    for ((&guess_letter, &candidate_letter), &feedback) in positions.clone() {
        let exact = guess_letter == candidate_letter;
        if exact != (feedback == Feedback::Exact) {
            return Ok(false);
        }
        if !exact {
            match unclaimed.iter_mut().find(|(l, _)| *l == candidate_letter) {
                Some((_, count)) => *count += 1,
                None => unclaimed.push((candidate_letter, 1)),
            }
        }
    }
    for ((&guess_letter, _), &feedback) in positions {
        let left = unclaimed
            .iter_mut()
            .find(|(l, _)| *l == guess_letter)
            .map(|(_, count)| count);
        match (feedback, left) {
            (Feedback::Exact, _) => {}
            (Feedback::Misplaced, Some(count)) if *count > 0 => *count -= 1,
            (Feedback::Absent, None) => {}
            (Feedback::Absent, Some(count)) if *count == 0 => {}
            _ => return Ok(false),
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(s: &str) -> Word {
        s.parse().unwrap()
    }

    fn pattern(s: &str) -> Pattern {
        s.parse().unwrap()
    }

    #[test]
    fn pattern_string() {
        for p in ["22222", "20220", "02022", "12010", "11210", "00000", "1"] {
            assert_eq!(format!("{}", pattern(p)), p);
        }
    }

    #[test]
    fn pattern_rejects_bad_codes() {
        assert_eq!("20312".parse::<Pattern>(), Err(Error::InvalidFeedbackCode(3)));
        assert_eq!("2x".parse::<Pattern>(), Err(Error::InvalidFeedbackChar('x')));
        assert_eq!("20-1".parse::<Pattern>(), Err(Error::InvalidFeedbackChar('-')));
        let message = "1x".parse::<Pattern>().unwrap_err().to_string();
        assert!(message.contains("'x'"), "{}", message);
        assert_eq!(
            Pattern::from_codes(&[0, 1, 7]),
            Err(Error::InvalidFeedbackCode(7))
        );
        assert_eq!(Pattern::from_codes(&[2, 0, 1]), Ok(pattern("201")));
    }

    #[test]
    fn words_are_normalized() {
        assert_eq!(word("crane"), word("CRANE"));
        assert_eq!(word("ÉcLaT").to_string(), "ÉCLAT");
        assert_eq!("".parse::<Word>(), Err(Error::EmptyWord));
        assert_eq!("ab-c".parse::<Word>(), Err(Error::InvalidLetter('-')));
        assert_eq!("a1".parse::<Word>(), Err(Error::InvalidLetter('1')));
    }

    #[test]
    fn feedback_compute() {
        for (guess, secret, expected) in [
            ("abcde", "abcde", "22222"),
            ("apcdq", "abcde", "20220"),
            ("pbqde", "abcde", "02022"),
            ("bbbde", "abcbd", "12010"),
            ("bbcdc", "adcbb", "11210"),
            ("pqrst", "abcbd", "00000"),
            ("speed", "erase", "10110"),
            ("level", "elves", "11220"),
            ("speed", "creep", "01220"),
            ("geese", "creep", "01200"),
        ] {
            assert_eq!(
                derive_feedback(&word(guess), &word(secret)),
                Ok(pattern(expected)),
                "{} {}",
                guess,
                secret,
            );
        }
    }

    #[test]
    fn marks_never_exceed_secret_copies() {
        // Three Es in the guess, two in the secret.
        let guess = word("speed");
        let secret = word("erase");
        let p = derive_feedback(&guess, &secret).unwrap();
        let marked_e = guess
            .letters()
            .iter()
            .zip(p.feedback())
            .filter(|(l, f)| l.as_char() == 'E' && **f != Feedback::Absent)
            .count();
        assert_eq!(marked_e, 2);
    }

    #[test]
    fn leftmost_duplicate_wins() {
        assert_eq!(
            derive_feedback(&word("aax"), &word("bca")),
            Ok(pattern("100"))
        );
    }

    #[test]
    fn length_mismatch_is_reported() {
        assert_eq!(
            derive_feedback(&word("abc"), &word("abcd")),
            Err(Error::LengthMismatch {
                expected: 3,
                found: 4
            })
        );
        assert_eq!(
            is_consistent(&word("abc"), &word("abc"), &pattern("22")),
            Err(Error::LengthMismatch {
                expected: 3,
                found: 2
            })
        );
        assert!(is_consistent_direct(&word("abc"), &word("ab"), &pattern("222")).is_err());
    }

    #[test]
    fn consistency() {
        for (guess, candidate, p, expected) in [
            ("crane", "crane", "22222", true),
            ("crane", "crate", "22202", true),
            ("crane", "crate", "22222", false),
            ("speed", "erase", "10110", true),
            ("speed", "erase", "10111", false),
            // Counts alone would accept these.
            ("aax", "bca", "010", false),
            ("aa", "ab", "01", false),
            ("aax", "bca", "100", true),
        ] {
            let (g, c, p) = (word(guess), word(candidate), pattern(p));
            assert_eq!(is_consistent(&g, &c, &p), Ok(expected), "{} {} {}", guess, candidate, p);
            assert_eq!(
                is_consistent_direct(&g, &c, &p),
                Ok(expected),
                "direct {} {} {}",
                guess,
                candidate,
                p
            );
        }
    }

    #[test]
    fn codes() {
        assert_eq!(pattern("20012").code(), Some(2 * 81 + 3 + 2));
        assert_eq!(pattern("00000").code(), Some(0));
        assert_eq!(Pattern::all_exact(5).code(), Some(242));
        assert!(Pattern::all_exact(5).is_win());
        assert_eq!(Pattern::all_exact(MAX_CODED_LEN + 1).code(), None);
        assert_eq!(
            Pattern::all_exact(MAX_CODED_LEN).code(),
            Some(u64::pow(3, MAX_CODED_LEN as u32) - 1)
        );
    }
}
