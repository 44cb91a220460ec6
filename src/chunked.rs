//! Scoring in bounded time slices so a host thread stays responsive.
//!
//! A [`ScoringRun`] is a resumable state object: each call to
//! [`ScoringRun::step`] scores sources until the slice budget is spent, then
//! returns so the host can yield (timer, task queue, or plain loop) before
//! resuming. The ordering after the last slice is identical to
//! [`crate::score`] whatever the budget, because every source is scored by
//! the same routine and inserted after existing entries of equal entropy.

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::{fmt, thread, time};

use crate::pattern::Word;
use crate::score::{insert_ranked, uniform_len, ScoreTable, Scored, Tally};
use crate::{now, render_duration_secs, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    pub slice_ms: u64,
    pub chunk_threshold: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            slice_ms: 300,
            chunk_threshold: 200,
        }
    }
}

impl ChunkConfig {
    pub fn slice_budget(&self) -> time::Duration {
        time::Duration::from_millis(self.slice_ms)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct RunId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
    pub elapsed: f64,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }

    pub fn remaining_secs(&self) -> f64 {
        let fraction = self.fraction();
        self.elapsed * (1.0 - fraction) / fraction
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}/{} | {} elapsed | {} left",
            self.processed,
            self.total,
            render_duration_secs(self.elapsed),
            render_duration_secs(self.remaining_secs()),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Step {
    Continue(Progress),
    Done(Progress),
}

impl Step {
    pub fn progress(&self) -> Progress {
        match *self {
            Step::Continue(progress) | Step::Done(progress) => progress,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Step::Done(_))
    }
}

pub type ProgressSink<'a> = dyn FnMut(RunId, Progress) + 'a;

pub type PartialSink<'a> = dyn FnMut(RunId, &[Scored]) + 'a;

/// One resumable pass of the entropy scorer over a fixed candidate set.
#[derive(Clone, Debug)]
pub struct ScoringRun {
    id: RunId,
    candidates: Vec<Word>,
    next: usize,
    ranked: Vec<Scored>,
    tally: Tally,
    t_start: f64,
}

impl ScoringRun {
    fn new(id: RunId, candidates: Vec<Word>) -> Result<Self> {
        uniform_len(&candidates)?;
        debug!("run {:?}: scoring {} candidates", id, candidates.len());
        Ok(Self {
            id,
            ranked: Vec::with_capacity(candidates.len()),
            candidates,
            next: 0,
            tally: Tally::default(),
            t_start: now(),
        })
    }

    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn candidates(&self) -> &[Word] {
        &self.candidates
    }

    pub fn is_done(&self) -> bool {
        self.next >= self.candidates.len()
    }

    pub fn progress(&self) -> Progress {
        Progress {
            processed: self.next,
            total: self.candidates.len(),
            elapsed: now() - self.t_start,
        }
    }

    pub fn partial(&self) -> &[Scored] {
        &self.ranked
    }

    /// Scores sources until `budget` is spent or none remain. At least one
    /// source is scored per call, so any budget makes progress.
    pub fn step(&mut self, budget: time::Duration) -> Step {
        let t0 = now();
        let budget = budget.as_secs_f64();
        while let Some(source) = self.candidates.get(self.next) {
            let entropy = self.tally.entropy_of(source, &self.candidates);
            insert_ranked(
                &mut self.ranked,
                Scored {
                    word: source.clone(),
                    entropy,
                },
            );
            self.next += 1;
            if now() - t0 >= budget {
                break;
            }
        }
        let progress = self.progress();
        trace!("run {:?}: {}", self.id, progress);
        if self.is_done() {
            debug!(
                "run {:?}: done in {}",
                self.id,
                render_duration_secs(progress.elapsed)
            );
            Step::Done(progress)
        } else {
            Step::Continue(progress)
        }
    }

    pub fn advance(
        &mut self,
        budget: time::Duration,
        on_progress: &mut ProgressSink,
        on_partial: &mut PartialSink,
    ) -> Step {
        let step = self.step(budget);
        on_progress(self.id, step.progress());
        on_partial(self.id, &self.ranked);
        step
    }

    pub fn finish(mut self) -> ScoreTable {
        while !self.step(time::Duration::MAX).is_done() {}
        ScoreTable::from_ranked(self.ranked)
    }
}

/// Output tagged with a superseded run id is discarded.
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    config: ChunkConfig,
    last_id: u64,
    current: Option<RunId>,
    latest: Vec<Scored>,
    finished: bool,
}

impl Scheduler {
    pub fn new(config: ChunkConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    pub fn reconfigure(&mut self, config: ChunkConfig) {
        self.config = config;
    }

    pub fn needs_chunking(&self, num_candidates: usize) -> bool {
        num_candidates >= self.config.chunk_threshold
    }

    pub fn start(&mut self, candidates: Vec<Word>) -> Result<ScoringRun> {
        let id = RunId(self.last_id + 1);
        let run = ScoringRun::new(id, candidates)?;
        if let Some(previous) = self.current {
            debug!("run {:?} supersedes {:?}", id, previous);
        }
        self.last_id = id.0;
        self.current = Some(id);
        self.latest.clear();
        self.finished = false;
        Ok(run)
    }

    pub fn current(&self) -> Option<RunId> {
        self.current
    }

    pub fn is_current(&self, id: RunId) -> bool {
        self.current == Some(id)
    }

    /// Records output of run `id`. Returns false, ignoring it, when `id` is
    /// not the current run.
    pub fn publish(&mut self, id: RunId, ranked: &[Scored], done: bool) -> bool {
        if !self.is_current(id) {
            debug!("discarding stale output of run {:?}", id);
            return false;
        }
        self.latest.clear();
        self.latest.extend_from_slice(ranked);
        self.finished = done;
        true
    }

    pub fn latest(&self) -> &[Scored] {
        &self.latest
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn cancel(&mut self) {
        self.current = None;
        self.latest.clear();
        self.finished = false;
    }

    /// Drives a fresh run to completion on this thread, yielding between
    /// slices and publishing each partial ordering.
    pub fn run_blocking(
        &mut self,
        candidates: Vec<Word>,
        on_progress: &mut ProgressSink,
        on_partial: &mut PartialSink,
    ) -> Result<ScoreTable> {
        let mut run = self.start(candidates)?;
        let budget = self.config.slice_budget();
        loop {
            let step = run.advance(budget, on_progress, on_partial);
            self.publish(run.id(), run.partial(), step.is_done());
            if step.is_done() {
                break;
            }
            thread::yield_now();
        }
        Ok(ScoreTable::from_ranked(run.ranked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::score;

    fn words(list: &[&str]) -> Vec<Word> {
        list.iter().map(|w| w.parse().unwrap()).collect()
    }

    fn sample() -> Vec<Word> {
        words(&[
            "crane", "crate", "trace", "caret", "react", "cater", "slate", "least", "steal",
            "tales", "crone", "score", "store", "stare",
        ])
    }

    #[test]
    fn zero_budget_scores_one_source_per_slice() {
        let mut scheduler = Scheduler::default();
        let mut run = scheduler.start(sample()).unwrap();
        let mut slices = 0;
        loop {
            let step = run.step(time::Duration::ZERO);
            slices += 1;
            assert_eq!(step.progress().processed, slices);
            assert_eq!(run.partial().len(), slices);
            if step.is_done() {
                break;
            }
        }
        assert_eq!(slices, sample().len());
        assert_eq!(run.finish(), score(&sample()).unwrap());
    }

    #[test]
    fn chunked_matches_single_pass() {
        let expected = score(&sample()).unwrap();
        for slice_ms in [0, 1, 300] {
            let mut scheduler = Scheduler::new(ChunkConfig {
                slice_ms,
                chunk_threshold: 0,
            });
            let mut reports = Vec::new();
            let mut partial_lens = Vec::new();
            let table = scheduler
                .run_blocking(
                    sample(),
                    &mut |_, progress: Progress| reports.push(progress.processed),
                    &mut |_, ranked: &[Scored]| partial_lens.push(ranked.len()),
                )
                .unwrap();
            assert_eq!(table, expected, "slice_ms = {}", slice_ms);
            assert_eq!(scheduler.latest(), expected.ranked());
            assert!(scheduler.is_finished());
            assert_eq!(reports.last(), Some(&sample().len()));
            assert_eq!(reports, partial_lens);
            assert!(reports.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn partial_orderings_stay_sorted() {
        let mut run = Scheduler::default().start(sample()).unwrap();
        while !run.step(time::Duration::ZERO).is_done() {
            assert!(run
                .partial()
                .windows(2)
                .all(|w| w[0].entropy >= w[1].entropy));
        }
    }

    #[test]
    fn stale_runs_are_discarded() {
        let mut scheduler = Scheduler::default();
        let mut old = scheduler.start(sample()).unwrap();
        let mut new = scheduler.start(words(&["crane", "crate"])).unwrap();
        assert_ne!(old.id(), new.id());
        assert!(!scheduler.is_current(old.id()));

        new.step(time::Duration::MAX);
        assert!(scheduler.publish(new.id(), new.partial(), new.is_done()));
        let accepted = scheduler.latest().to_vec();

        old.step(time::Duration::MAX);
        assert!(!scheduler.publish(old.id(), old.partial(), old.is_done()));
        assert_eq!(scheduler.latest(), accepted.as_slice());
        assert!(scheduler.is_finished());

        scheduler.cancel();
        assert!(!scheduler.publish(new.id(), new.partial(), true));
        assert!(scheduler.latest().is_empty());
    }

    #[test]
    fn empty_run_is_done_immediately() {
        let mut run = Scheduler::default().start(Vec::new()).unwrap();
        let step = run.step(time::Duration::ZERO);
        assert!(step.is_done());
        assert_eq!(step.progress().total, 0);
        assert_eq!(step.progress().fraction(), 1.0);
        assert!(run.finish().is_empty());
    }

    #[test]
    fn mixed_lengths_are_rejected() {
        let mut scheduler = Scheduler::default();
        assert!(scheduler.start(words(&["crane", "cranes"])).is_err());
        assert_eq!(scheduler.current(), None);
    }

    #[test]
    fn threshold() {
        let scheduler = Scheduler::new(ChunkConfig {
            slice_ms: 10,
            chunk_threshold: 3,
        });
        assert!(!scheduler.needs_chunking(2));
        assert!(scheduler.needs_chunking(3));
        assert_eq!(scheduler.config().slice_budget(), time::Duration::from_millis(10));

        let mut scheduler = scheduler;
        let first = scheduler.start(Vec::new()).unwrap().id();
        scheduler.reconfigure(ChunkConfig::default());
        let second = scheduler.start(Vec::new()).unwrap().id();
        assert!(second > first);
        assert_eq!(scheduler.config(), &ChunkConfig::default());
    }

    #[test]
    fn progress_rendering() {
        let progress = Progress {
            processed: 1,
            total: 4,
            elapsed: 2.0,
        };
        assert_eq!(progress.fraction(), 0.25);
        assert_eq!(progress.remaining_secs(), 6.0);
        assert_eq!(progress.to_string(), "1/4 | 2s elapsed | 6s left");
    }
}
