//! Web worker host. The page posts a [`Request`]; the worker answers with
//! [`Reply`] messages and the page calls [`step`] from a timer until it
//! returns false, so scoring never blocks the worker for longer than one
//! slice.

use js_sys::Reflect;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use thiserror::Error;
use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen::JsValue;
use web_sys::console;

use crate::{
    narrow_all, Attempt, CacheKey, ChunkConfig, History, Pattern, RunId, Scheduler,
    ScoreCache, ScoreTable, Scored, ScoringRun, Word,
};

#[wasm_bindgen]
extern "C" {
    static performance: web_sys::Performance;

    fn postMessage(value: &JsValue);
}

pub fn now() -> f64 {
    performance.now()
}

#[derive(Debug, Error)]
enum HostError {
    #[error(transparent)]
    Engine(#[from] crate::Error),

    #[error("malformed message: {0}")]
    Decode(String),
}

#[derive(Deserialize)]
#[serde(tag = "cmd")]
pub enum Request {
    /// Rank `words` after applying `history`, given as `[guess, "20012"]`
    /// pairs. With no history and a `key`, the opener table is cached.
    Score {
        words: Vec<String>,
        #[serde(default)]
        history: Vec<(String, String)>,
        #[serde(default)]
        key: Option<String>,
        #[serde(default)]
        config: ChunkConfig,
    },
    Cancel,
}

#[derive(Serialize)]
#[serde(tag = "cmd")]
pub enum Reply<'a> {
    UpdateStatus {
        message: String,
        progress: f64,
    },
    SetCandidates {
        candidates: Vec<String>,
    },
    Ranked {
        run: RunId,
        done: bool,
        ranked: &'a [Scored],
    },
}

impl Reply<'_> {
    pub fn post(&self) {
        match JsValue::from_serde(self) {
            Ok(value) => postMessage(&value),
            Err(err) => log::error!("cannot encode reply: {}", err),
        }
    }
}

#[derive(Default)]
struct Worker {
    cache: ScoreCache,
    scheduler: Scheduler,
    run: Option<ScoringRun>,
    caching: Option<CacheKey>,
}

thread_local! {
    static WORKER: RefCell<Worker> = RefCell::new(Worker::default());
}

struct ConsoleLog;

impl log::Log for ConsoleLog {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        console::log_1(&format!("[{}] {}", record.level(), record.args()).into());
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLog = ConsoleLog;

#[wasm_bindgen]
pub fn init() {
    console_error_panic_hook::set_once();
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Debug);
    }
}

#[wasm_bindgen]
pub fn onmessage(e: &JsValue) {
    let result = Reflect::get(e, &"data".into())
        .map_err(|err| HostError::Decode(format!("{:?}", err)))
        .and_then(|data| handle_message(&data));
    if let Err(err) = result {
        update_status(format!("Error: {}", err));
    }
}

/// Runs one slice of the current run. Returns true while work remains.
#[wasm_bindgen]
pub fn step() -> bool {
    WORKER.with(|worker| worker.borrow_mut().step())
}

fn parse_words(words: &[String]) -> Result<Vec<Word>, HostError> {
    Ok(words
        .iter()
        .map(|w| w.parse())
        .collect::<crate::Result<Vec<Word>>>()?)
}

fn parse_history(history: &[(String, String)]) -> Result<History, HostError> {
    let mut parsed = History::new();
    for (guess, pattern) in history {
        parsed.push(Attempt::new(guess.parse()?, pattern.parse::<Pattern>()?)?)?;
    }
    Ok(parsed)
}

fn handle_message(data: &JsValue) -> Result<(), HostError> {
    let request: Request = data
        .into_serde()
        .map_err(|err| HostError::Decode(err.to_string()))?;
    match request {
        Request::Score {
            words,
            history,
            key,
            config,
        } => {
            let key = key.as_deref().map(str::parse::<CacheKey>).transpose()?;
            let words = parse_words(&words)?;
            let history = parse_history(&history)?;
            WORKER.with(|worker| worker.borrow_mut().start(words, history, key, config))
        }
        Request::Cancel => {
            WORKER.with(|worker| worker.borrow_mut().cancel());
            update_status("Cancelled.".to_string());
            Ok(())
        }
    }
}

impl Worker {
    fn start(
        &mut self,
        words: Vec<Word>,
        history: History,
        key: Option<CacheKey>,
        config: ChunkConfig,
    ) -> Result<(), HostError> {
        let candidates = narrow_all(&history, &words)?;
        Reply::SetCandidates {
            candidates: candidates.iter().map(Word::to_string).collect(),
        }
        .post();
        let opener_key = match key.filter(|_| history.is_empty()) {
            Some(key) if !key.covers(&candidates) => {
                log::warn!("words do not form slice {}, scoring uncached", key);
                None
            }
            key => key,
        };
        if let Some(key) = opener_key {
            if let Some(table) = self.cache.get(&key) {
                self.cancel();
                post_table(RunId::default(), &table);
                return Ok(());
            }
        }
        self.scheduler.reconfigure(config);
        let run = self.scheduler.start(candidates)?;
        self.caching = opener_key;
        self.run = Some(run);
        update_progress("Scoring...".to_string(), 0.0);
        Ok(())
    }

    fn cancel(&mut self) {
        self.scheduler.cancel();
        self.run = None;
        self.caching = None;
    }

    fn step(&mut self) -> bool {
        let budget = self.scheduler.config().slice_budget();
        let run = match self.run.as_mut() {
            Some(run) => run,
            None => return false,
        };
        let step = run.step(budget);
        let progress = step.progress();
        let id = run.id();
        if !self.scheduler.publish(id, run.partial(), step.is_done()) {
            return false;
        }
        update_progress(format!("Scoring... {}", progress), progress.fraction());
        Reply::Ranked {
            run: id,
            done: step.is_done(),
            ranked: self.scheduler.latest(),
        }
        .post();
        if !step.is_done() {
            return true;
        }
        if let (Some(key), Some(run)) = (self.caching.take(), self.run.take()) {
            self.cache.insert(key, run.finish());
        }
        self.run = None;
        update_status("Done!".to_string());
        false
    }
}

fn post_table(run: RunId, table: &ScoreTable) {
    Reply::Ranked {
        run,
        done: true,
        ranked: table.ranked(),
    }
    .post();
    update_status("Done! (cached)".to_string());
}

pub fn update_status(message: String) {
    update_progress(message, f64::NAN);
}

pub fn update_progress(message: String, progress: f64) {
    Reply::UpdateStatus { message, progress }.post();
}
