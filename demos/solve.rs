use clap::Parser;
use log::{info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::{fs, io};
use wordsolve::{
    render_duration_secs, CacheKey, ChunkConfig, Dictionary, Pattern, Progress, RunId,
    Scheduler, ScoreCache, Scored, Session, Word,
};

#[derive(Parser, Clone, Debug)]
struct Args {
    #[clap(long, short = 'd', help = "word database in JSON (word -> frequency)")]
    database: PathBuf,
    /// Dictionary slice to play in, e.g. 'A-6'
    #[clap(long, short = 'k')]
    key: CacheKey,
    /// Filter candidates by responses. Example: -f 'abaque 20001; admire 21000'
    #[clap(long, short = 'f', default_value = "")]
    filters: String,
    #[clap(long, default_value = "20")]
    top: usize,
    #[clap(long, default_value = "300")]
    slice_ms: u64,
    #[clap(long, default_value = "200")]
    chunk_threshold: usize,
    /// Write the full ranking as JSON
    #[clap(long, short = 'o')]
    out: Option<PathBuf>,
}

fn parse_guesses(s: &str) -> Result<Vec<(Word, Pattern)>, Box<dyn std::error::Error>> {
    let mut guesses = Vec::default();
    for entry in s.split_terminator(';') {
        if entry.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = entry.split_whitespace().collect();
        if fields.len() != 2 {
            return Err("each guess must have exactly 2 fields".into());
        }
        guesses.push((fields[0].parse()?, fields[1].parse()?));
    }
    Ok(guesses)
}

fn update_stderr_progress(_: RunId, progress: Progress) {
    eprint!("\x1b[2K\r{:6.2}%\t{}", progress.fraction() * 100.0, progress);
    let _ = io::stderr().flush();
}

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let raw: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&fs::read_to_string(&args.database)?)?;
    let mut dictionary = Dictionary::new();
    for (word, frequency) in raw {
        match (word.parse::<Word>(), frequency.as_f64()) {
            (Ok(parsed), Some(frequency)) => dictionary.insert(parsed, frequency),
            _ => warn!("skipping dictionary entry {:?}", word),
        }
    }
    info!("{} words loaded", dictionary.len());

    let mut session = Session::new(&dictionary, args.key);
    for (guess, pattern) in parse_guesses(&args.filters)? {
        let remaining = session.record(guess, pattern)?.len();
        info!("{} candidates remain", remaining);
    }
    if session.candidates().is_empty() {
        return Err("no candidates remain; the feedback is contradictory".into());
    }
    println!("key = {}, nc = {}", session.key(), session.candidates().len());

    let mut scheduler = Scheduler::new(ChunkConfig {
        slice_ms: args.slice_ms,
        chunk_threshold: args.chunk_threshold,
    });
    let t0 = wordsolve::now();
    let ranked: Vec<Scored> = if scheduler.needs_chunking(session.candidates().len()) {
        let table = scheduler.run_blocking(
            session.candidates().to_vec(),
            &mut update_stderr_progress,
            &mut |_, _: &[Scored]| {},
        )?;
        eprint!("\x1b[2K\r");
        table.into_vec()
    } else {
        session.suggest(&ScoreCache::new())?.ranked().to_vec()
    };
    eprintln!("score time = {}", render_duration_secs(wordsolve::now() - t0));

    for scored in ranked.iter().take(args.top) {
        println!("{}\t{:.4}", scored.word, scored.entropy);
    }
    if let Some(out) = args.out {
        let out_file = io::BufWriter::new(fs::File::create(out)?);
        serde_json::to_writer_pretty(out_file, &ranked)?;
    }
    Ok(())
}
