mod server;

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mastery_core::{
    MAX_TIMESTAMP, ProgressEngine, StudySession, Timestamp, export_json, now_unix_secs,
    unix_to_iso8601,
};
use mastery_store::{DeckStore, Store};
use rmcp::{ServiceExt, transport::stdio};

#[derive(Parser)]
#[command(name = "mastery", about = "Three-tier spaced-repetition progress tracker and MCP server")]
struct Cli {
    /// Deck to operate on (defaults to config `default_deck`, then "default")
    #[arg(long, global = true)]
    deck: Option<String>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio transport
    Serve,

    /// Record one recall outcome for an item
    Record {
        /// Item identifier, e.g. verbs_たべます
        item: String,
        outcome: Outcome,
        /// Unix seconds the outcome happened at (defaults to now)
        #[arg(long, value_parser = clap::value_parser!(u64).range(..=MAX_TIMESTAMP))]
        at: Option<Timestamp>,
    },

    /// Print an item's tier
    Tier {
        item: String,
    },

    /// Show an item's full progress record
    Show {
        item: String,
    },

    /// List items due for review, highest priority first
    Due {
        /// Unix seconds to evaluate at (defaults to now)
        #[arg(long)]
        at: Option<Timestamp>,
        /// Print priority scores
        #[arg(long)]
        scores: bool,
    },

    /// Show deck progress, per-category breakdown and study statistics
    Stats,

    /// Interactively review due items, answering y/n/q on stdin
    Review {
        /// Maximum items this session (defaults to config `session_limit`)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Export progress to a JSON file
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// Import progress from a JSON file, replacing the deck's contents
    Import {
        /// Input file path
        path: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Outcome {
    Correct,
    Incorrect,
}

fn open_deck(cli: &Cli) -> Result<DeckStore> {
    let base_dir = std::env::var("MASTERY_DATA_DIR").ok().map(PathBuf::from);
    DeckStore::open(cli.deck.as_deref(), base_dir.as_deref()).context("failed to open deck")
}

fn load(deck: &DeckStore) -> Result<ProgressEngine> {
    deck.load_engine()
        .with_context(|| format!("failed to load deck '{}'", deck.deck_id()))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Serve => cmd_serve(&cli).await,
        Commands::Record { item, outcome, at } => cmd_record(&cli, item, *outcome, *at),
        Commands::Tier { item } => cmd_tier(&cli, item),
        Commands::Show { item } => cmd_show(&cli, item),
        Commands::Due { at, scores } => cmd_due(&cli, *at, *scores),
        Commands::Stats => cmd_stats(&cli),
        Commands::Review { limit } => cmd_review(&cli, *limit),
        Commands::Export { path } => cmd_export(&cli, path),
        Commands::Import { path } => cmd_import(&cli, path),
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn cmd_serve(cli: &Cli) -> Result<()> {
    let deck = open_deck(cli)?;
    tracing::info!("starting MCP server for deck '{}'", deck.deck_id());

    let server = server::MasteryServer::new(deck).map_err(|e| anyhow::anyhow!("{e}"))?;
    let service = server
        .clone()
        .serve(stdio())
        .await
        .context("failed to start MCP server")?;

    let signalled = tokio::select! {
        quit = service.waiting() => {
            let reason = quit.context("MCP server task failed")?;
            tracing::info!("MCP server stopped: {reason:?}");
            false
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
            true
        }
    };

    server.checkpoint_wal().await;
    if signalled {
        // The stdin reader is a blocking task that would stall runtime shutdown
        std::process::exit(0);
    }
    Ok(())
}

fn cmd_record(cli: &Cli, item: &str, outcome: Outcome, at: Option<Timestamp>) -> Result<()> {
    let deck = open_deck(cli)?;
    let mut engine = load(&deck)?;

    let correct = matches!(outcome, Outcome::Correct);
    let now = at.unwrap_or_else(now_unix_secs);
    let transition = engine.record_outcome_at(item, correct, now)?;
    deck.store()
        .save_record(&engine, item)
        .context("failed to save outcome")?;

    let tier = engine.get_tier(item);
    match transition {
        Some(t) => {
            let change = if t.is_promotion() { "promoted" } else { "demoted" };
            println!("{item}: {tier} ({change} from {})", t.from)
        }
        None => println!("{item}: {tier}"),
    }
    if let (Some(difficulty), Some(next)) =
        (engine.get_difficulty(item), engine.get_next_review_at(item))
    {
        println!("next review: {} ({difficulty})", unix_to_iso8601(next));
    }
    Ok(())
}

fn cmd_tier(cli: &Cli, item: &str) -> Result<()> {
    let deck = open_deck(cli)?;
    let engine = load(&deck)?;
    println!("{}", engine.get_tier(item));
    Ok(())
}

fn cmd_show(cli: &Cli, item: &str) -> Result<()> {
    let deck = open_deck(cli)?;
    let engine = load(&deck)?;

    let Some(record) = engine.record(item) else {
        println!("{item}: not tracked (new)");
        return Ok(());
    };

    let fmt_ts = |ts: Option<Timestamp>| ts.map(unix_to_iso8601).unwrap_or_else(|| "-".into());
    println!("item:        {item}");
    println!("tier:        {}", record.tier);
    println!("errors:      {}", record.error_count);
    println!("streak:      {}", record.correct_streak);
    println!(
        "difficulty:  {}",
        record.difficulty.map(|d| d.as_str()).unwrap_or("-")
    );
    println!("next review: {}", fmt_ts(record.next_review_at));
    println!("last seen:   {}", fmt_ts(record.last_seen_at));
    Ok(())
}

fn cmd_due(cli: &Cli, at: Option<Timestamp>, scores: bool) -> Result<()> {
    let deck = open_deck(cli)?;
    let engine = load(&deck)?;

    let queue = engine.review_queue(at.unwrap_or_else(now_unix_secs));
    if queue.is_empty() {
        println!("(nothing due)");
    }
    for entry in queue {
        if scores {
            println!("{:>4}  {}", entry.priority, entry.item);
        } else {
            println!("{}", entry.item);
        }
    }
    Ok(())
}

fn cmd_stats(cli: &Cli) -> Result<()> {
    let deck = open_deck(cli)?;
    let engine = load(&deck)?;
    let study = deck
        .store()
        .study_stats()
        .context("failed to load study stats")?;

    let summary = engine.summary();
    println!("deck:       {}", deck.deck_id());
    println!("total:      {}", summary.total);
    println!("new:        {}", summary.new_count);
    println!("learning:   {}", summary.learning_count);
    println!("mastered:   {}", summary.mastered_count);
    println!("progress:   {}%", summary.progress_percent);

    let categories = engine.category_summary();
    if !categories.is_empty() {
        println!();
        for (category, s) in &categories {
            println!(
                "  {category:<16} {:>3}%  new={} learning={} mastered={}",
                s.progress_percent, s.new_count, s.learning_count, s.mastered_count
            );
        }
    }

    println!();
    println!("sessions:   {}", study.total_sessions);
    println!("study time: {}s", study.total_study_secs);
    println!("avg length: {:.1}s", study.average_session_secs);
    println!("best streak: {}", study.longest_streak);
    Ok(())
}

fn cmd_review(cli: &Cli, limit: Option<usize>) -> Result<()> {
    let deck = open_deck(cli)?;
    let mut engine = load(&deck)?;
    let limit = limit.unwrap_or(deck.config().session_limit);

    let mut due = engine.due_items(now_unix_secs());
    due.truncate(limit);
    if due.is_empty() {
        println!("(nothing due)");
        return Ok(());
    }

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let session = run_review(
        &mut engine,
        deck.store(),
        due.iter().map(|id| id.as_str()),
        stdin.lock(),
        stdout.lock(),
    )?;

    println!(
        "reviewed {}, correct {} ({}s)",
        session.reviewed,
        session.correct,
        session.duration_secs().unwrap_or(0)
    );
    Ok(())
}

enum Answer {
    Correct,
    Incorrect,
    Quit,
}

fn parse_answer(line: &str) -> Option<Answer> {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(Answer::Correct),
        "n" | "no" => Some(Answer::Incorrect),
        "q" | "quit" => Some(Answer::Quit),
        _ => None,
    }
}

/// Prompt for each item until the list, input, or patience runs out.
/// Every answer is persisted as it is given.
fn run_review<'a>(
    engine: &mut ProgressEngine,
    store: &Store,
    items: impl IntoIterator<Item = &'a str>,
    mut input: impl BufRead,
    mut out: impl Write,
) -> Result<StudySession> {
    let mut session = StudySession::start(now_unix_secs());
    store
        .insert_session(&session)
        .context("failed to start study session")?;

    'items: for item in items {
        let correct = loop {
            write!(out, "{item} [y/n/q]: ")?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(out)?;
                break 'items;
            }
            match parse_answer(&line) {
                Some(Answer::Correct) => break true,
                Some(Answer::Incorrect) => break false,
                Some(Answer::Quit) => break 'items,
                None => writeln!(out, "answer y, n or q")?,
            }
        };

        if let Some(t) = engine.record_outcome_at(item, correct, now_unix_secs())? {
            writeln!(out, "  {} -> {}", t.from, t.to)?;
        }
        store
            .save_record(engine, item)
            .with_context(|| format!("failed to save outcome for {item}"))?;
        session.note_outcome(correct);
    }

    session.finish(now_unix_secs());
    store
        .finish_session(&session)
        .context("failed to close study session")?;
    Ok(session)
}

fn cmd_export(cli: &Cli, path: &Path) -> Result<()> {
    let deck = open_deck(cli)?;
    let engine = load(&deck)?;

    let json = export_json(&engine).context("failed to serialize progress")?;
    std::fs::write(path, &json).with_context(|| format!("failed to write {}", path.display()))?;

    println!("exported {} items to {}", engine.len(), path.display());
    Ok(())
}

fn cmd_import(cli: &Cli, path: &Path) -> Result<()> {
    let deck = open_deck(cli)?;
    let engine = deck
        .store()
        .import_json_file(path)
        .context("failed to import JSON")?;

    let summary = engine.summary();
    println!(
        "imported {} items from {}. new={}, learning={}, mastered={}",
        summary.total,
        path.display(),
        summary.new_count,
        summary.learning_count,
        summary.mastered_count
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mastery_core::Tier;

    fn review(
        engine: &mut ProgressEngine,
        store: &Store,
        items: &[&str],
        answers: &str,
    ) -> (StudySession, String) {
        let mut out = Vec::new();
        let session = run_review(
            engine,
            store,
            items.iter().copied(),
            answers.as_bytes(),
            &mut out,
        )
        .unwrap();
        (session, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_review_records_answers() {
        let store = Store::open_in_memory().unwrap();
        let mut engine = ProgressEngine::new();

        let (session, out) = review(&mut engine, &store, &["a", "b"], "y\nn\n");
        assert_eq!(session.reviewed, 2);
        assert_eq!(session.correct, 1);
        assert!(out.contains("a [y/n/q]: "));
        assert_eq!(engine.record("b").unwrap().error_count, 1);

        let stored = store.load_sessions().unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].ended_at.is_some());
        assert_eq!(store.load_engine().unwrap().len(), 2);
    }

    #[test]
    fn test_review_quit_and_reprompt() {
        let store = Store::open_in_memory().unwrap();
        let mut engine = ProgressEngine::new();

        let (session, out) = review(&mut engine, &store, &["a", "b", "c"], "maybe\nY\nq\n");
        assert_eq!(session.reviewed, 1);
        assert!(out.contains("answer y, n or q"));
        assert!(engine.record("b").is_none());
    }

    #[test]
    fn test_review_stops_at_eof() {
        let store = Store::open_in_memory().unwrap();
        let mut engine = ProgressEngine::new();
        engine.record_outcome("a", true).unwrap();

        let (session, out) = review(&mut engine, &store, &["a", "b"], "yes\n");
        assert_eq!(session.reviewed, 1);
        assert_eq!(engine.get_tier("a"), Tier::Learning);
        assert!(out.contains("new -> learning"));
    }

    #[test]
    fn test_review_fails_when_outcome_not_saved() {
        let store = Store::open_in_memory().unwrap();
        store.conn().execute_batch("DROP TABLE items").unwrap();
        let mut engine = ProgressEngine::new();

        let mut out = Vec::new();
        let err = run_review(&mut engine, &store, ["a"], "y\n".as_bytes(), &mut out).unwrap_err();
        assert!(err.to_string().contains("failed to save outcome for a"), "{err}");

        let stored = store.load_sessions().unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].ended_at.is_none());
    }
}
