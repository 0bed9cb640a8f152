use anyhow::{anyhow, Context, Result};
use rand::{rngs::StdRng, SeedableRng};
use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    sync::Mutex,
};
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod clock;
mod difficulty;
mod error;
mod events;
mod session;
mod store;
mod sweep;
mod ui;

use difficulty::{BombRule, Difficulty, DIFFICULTIES};
use session::Session;
use store::Store;

#[derive(Debug, structopt::StructOpt)]
struct Opt {
    /// The board preset to start with: Easy, Normal, Hard or Expert.
    #[structopt(short, long, default_value = "Easy")]
    difficulty: Difficulty,

    /// How the number of bombs is derived from the board size.
    #[structopt(
        short,
        long,
        default_value = "density",
        possible_values = &["density", "sqrt", "combined"],
        case_insensitive = true
    )]
    rule: String,

    /// The fraction of cells holding a bomb, for the density and combined rules.
    #[structopt(long)]
    density: Option<f64>,

    /// Seed for the bomb layout, for reproducible games.
    #[structopt(long)]
    seed: Option<u64>,

    /// Set and remember the player name.
    #[structopt(short, long)]
    name: Option<String>,

    /// Where the player name and scores are kept.
    #[structopt(long = "store", parse(from_os_str))]
    store_path: Option<PathBuf>,

    /// Write logs to this file. Filtered with RUST_LOG.
    #[structopt(long, parse(from_os_str))]
    log_file: Option<PathBuf>,

    /// The width of each cell.
    #[structopt(short = "-w", long, default_value = "5")]
    cell_width: u16,

    /// The height of each cell.
    #[structopt(short = "-H", long, default_value = "3")]
    cell_height: u16,

    /// Print the best times for every difficulty and exit.
    #[structopt(long)]
    scores: bool,

    /// Forget the stored name and scores and exit.
    #[structopt(long)]
    reset_store: bool,
}

fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {}", err))
}

fn print_scores(store: &Store) {
    println!(
        "{} score(s) in {}",
        store.scores().len(),
        store.path().display()
    );
    for difficulty in DIFFICULTIES {
        println!("\n{difficulty}");
        let scores = store.leaderboard(difficulty.name);
        if scores.is_empty() {
            println!("  no scores yet");
        }
        for (rank, entry) in scores.into_iter().enumerate() {
            println!(
                "  {:>2}. {:<16} {} {}",
                rank + 1,
                entry.name,
                entry.timestamp,
                entry.date
            );
        }
    }
}

fn main() -> Result<()> {
    let Opt {
        difficulty,
        rule,
        density,
        seed,
        name,
        store_path,
        log_file,
        cell_width,
        cell_height,
        scores,
        reset_store,
    } = Opt::from_args();

    if cell_width < 3 || cell_height < 3 {
        return Err(anyhow!(
            "cells must be at least 3x3 to fit their border, got {}x{}",
            cell_width,
            cell_height
        ));
    }

    if let Some(path) = &log_file {
        init_logging(path)?;
    }

    let rule = BombRule::from_name(&rule, density).context("invalid bomb rule")?;
    let mut store = Store::load(store_path.unwrap_or_else(store::default_path));

    if reset_store {
        store.reset().context("failed to reset store")?;
        println!("cleared {}", store.path().display());
        return Ok(());
    }

    if let Some(name) = name {
        store.set_name(name).context("failed to save player name")?;
    }

    if scores {
        print_scores(&store);
        return Ok(());
    }

    let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let mut session = Session::builder()
        .rule(rule)
        .rng(rng)
        .player(store.name())
        .build();
    session
        .new_game(difficulty)
        .context("failed to start a game")?;

    info!(
        player = %session.player(),
        difficulty = %difficulty,
        rule = %session.rule(),
        seed = ?seed,
        "starting"
    );

    ui::Ui::builder()
        .session(session)
        .store(store)
        .cell_width(usize::from(cell_width))
        .cell_height(usize::from(cell_height))
        .build()
        .run()
        .context("sweep failed")
}
