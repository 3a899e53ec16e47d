use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use np_timelapse::config::Config;
use np_timelapse::db::Database;
use np_timelapse::models::{GameExport, GameId};
use np_timelapse::timelapse::{DataProvider, EncoderKind, JobStatus, Orchestrator};
use np_timelapse::TimelapseError;

#[derive(Parser)]
#[command(name = "nptl")]
#[command(about = "Territory timelapse videos for Neptune's Pride games")]
struct Cli {
    /// Path to a JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    InitDb {
        /// Drop all existing data first
        #[arg(long)]
        reset: bool,
    },
    /// Register a game from a JSON export
    Import { file: PathBuf },
    /// Print a game as JSON
    Export { game_id: GameId },
    /// List registered games
    Games,
    /// Generate timelapse videos, one independent job per game
    Render {
        game_ids: Vec<GameId>,

        /// Produce an animated GIF instead of MP4
        #[arg(long)]
        gif: bool,
    },
    /// Report whether a timelapse is ready, in progress or not started
    Status { game_id: GameId },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "np_timelapse=info,nptl=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_database(config: &Config) -> anyhow::Result<Database> {
    let db = Database::open(config.database_path()?)?;
    db.migrate()?;
    Ok(db)
}

fn orchestrator(config: &Config, db: Database, encoder: EncoderKind) -> anyhow::Result<Orchestrator<Database>> {
    Ok(Orchestrator::new(
        db,
        encoder.build(config.ffmpeg.clone()),
        config.cache_path()?,
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::InitDb { reset } => {
            let db = Database::open(config.database_path()?)?;
            if reset {
                println!("Clearing the database.");
                db.reset()?;
            } else {
                db.migrate()?;
            }
            println!("Database initialised.");
        }
        Commands::Import { file } => {
            let db = open_database(&config)?;
            let content = std::fs::read_to_string(&file)?;
            let export: GameExport = serde_json::from_str(&content)?;
            let game = db.import_game(&export)?;
            println!("Imported game {} ({})", game.id, game.name);
        }
        Commands::Export { game_id } => {
            let db = open_database(&config)?;
            let export = db
                .export_game(game_id)?
                .ok_or_else(|| anyhow::anyhow!("Game {} is not registered", game_id))?;
            println!("{}", serde_json::to_string_pretty(&export)?);
        }
        Commands::Games => {
            let db = open_database(&config)?;
            for summary in db.list_games()? {
                let range = match (summary.first_tick, summary.last_tick) {
                    (Some(first), Some(last)) => format!("ticks {first}..={last}"),
                    _ => "no history".to_string(),
                };
                println!("{:>10}  {:<40}  {}", summary.game.id, summary.game.name, range);
            }
        }
        Commands::Render { game_ids, gif } => {
            let encoder = if gif { EncoderKind::Gif } else { config.encoder };
            let db = open_database(&config)?;
            let orchestrator = Arc::new(orchestrator(&config, db, encoder)?);
            let params = Arc::new(config.render.clone());

            let jobs: Vec<_> = game_ids
                .into_iter()
                .map(|game_id| {
                    let orchestrator = orchestrator.clone();
                    let params = params.clone();
                    let handle =
                        tokio::task::spawn_blocking(move || orchestrator.generate(game_id, &params));
                    (game_id, handle)
                })
                .collect();

            let mut failed = 0;
            for (game_id, handle) in jobs {
                match handle.await? {
                    Ok(path) => println!("Game {}: {}", game_id, path.display()),
                    Err(e @ TimelapseError::ConcurrentGeneration(_)) => {
                        failed += 1;
                        println!("Game {}: {} (try again later)", game_id, e);
                    }
                    Err(e) => {
                        failed += 1;
                        println!("Game {}: {}", game_id, e);
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{} timelapse job(s) did not complete", failed);
            }
        }
        Commands::Status { game_id } => {
            let db = open_database(&config)?;
            let orchestrator = orchestrator(&config, db, config.encoder)?;
            match orchestrator.status(game_id, &config.render)? {
                JobStatus::NotReady => println!("Game {}: not generated", game_id),
                JobStatus::Ready(path) => println!("Game {}: ready at {}", game_id, path.display()),
                JobStatus::InProgress { latest_tick, .. } => {
                    let meta = orchestrator.provider().resolve_game(game_id)?;
                    match (meta, latest_tick) {
                        (Some(meta), Some(tick)) => {
                            let done = tick.saturating_sub(meta.first_tick) + 1;
                            let percent = 100.0 * f64::from(done) / f64::from(meta.frame_count());
                            println!("Game {}: in progress, {:.0}% ({} of {} frames)", game_id, percent, done, meta.frame_count());
                        }
                        _ => println!("Game {}: in progress", game_id),
                    }
                }
            }
        }
    }

    Ok(())
}
