// TavernaStream client
// Command line entry point

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

use tavernastream::models::countdown::{CountdownView, ReleaseTarget};
use tavernastream::models::progress::{MediaRef, MediaType, ProgressUpdate, WatchProgress};
use tavernastream::models::settings::{AppConfig, StorageBackend};
use tavernastream::services::catalog::HttpCatalogClient;
use tavernastream::services::countdown::{run_until_finished, ReleaseCountdown};
use tavernastream::services::notification::notifier_for;
use tavernastream::services::progress::WatchProgressStore;
use tavernastream::services::scheduler::TimerQueue;
use tavernastream::services::storage::{
    JsonFileSlotStore, MemorySlotStore, SlotStore, SqliteSlotStore,
};
use tavernastream::utils::time::TimeBreakdown;

#[derive(Parser)]
#[command(name = "tavernastream", version, about = "Release countdowns and watch progress")]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a release countdown until its "available" banner is dismissed
    Countdown(CountdownArgs),
    /// Inspect or edit continue-watching progress
    #[command(subcommand)]
    Progress(ProgressCommand),
}

#[derive(Args)]
struct CountdownArgs {
    #[arg(long)]
    tmdb_id: u64,
    #[arg(long)]
    media_type: MediaType,
    #[arg(long)]
    title: String,
    /// Release instant in RFC 3339, e.g. 2026-12-25T00:00:00Z
    #[arg(long)]
    release: DateTime<Utc>,
    #[arg(long)]
    backdrop: Option<String>,
    /// Show the detail panel instead of the badge
    #[arg(long)]
    expanded: bool,
}

#[derive(Args)]
struct MediaArgs {
    #[arg(long)]
    tmdb_id: u64,
    #[arg(long)]
    media_type: MediaType,
    #[arg(long)]
    season: Option<u32>,
    #[arg(long)]
    episode: Option<u32>,
}

impl MediaArgs {
    fn to_ref(&self) -> Result<MediaRef> {
        MediaRef::from_parts(self.tmdb_id, self.media_type, self.season, self.episode)
            .ok_or_else(|| anyhow!("tv progress needs both --season and --episode"))
    }
}

#[derive(Subcommand)]
enum ProgressCommand {
    /// Record playback progress
    Save {
        #[command(flatten)]
        media: MediaArgs,
        #[arg(long)]
        progress: f64,
        #[arg(long)]
        completed: bool,
    },
    /// Show the record for one title or episode
    Get(MediaArgs),
    /// List every record, newest first
    List,
    /// List the continue-watching row
    Continue,
    /// Remove one title or episode from continue watching
    Remove(MediaArgs),
    /// Remove every record for a TMDB id
    Clear {
        #[arg(long)]
        tmdb_id: u64,
    },
    /// Remove all records
    ClearAll,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Countdown(args) => run_countdown(&config, args),
        Command::Progress(command) => run_progress(&config, command),
    }
}

fn run_countdown(config: &AppConfig, args: CountdownArgs) -> Result<()> {
    let mut target = ReleaseTarget::new(args.tmdb_id, args.media_type, args.title, args.release);
    if let Some(backdrop) = args.backdrop {
        target = target.with_backdrop(backdrop);
    }

    let catalog = HttpCatalogClient::new(config.api_base_url.clone())?;
    let mut countdown = ReleaseCountdown::new(
        target,
        config.countdown.clone(),
        config.image_base_url.clone(),
        Box::new(catalog),
        notifier_for(&config.countdown),
    );
    if args.expanded {
        countdown.expand();
    }

    let mut queue = TimerQueue::new();
    run_until_finished(&mut countdown, &mut queue, |view| {
        if let Some(text) = render_view(view) {
            println!("{}", text);
        }
    });

    Ok(())
}

fn render_view(view: &CountdownView) -> Option<String> {
    match view {
        CountdownView::Hidden => None,
        CountdownView::Badge {
            blocked,
            label,
            remaining,
        } => {
            let icon = if *blocked { "🔒" } else { "⏳" };
            Some(format!("{} {}: {}", icon, label, remaining))
        }
        CountdownView::Panel(panel) => {
            let TimeBreakdown {
                days,
                hours,
                minutes,
                seconds,
            } = panel.breakdown;
            let mut lines = vec![
                format!("{}: {}", panel.heading, panel.title),
                format!("{} {}", panel.countdown_label, panel.remaining),
                format!(
                    "{} days | {} hours | {} min | {} sec",
                    days, hours, minutes, seconds
                ),
            ];
            if let Some(url) = &panel.backdrop_url {
                lines.push(format!("Backdrop: {}", url));
            }
            if let Some(warning) = panel.warning {
                lines.push(format!("⚠ {}", warning));
            }
            Some(lines.join("\n"))
        }
        CountdownView::Available { title, message } => {
            Some(format!("✓ Available now: {}\n{}", title, message))
        }
    }
}

fn open_slots(config: &AppConfig) -> Result<Box<dyn SlotStore>> {
    if config.storage_backend == StorageBackend::Memory {
        return Ok(Box::new(MemorySlotStore::new()));
    }

    let dir = config.resolve_data_dir()?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create data directory {}", dir.display()))?;

    match config.storage_backend {
        StorageBackend::Json => Ok(Box::new(JsonFileSlotStore::new(dir))),
        StorageBackend::Sqlite => {
            let path = dir.join("tavernastream.db");
            let path = path
                .to_str()
                .ok_or_else(|| anyhow!("Database path {} is not valid UTF-8", path.display()))?;
            Ok(Box::new(SqliteSlotStore::open(path)?))
        }
        StorageBackend::Memory => Ok(Box::new(MemorySlotStore::new())),
    }
}

fn run_progress(config: &AppConfig, command: ProgressCommand) -> Result<()> {
    let mut store = WatchProgressStore::with_config(open_slots(config)?, config.progress.clone());

    match command {
        ProgressCommand::Save {
            media,
            progress,
            completed,
        } => {
            let update = ProgressUpdate::new(media.to_ref()?, progress).with_completed(completed);
            let records = store.save_progress(update)?;
            println!("Saved. {} record(s) stored.", records.len());
        }
        ProgressCommand::Get(media) => match store.get_progress(&media.to_ref()?) {
            Some(record) => println!("{}", describe(record)),
            None => println!("No progress recorded."),
        },
        ProgressCommand::List => print_records(store.records().iter()),
        ProgressCommand::Continue => print_records(store.continue_watching().into_iter()),
        ProgressCommand::Remove(media) => {
            let media = media.to_ref()?;
            if store.remove_from_continue_watching(&media)? {
                println!("Removed {}.", media);
            } else {
                println!("Nothing recorded for {}.", media);
            }
        }
        ProgressCommand::Clear { tmdb_id } => {
            let removed = store.clear_progress(tmdb_id)?;
            println!("Removed {} record(s) for {}.", removed, tmdb_id);
        }
        ProgressCommand::ClearAll => {
            store.clear_all_progress()?;
            println!("All progress cleared.");
        }
    }

    Ok(())
}

fn print_records<'a>(records: impl Iterator<Item = &'a WatchProgress>) {
    let mut any = false;
    for record in records {
        println!("{}", describe(record));
        any = true;
    }
    if !any {
        println!("No progress recorded.");
    }
}

fn describe(record: &WatchProgress) -> String {
    format!(
        "{:<20} {:>5.1}%{}  last watched {}",
        record.media.to_string(),
        record.progress,
        if record.completed { " (completed)" } else { "" },
        record.last_watched_at.format("%Y-%m-%d %H:%M UTC")
    )
}
