use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use spotmap::config::SpotMapConfig;
use spotmap::geolocation::FixedGeolocation;
use spotmap::sink::{ChannelSink, SinkEvent};
use spotmap::{
    Bounds, Coordinate, DataFetchOrchestrator, DuplicateSubmissionGuard, ExistingSubmission,
    FilterSnapshot, InMemorySpotRepository, InputProfile, ProximityResolver, SpotRepository,
    SubmissionCandidate, ViewportChangeCoordinator, ViewportSettings, seed_viewport,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

/// Command line configuration
#[derive(Parser, Debug)]
#[command(author, version, about = "Viewport-synchronised spot loading engine", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay viewport events (JSON lines on stdin) and print sink events as JSON lines
    Replay {
        /// JSON array of spots served by the in-memory repository
        #[arg(long)]
        spots: Option<PathBuf>,

        /// Use the touch-device debounce interval
        #[arg(long)]
        touch: bool,

        /// Seed the first viewport around this position, given as "lat,lng"
        #[arg(long)]
        seed: Option<String>,
    },
    /// Check a new submission against existing entries
    CheckDuplicate {
        /// JSON array of existing submissions
        #[arg(long)]
        existing: PathBuf,

        #[arg(long)]
        name: String,

        #[arg(long)]
        prefecture: String,

        #[arg(long, requires = "lng")]
        lat: Option<f64>,

        #[arg(long, requires = "lat")]
        lng: Option<f64>,
    },
}

/// One line of replay input
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ReplayAction {
    Bounds {
        bounds: Bounds,
        #[serde(default)]
        filters: FilterSnapshot,
    },
    Reload {
        bounds: Bounds,
        #[serde(default)]
        filters: FilterSnapshot,
    },
    Wait {
        ms: u64,
    },
}

#[cfg(feature = "http")]
fn remote_repository(config: &SpotMapConfig) -> Result<Option<Arc<dyn SpotRepository>>> {
    if config.repository.base_url.is_none() {
        return Ok(None);
    }
    let repo = spotmap::HttpSpotRepository::from_config(&config.repository)?;
    Ok(Some(Arc::new(repo)))
}

#[cfg(not(feature = "http"))]
fn remote_repository(config: &SpotMapConfig) -> Result<Option<Arc<dyn SpotRepository>>> {
    if config.repository.base_url.is_some() {
        warn!("Built without the http feature, ignoring repository.base_url");
    }
    Ok(None)
}

fn build_repository(
    config: &SpotMapConfig,
    spots: Option<PathBuf>,
) -> Result<Arc<dyn SpotRepository>> {
    if let Some(remote) = remote_repository(config)? {
        return Ok(remote);
    }

    let repo = match spots {
        Some(path) => InMemorySpotRepository::from_json_file(&path)
            .with_context(|| format!("Failed to load spots from {}", path.display()))?,
        None => InMemorySpotRepository::default(),
    };
    info!("Serving {} spots from memory", repo.len());
    Ok(Arc::new(repo))
}

fn parse_seed(seed: &str) -> Result<Coordinate> {
    let (lat, lng) = seed
        .split_once(',')
        .context("Seed must be given as \"lat,lng\"")?;
    let coordinate = Coordinate::new(lng.trim().parse()?, lat.trim().parse()?)?;
    Ok(coordinate)
}

async fn replay(
    config: SpotMapConfig,
    spots: Option<PathBuf>,
    touch: bool,
    seed: Option<String>,
) -> Result<()> {
    let repository = build_repository(&config, spots)?;
    let (sink, mut rx) = ChannelSink::new();
    let orchestrator = Arc::new(DataFetchOrchestrator::new(repository, Arc::new(sink)));
    let profile = if touch {
        InputProfile::Touch
    } else {
        InputProfile::Pointer
    };
    let coordinator = ViewportChangeCoordinator::new(
        orchestrator.clone(),
        ViewportSettings::from(&config.viewport),
        profile,
    )?;

    let resolver = ProximityResolver::new((&config.proximity).into());
    let printer = tokio::spawn(async move {
        while let Some(mut event) = rx.recv().await {
            if let SinkEvent::SpotsLoaded { spots, .. } = &mut event {
                spots.iter_mut().for_each(|spot| resolver.annotate_spot(spot));
            }
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => error!("Failed to encode sink event: {e}"),
            }
        }
    });

    if let Some(seed) = seed {
        let provider = FixedGeolocation(parse_seed(&seed)?);
        if let Some(bounds) =
            seed_viewport(&provider, &orchestrator, config.viewport.seed_span_deg).await
        {
            coordinator.on_bounds_changed(bounds, FilterSnapshot::new());
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let action: ReplayAction = match serde_json::from_str(&line) {
            Ok(action) => action,
            Err(e) => {
                warn!("Ignoring malformed input line: {e}");
                continue;
            }
        };
        match action {
            ReplayAction::Bounds { bounds, filters } => match bounds.validate() {
                Ok(()) => coordinator.on_bounds_changed(bounds, filters),
                Err(e) => warn!("Ignoring invalid bounds: {e}"),
            },
            ReplayAction::Reload { bounds, filters } => match bounds.validate() {
                Ok(()) => coordinator.force_reload(bounds, filters),
                Err(e) => warn!("Ignoring invalid bounds: {e}"),
            },
            ReplayAction::Wait { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
        }
    }

    // Let the last debounced change and its fetch settle.
    tokio::time::sleep(coordinator.debounce_interval() + Duration::from_millis(50)).await;
    while coordinator.has_active_fetch() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    coordinator.shutdown();
    drop(coordinator);
    drop(orchestrator);

    if tokio::time::timeout(Duration::from_secs(1), printer).await.is_err() {
        warn!("Timed out flushing sink events");
    }
    Ok(())
}

fn check_duplicate(
    config: &SpotMapConfig,
    existing: PathBuf,
    name: String,
    prefecture: String,
    coordinates: Option<Coordinate>,
) -> Result<()> {
    let raw = std::fs::read_to_string(&existing)
        .with_context(|| format!("Failed to read {}", existing.display()))?;
    let existing: Vec<ExistingSubmission> =
        serde_json::from_str(&raw).context("Failed to parse existing submissions")?;

    let guard = DuplicateSubmissionGuard::new(config.duplicates.clone());
    let decision = guard.check(&SubmissionCandidate::new(name, prefecture, coordinates), &existing);

    println!("{}", serde_json::to_string_pretty(&decision)?);
    if let Some(message) = decision.user_message() {
        info!("{message}");
    }
    Ok(())
}

async fn real_main() -> Result<()> {
    let cli = Cli::parse();
    let config = SpotMapConfig::load_from_path(cli.config)?;
    spotmap::logging::init(&config.logging)?;

    info!("Configuration: {config:?}");

    match cli.command {
        Command::Replay { spots, touch, seed } => replay(config, spots, touch, seed).await,
        Command::CheckDuplicate {
            existing,
            name,
            prefecture,
            lat,
            lng,
        } => {
            let coordinates = match (lat, lng) {
                (Some(lat), Some(lng)) => Some(Coordinate::new(lng, lat)?),
                _ => None,
            };
            check_duplicate(&config, existing, name, prefecture, coordinates)
        }
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    match real_main().await {
        Ok(()) => std::process::ExitCode::from(0),
        Err(err) => {
            error!("{err:#}");
            eprintln!("Error: {err:#}");
            std::process::ExitCode::from(10)
        }
    }
}
