use anyhow::{Context, anyhow};
use sbconfig::Config;
use sbplayback::{LoggingTransport, MoveOutcome, PlaybackEngine, QueueEvent, QueueInit, QueueSettings};
use sbpodcast::{ITunesClient, PodcastSearchSource};
use sbsource::{
    Backoff, BoxedSource, CanonicalTrack, IncrementalCollection, LoadOutcome, MediaResolver,
    ResolverRegistry, ServiceContext, ServiceType, load_with_retry,
};
use sbsoundcloud::{SoundCloudClient, SoundCloudResolver, SoundCloudTrackSearchSource};
use sbyoutube::{YouTubeClient, YouTubeResolver, YouTubeTrackSearchSource};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Pages loaded up front, before the queue takes over
const INITIAL_PAGES: usize = 2;

/// Time given to each entry before moving on
const STEP_DELAY: Duration = Duration::from_millis(500);

const USAGE: &str = "usage: SBMusic <soundcloud|youtube|podcast> <query>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (service, query) = parse_args(&args)?;

    // ========== PHASE 1 : Configuration ==========
    let config = Arc::new(Config::load_config("").context("Failed to load configuration")?);
    init_logging(&config)?;
    info!(config = config.path(), "⚙️ Configuration loaded");

    let context = ServiceContext::from_config(Arc::clone(&config))?;
    let backoff = Backoff::from_config(&config)?;
    let settings = QueueSettings::from_config(&config)?;

    if service == ServiceType::ITunes {
        return list_podcasts(context, &config, &query, &backoff, settings.page_size).await;
    }

    // ========== PHASE 2 : Sources ==========
    let (source, resolver) = build_backend(service, &query, context, &config)?;
    let registry = ResolverRegistry::new().with(service, resolver);

    info!(service = %service, query = query.as_str(), "🔎 Searching...");
    let collection = IncrementalCollection::from_arc(Arc::clone(&source));
    let cancel = CancellationToken::new();
    for page in 1..=INITIAL_PAGES {
        match load_with_retry(&collection, settings.page_size, &backoff, &cancel).await {
            LoadOutcome::Appended(added) => info!(page, added, "📄 Page loaded"),
            LoadOutcome::Exhausted | LoadOutcome::Cancelled => break,
            LoadOutcome::Failed(failure) => {
                error!("❌ {}: {}", failure.title, failure.description);
                break;
            }
        }
    }

    let tracks = collection.items();
    if tracks.is_empty() {
        info!("Nothing to play");
        return Ok(());
    }
    for (index, track) in tracks.iter().enumerate() {
        println!("{:>4}. {}", index + 1, describe(track));
    }

    // ========== PHASE 3 : Lecture ==========
    let engine = PlaybackEngine::new(settings, Arc::new(registry), Arc::new(LoggingTransport));
    let mut events = engine.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                QueueEvent::EntryFailed {
                    track,
                    title,
                    description,
                    ..
                } => warn!(track = %track, "⚠️ {}: {}", title, description),
                QueueEvent::PageFailed { title, description } => {
                    warn!("⚠️ {}: {}", title, description)
                }
                QueueEvent::PageAppended { added, has_more } => {
                    info!(added, has_more, "📄 Queue extended")
                }
                QueueEvent::EndOfQueue { .. } => info!("⏹️ End of queue"),
                _ => {}
            }
        }
    });

    engine
        .initialize(QueueInit::Continue {
            tracks,
            source,
            next_token: collection.token(),
        })
        .await?;

    info!("✅ SBMusic is playing, press Ctrl+C to stop...");
    tokio::select! {
        result = walk_queue(&engine) => result?,
        _ = tokio::signal::ctrl_c() => info!("Stopping"),
    }
    Ok(())
}

fn parse_args(args: &[String]) -> anyhow::Result<(ServiceType, String)> {
    let [service, query @ ..] = args else {
        return Err(anyhow!(USAGE));
    };
    let service = match service.to_lowercase().as_str() {
        "soundcloud" | "sc" => ServiceType::SoundCloud,
        "youtube" | "yt" => ServiceType::YouTube,
        "podcast" | "itunes" => ServiceType::ITunes,
        other => return Err(anyhow!("unknown service '{}'\n{}", other, USAGE)),
    };
    let query = query.join(" ");
    if query.trim().is_empty() {
        return Err(anyhow!(USAGE));
    }
    Ok((service, query))
}

/// `RUST_LOG` wins; otherwise `host.logger.min_level`, forced to debug by
/// `host.debug`
fn init_logging(config: &Config) -> anyhow::Result<()> {
    let level = if config.get_debug()? {
        "debug".to_string()
    } else {
        config.get_log_min_level()?.to_lowercase()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn build_backend(
    service: ServiceType,
    query: &str,
    context: ServiceContext,
    config: &Config,
) -> anyhow::Result<(BoxedSource<CanonicalTrack>, Arc<dyn MediaResolver>)> {
    match service {
        ServiceType::SoundCloud => {
            let client = SoundCloudClient::from_config(context, config);
            let source: BoxedSource<CanonicalTrack> =
                Arc::new(SoundCloudTrackSearchSource::new(client.clone(), query));
            let resolver: Arc<dyn MediaResolver> = Arc::new(SoundCloudResolver::new(client));
            Ok((source, resolver))
        }
        ServiceType::YouTube => {
            let client = YouTubeClient::from_config(context, config);
            let source: BoxedSource<CanonicalTrack> =
                Arc::new(YouTubeTrackSearchSource::new(client.clone(), query));
            let resolver: Arc<dyn MediaResolver> = Arc::new(YouTubeResolver::new(client));
            Ok((source, resolver))
        }
        ServiceType::ITunes => Err(anyhow!("{} has no playable tracks", service)),
    }
}

/// Podcast shows are listed, not played
async fn list_podcasts(
    context: ServiceContext,
    config: &Config,
    query: &str,
    backoff: &Backoff,
    page_size: u32,
) -> anyhow::Result<()> {
    info!(query, "🎙️ Searching podcasts...");
    let client = ITunesClient::from_config(context, config);
    let collection = IncrementalCollection::new(PodcastSearchSource::new(client, query));
    let cancel = CancellationToken::new();
    if let LoadOutcome::Failed(failure) =
        load_with_retry(&collection, page_size, backoff, &cancel).await
    {
        return Err(anyhow!("{}: {}", failure.title, failure.description));
    }

    let podcasts = collection.items();
    if podcasts.is_empty() {
        info!("No podcast found for '{}'", query);
    }
    for (index, podcast) in podcasts.iter().enumerate() {
        println!(
            "{:>4}. {} - {} ({} episodes) {}",
            index + 1,
            podcast.author.as_deref().unwrap_or("?"),
            podcast.title,
            podcast.episode_count,
            podcast.feed_url.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn describe(track: &CanonicalTrack) -> String {
    let owner = track
        .owner
        .as_ref()
        .map(|o| o.username.as_str())
        .unwrap_or("?");
    let secs = track.duration_ms / 1000;
    if track.is_live {
        format!("{} - {} [live]", owner, track.title)
    } else {
        format!("{} - {} [{}:{:02}]", owner, track.title, secs / 60, secs % 60)
    }
}

async fn walk_queue(engine: &PlaybackEngine) -> anyhow::Result<()> {
    loop {
        tokio::time::sleep(STEP_DELAY).await;
        if let Some(entry) = engine.current_entry() {
            info!(
                state = ?entry.state(),
                url = entry.stream().map(|s| s.url.as_str()).unwrap_or("-"),
                "🎵 {}",
                describe(entry.track())
            );
        }
        if engine.move_next().await? == MoveOutcome::Boundary {
            return Ok(());
        }
    }
}
