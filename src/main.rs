//! `anisource` CLI - search sources and resolve episodes to streams

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use anisource::{
    Config, ContentSource, Episode, FileShowCache, ReqwestClient, Resolution,
    ResolutionPipeline, ShowResponse, SourceRegistry, TitleMetadata, TracingStatus,
    VideoContainer,
};

#[derive(Parser)]
#[command(name = "anisource")]
#[command(about = "Resolve anime titles to playable streams")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Include adult sources
    #[arg(long, global = true)]
    nsfw: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ShowKind {
    Series,
    Movie,
}

#[derive(Subcommand)]
enum Commands {
    /// List available sources
    Sources,

    /// Search a source by name
    Search {
        /// Source identifier (e.g. kamyroll)
        source: String,

        /// Title to search for
        query: String,
    },

    /// List the episodes of a show
    Episodes {
        source: String,

        /// Show link as returned by `search`
        link: String,

        /// Listing kind for sources that distinguish series from movies
        #[arg(long, value_enum, default_value = "series")]
        kind: ShowKind,

        /// Season title filter
        #[arg(long)]
        filter: Option<String>,

        /// List dubbed episodes
        #[arg(long)]
        dub: bool,
    },

    /// List the video servers of an episode
    Servers {
        source: String,

        /// Episode link as returned by `episodes`
        link: String,
    },

    /// Resolve a title and episode number to streams
    Resolve {
        source: String,

        /// Catalog id, used as the show cache key
        #[arg(long)]
        id: u64,

        /// Romaji title
        #[arg(long)]
        romaji: String,

        /// English title
        #[arg(long)]
        english: Option<String>,

        /// Catalog format (TV, MOVIE, OVA...)
        #[arg(long)]
        format: Option<String>,

        /// Episode number
        #[arg(short, long, default_value = "1")]
        episode: String,

        #[arg(long)]
        dub: bool,

        /// Crunchyroll series slug for direct lookup
        #[arg(long)]
        crunchy_slug: Option<String>,

        /// VRV series id for direct lookup
        #[arg(long)]
        vrv_id: Option<String>,

        /// Print the resolution as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "anisource=debug",
        _ => "anisource=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut config = Config::load().context("loading configuration")?;
    config.allow_nsfw |= cli.nsfw;

    match cli.command {
        Commands::Sources => cmd_sources(&config)?,
        Commands::Search { source, query } => cmd_search(&config, &source, &query).await?,
        Commands::Episodes {
            source,
            link,
            kind,
            filter,
            dub,
        } => cmd_episodes(&config, &source, &link, kind, filter, dub).await?,
        Commands::Servers { source, link } => cmd_servers(&config, &source, &link).await?,
        Commands::Resolve {
            source,
            id,
            romaji,
            english,
            format,
            episode,
            dub,
            crunchy_slug,
            vrv_id,
            json,
        } => {
            let title = TitleMetadata {
                id,
                name_romaji: romaji,
                name_english: english,
                name_user_preferred: None,
                format,
                crunchy_slug,
                vrv_id,
            };
            cmd_resolve(&config, &source, &title, &episode, dub, json).await?;
        }
    }

    Ok(())
}

fn pipeline(config: &Config) -> Result<ResolutionPipeline> {
    let http = Arc::new(ReqwestClient::new(&config.http)?);
    let cache = FileShowCache::open_default().context("opening show cache")?;
    Ok(ResolutionPipeline::new(
        SourceRegistry::with_defaults(config, http),
        Arc::new(cache),
        Arc::new(TracingStatus),
    ))
}

fn cmd_sources(config: &Config) -> Result<()> {
    let http = Arc::new(ReqwestClient::new(&config.http)?);
    let registry = SourceRegistry::with_defaults(config, http);
    for source in registry.iter() {
        print_source(source.as_ref());
    }
    Ok(())
}

fn print_source(source: &dyn ContentSource) {
    let mut flags = Vec::new();
    if source.is_dub_available_separately() {
        flags.push("separate dubs");
    }
    if source.is_nsfw() {
        flags.push("nsfw");
    }
    let flags = if flags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", flags.join(", "))
    };
    println!("{:<12} {}  {}{flags}", source.save_name(), source.name(), source.host_url());
}

async fn cmd_search(config: &Config, source: &str, query: &str) -> Result<()> {
    let pipeline = pipeline(config)?;
    eprintln!("🔍 Searching {source}: {query}");

    let start = Instant::now();
    let shows = pipeline.search(source, query).await?;
    eprintln!("   {} results in {:.2}ms", shows.len(), start.elapsed().as_secs_f64() * 1000.0);

    for show in &shows {
        print_show(show);
    }
    Ok(())
}

fn print_show(show: &ShowResponse) {
    println!("{}", show.name);
    println!("   link: {}", show.link);
    for (key, value) in &show.extra {
        println!("   {key}: {value}");
    }
}

async fn cmd_episodes(
    config: &Config,
    source: &str,
    link: &str,
    kind: ShowKind,
    filter: Option<String>,
    dub: bool,
) -> Result<()> {
    let pipeline = pipeline(config)?;
    let kind = match kind {
        ShowKind::Series => "series",
        ShowKind::Movie => "",
    };
    let mut show = ShowResponse::new(link, link, "").with_extra("type", kind);
    if let Some(filter) = filter {
        show = show.with_extra("filter", filter);
    }

    eprintln!("📋 Listing episodes for: {link}");
    let episodes = pipeline.episodes(source, &show, dub).await?;
    println!("Episodes: {}", episodes.len());
    for episode in &episodes {
        print_episode(episode);
    }
    Ok(())
}

fn print_episode(episode: &Episode) {
    let title = episode
        .title
        .as_deref()
        .map(|t| format!(" - {t}"))
        .unwrap_or_default();
    println!("  E{}{title}", episode.number);
    println!("     link: {}", episode.link);
    for (variant, id) in &episode.extra {
        println!("     {variant}: {id}");
    }
}

async fn cmd_servers(config: &Config, source: &str, link: &str) -> Result<()> {
    let pipeline = pipeline(config)?;
    let episode = Episode::new("", link);

    eprintln!("🎬 Loading servers for: {link}");
    let servers = pipeline.servers(source, &episode).await?;
    for server in servers {
        println!("{}  {}", server.name, server.embed.url);
    }
    Ok(())
}

async fn cmd_resolve(
    config: &Config,
    source: &str,
    title: &TitleMetadata,
    episode: &str,
    dub: bool,
    json: bool,
) -> Result<()> {
    let pipeline = pipeline(config)?;
    eprintln!("🎬 Resolving {} episode {episode} on {source}", title.main_name());

    let start = Instant::now();
    let resolution = pipeline.resolve(source, title, episode, dub).await?;
    eprintln!("   Done in {:.2}s", start.elapsed().as_secs_f64());

    let Some(resolution) = resolution else {
        eprintln!("⚠️  Nothing found");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
    } else {
        print_resolution(&resolution);
    }
    Ok(())
}

fn print_resolution(resolution: &Resolution) {
    println!("📺 {} ({})", resolution.show.name, resolution.source);
    println!("   Episode {}", resolution.episode.number);
    for resolved in &resolution.servers {
        println!("\n🔗 {}", resolved.server.name);
        print_container(&resolved.container);
    }
    if !resolution.has_streams() {
        println!("\n⚠️  No playable streams");
    }
}

fn print_container(container: &VideoContainer) {
    if container.is_empty() {
        println!("   (no streams)");
        return;
    }
    for video in &container.videos {
        let kind = if video.is_m3u8 { "m3u8" } else { "file" };
        let size = video
            .size_in_bytes
            .map(|s| format!(" {:.1} MB", s as f64 / 1_048_576.0))
            .unwrap_or_default();
        let resolution = video.resolution.as_deref().unwrap_or("auto");
        println!("   {kind} {resolution}{size}  {}", video.url.url);
    }
    for subtitle in &container.subtitles {
        println!("   sub {} ({})  {}", subtitle.language, subtitle.format, subtitle.url);
    }
}
