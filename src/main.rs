//! Command-line entrypoint: `subarea` and `serve`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use osm_subareas::config::{load_config, AppConfig};
use osm_subareas::error::{AppError, AppResult};
use osm_subareas::osm::merge::merge;
use osm_subareas::osm::{OsmClient, RelationId, Resolver};
use osm_subareas::output::{geojson, OutputStore, ResolutionRequest};
use osm_subareas::output::store::StoreError;
use osm_subareas::pipeline::ensure_artifact;
use osm_subareas::GeoServer;

#[derive(Parser)]
#[command(name = "osm-subareas")]
#[command(about = "Utilities for OpenStreetMap GeoJSON", version)]
struct Cli {
    /// Directory of outputs ("-" prints to stdout instead)
    #[arg(short, long, global = true)]
    out: Option<String>,

    /// Enable verbose logging with DEBUG level
    #[arg(long, global = true)]
    verbose: bool,

    /// Optional TOML configuration file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all sub-areas of an OpenStreetMap relation as GeoJSON
    Subarea {
        /// Numeric relation id to resolve
        relation: String,

        /// Leave tags in their unnormalized upstream form
        #[arg(short, long)]
        raw: bool,

        /// Leave equivalent sub-areas unmerged
        #[arg(short, long)]
        separated: bool,

        /// Recompute even when the artifact already exists
        #[arg(long)]
        force: bool,
    },
    /// Serve the output directory over HTTP
    Serve {
        /// Serving address
        #[arg(long)]
        address: Option<String>,

        /// CORS origin
        #[arg(long)]
        origin: Option<String>,

        /// Requests per second per client
        #[arg(long)]
        rate: Option<f64>,

        /// Burst size per client
        #[arg(long)]
        rate_burst: Option<u32>,

        /// Idle TTL for client buckets, in seconds
        #[arg(long)]
        rate_ttl_secs: Option<u64>,

        /// Base path for the artifact handler
        #[arg(long)]
        prefix: Option<String>,

        /// Resolve missing artifacts on request instead of answering 404
        #[arg(long)]
        resolve_on_miss: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "osm_subareas=debug"
    } else {
        "osm_subareas=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> AppResult<()> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(out) = cli.out {
        config.resolve.out_dir = out;
    }

    match cli.command {
        Commands::Subarea {
            relation,
            raw,
            separated,
            force,
        } => {
            config.resolve.raw |= raw;
            config.resolve.separated |= separated;
            subarea_command(&config, &relation, force).await
        }
        Commands::Serve {
            address,
            origin,
            rate,
            rate_burst,
            rate_ttl_secs,
            prefix,
            resolve_on_miss,
        } => {
            let server = &mut config.server;
            if let Some(address) = address {
                server.address = address;
            }
            if let Some(origin) = origin {
                server.origin = origin;
            }
            if let Some(rate) = rate {
                server.rate = rate;
            }
            if let Some(burst) = rate_burst {
                server.burst = burst;
            }
            if let Some(ttl) = rate_ttl_secs {
                server.rate_ttl_secs = ttl;
            }
            if let Some(prefix) = prefix {
                server.prefix = prefix;
            }
            server.resolve_on_miss |= resolve_on_miss;
            serve_command(&config).await
        }
    }
}

async fn subarea_command(config: &AppConfig, relation: &str, force: bool) -> AppResult<()> {
    let root = parse_relation_id(relation)?;
    let client = OsmClient::new(&config.upstream)?;
    let resolver = Resolver::new(client, &config.resolve);

    // "-" keeps everything off disk, like piping into another tool.
    if config.resolve.out_dir == "-" {
        let resolution = resolver.resolve(root, config.resolve.raw).await?;
        let subareas = merge(resolution.subareas, !config.resolve.separated);
        let body = serde_json::to_string_pretty(&geojson::feature_collection(&subareas))
            .map_err(StoreError::Serialize)?;
        println!("{body}");
        return Ok(());
    }

    let store = OutputStore::new();
    let req = ResolutionRequest {
        root,
        raw: config.resolve.raw,
        separate: config.resolve.separated,
        out_dir: PathBuf::from(&config.resolve.out_dir),
    };
    let path = ensure_artifact(&resolver, &store, &req, force).await?;
    println!("{}", path.display());
    Ok(())
}

async fn serve_command(config: &AppConfig) -> AppResult<()> {
    let server = GeoServer::new(config)?;
    let listener = TcpListener::bind(&config.server.address).await?;
    server.run(listener).await?;
    Ok(())
}

fn parse_relation_id(input: &str) -> AppResult<RelationId> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(
            "invalid OpenStreetMap relation ID".to_string(),
        ));
    }
    let id: u64 = trimmed
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("invalid OpenStreetMap relation ID {trimmed:?}")))?;
    if id == 0 {
        return Err(AppError::InvalidInput(
            "relation ID must be positive".to_string(),
        ));
    }
    Ok(RelationId(id))
}
