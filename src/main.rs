use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tunegrab::config::{AppConfig, CliConfig, FileConfig};
use tunegrab::download_manager::{DownloadManager, DownloadRequest, JobRegistry, JobState};
use tunegrab::fetcher::{AudioFormat, AudioQuality, YtDlpFetcher};
use tunegrab::search::{Candidate, CandidateKind, SearchBackend, YtMusicSearchBackend};
use tunegrab::server::{run_server, RequestsLoggingLevel, ServerConfig};
use tunegrab::tagger::LoftyTagWriter;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(name = "tunegrab", about = "Search, download, and tag music from YouTube Music")]
struct CliArgs {
    /// Path to a TOML config file.
    #[clap(long, value_parser = parse_path)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search YouTube Music and print the results.
    Search {
        query: String,

        /// Restrict results to songs or albums.
        #[clap(long, value_enum)]
        kind: Option<CandidateKind>,

        #[clap(long, default_value_t = 10)]
        limit: usize,
    },

    /// Search, download the selected result, and tag the files.
    Get {
        query: String,

        /// Download the first result without prompting.
        #[clap(long, short = 'y')]
        first: bool,

        /// Restrict the search to songs or albums.
        #[clap(long, value_enum)]
        kind: Option<CandidateKind>,

        /// Output directory (defaults to ./downloads).
        #[clap(long, short, value_parser = parse_path)]
        output: Option<PathBuf>,

        /// Audio quality: "best" or a bitrate like "192k".
        #[clap(long)]
        quality: Option<AudioQuality>,

        /// Audio format: mp3, m4a, opus, or flac.
        #[clap(long)]
        format: Option<AudioFormat>,

        /// Cookies file handed to yt-dlp.
        #[clap(long, value_parser = parse_path)]
        cookies_file: Option<PathBuf>,
    },

    /// Run the web server.
    Serve {
        /// The port to listen on.
        #[clap(short, long, default_value_t = 3000)]
        port: u16,

        /// Directory queued downloads land in.
        #[clap(long, value_parser = parse_path)]
        downloads_dir: Option<PathBuf>,

        /// Path to the frontend directory to be statically served.
        #[clap(long)]
        frontend_dir_path: Option<String>,

        /// The level of logging to perform on each request.
        #[clap(long, default_value = "path")]
        logging_level: RequestsLoggingLevel,

        /// Cookies file handed to yt-dlp.
        #[clap(long, value_parser = parse_path)]
        cookies_file: Option<PathBuf>,

        /// How long finished jobs stay pollable, in seconds.
        #[clap(long, default_value_t = 7200)]
        job_retention_secs: i64,

        /// Interval between registry prune runs, in seconds.
        #[clap(long, default_value_t = 600)]
        prune_interval_secs: u64,
    },
}

fn build_manager(config: &AppConfig, search_backend: Arc<dyn SearchBackend>) -> DownloadManager {
    DownloadManager::new(
        search_backend,
        Arc::new(YtDlpFetcher::new()),
        Arc::new(LoftyTagWriter),
        Arc::new(JobRegistry::new(config.job_retention_secs)),
    )
    .with_cookies_file(config.existing_cookies_file())
}

fn print_candidates(candidates: &[Candidate]) {
    for (index, candidate) in candidates.iter().enumerate() {
        let duration = match candidate.duration_secs {
            Some(secs) => format!(" ({}:{:02})", secs / 60, secs % 60),
            None => String::new(),
        };
        let album = candidate
            .album
            .as_deref()
            .map(|a| format!(" [{}]", a))
            .unwrap_or_default();
        println!(
            "{:>2}. [{}] {} - {}{}{}",
            index + 1,
            candidate.kind.as_str().to_uppercase(),
            candidate.title,
            candidate.artist,
            album,
            duration
        );
    }
}

fn prompt_selection(count: usize) -> Result<usize> {
    print!("\nSelect [1-{}] (or 'q' to quit): ", count);
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let line = line.trim();
    if line.eq_ignore_ascii_case("q") {
        bail!("Aborted");
    }
    match line.parse::<usize>() {
        Ok(n) if n >= 1 && n <= count => Ok(n - 1),
        _ => bail!("Invalid selection: {}", line),
    }
}

async fn cmd_search(query: &str, kind: Option<CandidateKind>, limit: usize) -> Result<()> {
    let backend = YtMusicSearchBackend::new();
    let candidates = backend.search(query, kind, limit).await?;
    if candidates.is_empty() {
        println!("No results for {:?}", query);
        return Ok(());
    }
    print_candidates(&candidates);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_get(
    query: String,
    first: bool,
    kind: Option<CandidateKind>,
    output: Option<PathBuf>,
    quality: Option<AudioQuality>,
    format: Option<AudioFormat>,
    cookies_file: Option<PathBuf>,
    file_config: Option<FileConfig>,
) -> Result<()> {
    let cli_config = CliConfig {
        downloads_dir: output,
        cookies_file,
        quality,
        format,
        job_retention_secs: 7200,
        prune_interval_secs: 0,
        ..Default::default()
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    let search_backend: Arc<dyn SearchBackend> = Arc::new(YtMusicSearchBackend::new());
    let manager = build_manager(&config, search_backend.clone());

    let request = if first {
        // The manager resolves the query itself through its Searching state.
        DownloadRequest::for_query(query, config.downloads_dir.clone())
    } else {
        println!("Searching for {:?}...", query);
        let candidates = search_backend.search(&query, kind, 10).await?;
        if candidates.is_empty() {
            bail!("No results for {:?}", query);
        }
        print_candidates(&candidates);
        let index = prompt_selection(candidates.len())?;
        DownloadRequest::new(candidates[index].clone(), config.downloads_dir.clone())
    };

    let request = request
        .with_quality(config.quality)
        .with_format(config.format);

    let mut handle = manager.submit_with_callback(
        request,
        Some(Box::new(|message| println!("{}", message))),
    )?;
    let snapshot = handle.wait().await;

    match snapshot.state {
        JobState::Complete => {
            if let Some(warning) = &snapshot.warning {
                warn!("{}", warning);
            }
            Ok(())
        }
        _ => bail!("{}", snapshot.message),
    }
}

async fn cmd_serve(
    port: u16,
    downloads_dir: Option<PathBuf>,
    frontend_dir_path: Option<String>,
    logging_level: RequestsLoggingLevel,
    cookies_file: Option<PathBuf>,
    job_retention_secs: i64,
    prune_interval_secs: u64,
    file_config: Option<FileConfig>,
) -> Result<()> {
    let cli_config = CliConfig {
        downloads_dir,
        port,
        logging_level,
        frontend_dir_path,
        cookies_file,
        quality: None,
        format: None,
        job_retention_secs,
        prune_interval_secs,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    let search_backend: Arc<dyn SearchBackend> = Arc::new(YtMusicSearchBackend::new());
    let manager = Arc::new(build_manager(&config, search_backend.clone()));

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
        frontend_dir_path: config.frontend_dir_path.clone(),
        downloads_dir: config.downloads_dir.clone(),
        default_quality: config.quality,
        default_format: config.format,
    };

    info!("Downloads will land in {:?}", config.downloads_dir);
    run_server(
        server_config,
        search_backend,
        manager,
        config.prune_interval_secs,
    )
    .await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };

    match cli_args.command {
        Command::Search { query, kind, limit } => cmd_search(&query, kind, limit).await,
        Command::Get {
            query,
            first,
            kind,
            output,
            quality,
            format,
            cookies_file,
        } => {
            cmd_get(
                query,
                first,
                kind,
                output,
                quality,
                format,
                cookies_file,
                file_config,
            )
            .await
        }
        Command::Serve {
            port,
            downloads_dir,
            frontend_dir_path,
            logging_level,
            cookies_file,
            job_retention_secs,
            prune_interval_secs,
        } => {
            cmd_serve(
                port,
                downloads_dir,
                frontend_dir_path,
                logging_level,
                cookies_file,
                job_retention_secs,
                prune_interval_secs,
                file_config,
            )
            .await
        }
    }
}
