use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use itchio_downloader::prelude::*;

/// Exit code used when some of the files weren't downloaded
const DOWNLOAD_FAILED_EXIT_CODE: u8 = 128;

#[derive(Debug, Parser)]
#[command(name = "itch-dl")]
#[command(about = "Download and verify all the games of an itch.io library")]
#[command(version)]
struct Cli {
    /// itch.io API key, used instead of the username and password
    #[arg(short = 'k', long, env = "ITCH_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Asked interactively if not set
    #[arg(long, env = "ITCH_USERNAME")]
    username: Option<String>,

    /// Asked interactively if not set
    #[arg(long, env = "ITCH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Download only files for the platform, e.g. `windows`, `linux` or `osx`.
    /// Platform-agnostic files are always downloaded
    #[arg(short, long, env = "ITCH_PLATFORM")]
    platform: Option<String>,

    /// Amount of games downloaded in parallel
    #[arg(short, long, env = "ITCH_JOBS", default_value_t = DEFAULT_JOBS)]
    jobs: usize,

    /// Download all the games listed on the publisher's page
    #[arg(long, value_name = "PUBLISHER")]
    download_publisher: Option<String>,

    /// Download single game by its storefront URL
    #[arg(long, value_name = "URL", conflicts_with = "download_publisher")]
    download_game: Option<String>,

    /// Folder the library is downloaded to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    #[arg(short, long)]
    verbose: bool
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "itchio_downloader=debug,itch_dl=debug"
    } else {
        "itchio_downloader=info,itch_dl=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into())
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(cli) {
        Ok(summary) if summary.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(DOWNLOAD_FAILED_EXIT_CODE),

        Err(err) => {
            tracing::error!("{err:#}");

            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<LibrarySummary> {
    let api_key = match cli.api_key {
        Some(api_key) => api_key,

        None => {
            let username = match cli.username {
                Some(username) => username,

                None => dialoguer::Input::<String>::new()
                    .with_prompt("Username")
                    .interact_text()?
            };

            let password = match cli.password {
                Some(password) => password,

                None => dialoguer::Password::new()
                    .with_prompt("Password")
                    .interact()?
            };

            tracing::info!("Logging in as {username}");

            login(&username, &password)?
        }
    };

    let downloader = GameDownloader::new(ItchApi::new(api_key), Fetcher::new()?)
        .with_output_dir(&cli.output_dir);

    let mut library = Library::new(downloader)
        .with_jobs(cli.jobs);

    if let Some(publisher) = &cli.download_publisher {
        let loaded = library.load_publisher_games(publisher)?;

        tracing::info!("Loaded {loaded} games of `{publisher}`");
    }

    else if let Some(url) = &cli.download_game {
        let url = if url.contains("://") {
            url.clone()
        } else {
            format!("https://{url}")
        };

        let game = GameUrl::parse(&url)?;

        library.load_game(&game.publisher, &game.slug)?;
    }

    else {
        library.load_owned_games()?;
    }

    std::fs::create_dir_all(&cli.output_dir)?;

    let summary = library.download_library(cli.platform.as_deref(), |update| {
        if let LibraryUpdate::GameStarted { name } = update {
            tracing::info!("Downloading {name}");
        }
    });

    Ok(summary)
}
