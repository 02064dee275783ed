use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_deque::{Injector, Steal};

use crate::consts::{DEFAULT_JOBS, UNKNOWN_FILENAME};
use crate::game::GameDescriptor;
use crate::game::downloader::GameDownloader;
use crate::game::outcome::{DownloadOutcome, FileOutcome, GameOutcome};
use crate::network::api::{StorefrontExt, LibrarySourceExt};
use crate::network::fetcher::FetcherExt;

pub mod summary;

use summary::LibrarySummary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    GameStarted {
        name: String
    },

    GameFinished {
        name: String,
        downloaded: usize,
        total: usize
    }
}

/// Game which couldn't be turned into a download
#[derive(Debug, Clone, PartialEq, Eq)]
struct RejectedGame {
    name: String,
    reason: String
}

/// List of games to download and the pool downloading them
pub struct Library<S, F> {
    downloader: GameDownloader<S, F>,
    games: Vec<GameDescriptor>,
    rejected: Vec<RejectedGame>,
    jobs: usize
}

impl<S: StorefrontExt, F: FetcherExt> Library<S, F> {
    pub fn new(downloader: GameDownloader<S, F>) -> Self {
        Self {
            downloader,
            games: Vec::new(),
            rejected: Vec::new(),
            jobs: DEFAULT_JOBS
        }
    }

    /// Amount of games downloaded in parallel. `0` and `1` download
    /// games one by one in the list order
    #[inline]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;

        self
    }

    #[inline]
    pub fn with_games(mut self, games: impl IntoIterator<Item = GameDescriptor>) -> Self {
        self.games.extend(games);

        self
    }

    #[inline]
    pub fn games(&self) -> &[GameDescriptor] {
        &self.games
    }

    #[inline]
    pub fn downloader(&self) -> &GameDownloader<S, F> {
        &self.downloader
    }

    pub fn add_game(&mut self, game: GameDescriptor) {
        self.games.push(game);
    }

    /// Remember a game which failed to load so it's reported as failed
    fn reject(&mut self, name: impl ToString, reason: impl std::fmt::Display) {
        let name = name.to_string();

        tracing::error!("Failed to load game `{name}`: {reason}");

        self.rejected.push(RejectedGame {
            name,
            reason: reason.to_string()
        });
    }

    /// Download and verify all the games
    ///
    /// A game which fails as a whole, including panics, is reported
    /// with a single `UNKNOWN` file outcome and never stops other games
    pub fn download_library(&self, platform: Option<&str>, updater: impl Fn(Update) + Clone + Send) -> LibrarySummary
    where
        S: Sync,
        F: Sync
    {
        let mut outcomes = self.rejected.iter()
            .map(|game| GameOutcome {
                name: game.name.clone(),
                files: vec![FileOutcome::new(UNKNOWN_FILENAME, DownloadOutcome::Unexpected(anyhow::anyhow!(game.reason.clone())))]
            })
            .collect::<Vec<_>>();

        if self.jobs <= 1 {
            tracing::debug!("Downloading {} games one by one", self.games.len());

            outcomes.extend(self.download_serial(platform, updater));
        }

        else {
            tracing::debug!("Downloading {} games using {} threads", self.games.len(), self.jobs);

            outcomes.extend(self.download_parallel(platform, updater));
        }

        for game in &outcomes {
            for file in &game.files {
                if let DownloadOutcome::Unexpected(err) = &file.outcome {
                    tracing::error!("{}: {}: {err:?}", game.name, file.filename);
                }
            }
        }

        let summary = LibrarySummary::from_outcomes(&outcomes);

        summary.log();

        summary
    }

    fn download_serial(&self, platform: Option<&str>, updater: impl Fn(Update)) -> Vec<GameOutcome> {
        let finished = AtomicUsize::new(0);

        self.games.iter()
            .map(|game| self.process_game(game, platform, &finished, &updater))
            .collect()
    }

    fn download_parallel(&self, platform: Option<&str>, updater: impl Fn(Update) + Clone + Send) -> Vec<GameOutcome>
    where
        S: Sync,
        F: Sync
    {
        let queue = Injector::new();

        for game in &self.games {
            queue.push(game);
        }

        let (sender, receiver) = flume::unbounded();
        let finished = AtomicUsize::new(0);

        let threads = self.jobs.min(self.games.len());

        std::thread::scope(|scope| {
            for _ in 0..threads {
                let sender = sender.clone();
                let updater = updater.clone();

                let queue = &queue;
                let finished = &finished;

                scope.spawn(move || {
                    loop {
                        match queue.steal() {
                            Steal::Success(game) => {
                                let outcome = self.process_game(game, platform, finished, &updater);

                                if sender.send(outcome).is_err() {
                                    break;
                                }
                            }

                            Steal::Retry => continue,
                            Steal::Empty => break
                        }
                    }

                    tracing::trace!("Queue is empty, thread exiting");
                });
            }
        });

        drop(sender);

        receiver.into_iter().collect()
    }

    fn process_game(&self, game: &GameDescriptor, platform: Option<&str>, finished: &AtomicUsize, updater: &impl Fn(Update)) -> GameOutcome {
        (updater)(Update::GameStarted {
            name: game.name.clone()
        });

        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.downloader.download_game(game, platform)
        }));

        let files = match result {
            Ok(Ok(files)) => files,

            Ok(Err(err)) => {
                tracing::error!("Failed to download `{}`: {err}", game.name);

                vec![FileOutcome::new(UNKNOWN_FILENAME, DownloadOutcome::Unexpected(err.into()))]
            }

            Err(panic) => {
                let message = panic.downcast_ref::<&str>()
                    .map(|message| message.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| String::from("unknown panic"));

                tracing::error!("Downloading `{}` panicked: {message}", game.name);

                vec![FileOutcome::new(UNKNOWN_FILENAME, DownloadOutcome::Unexpected(anyhow::anyhow!("download panicked: {message}")))]
            }
        };

        let downloaded = finished.fetch_add(1, Ordering::SeqCst) + 1;
        let total = self.games.len();

        tracing::info!("Downloaded {} ({downloaded} of {total})", game.name);

        (updater)(Update::GameFinished {
            name: game.name.clone(),
            downloaded,
            total
        });

        GameOutcome {
            name: game.name.clone(),
            files
        }
    }
}

impl<S: StorefrontExt + LibrarySourceExt, F: FetcherExt> Library<S, F> {
    fn storefront(&self) -> &S {
        self.downloader.storefront()
    }

    /// Load all the games of the user's library, page by page until
    /// an empty page is returned
    ///
    /// Return amount of loaded games
    pub fn load_owned_games(&mut self) -> anyhow::Result<usize> {
        let mut page = 1;
        let mut loaded = 0;

        loop {
            let keys = self.storefront().owned_keys(page)?;

            if keys.is_empty() {
                break;
            }

            tracing::debug!("Loaded {} owned keys from page {page}", keys.len());

            for key in keys {
                let name = key.game.get("title")
                    .and_then(|title| title.as_str())
                    .map(String::from)
                    .unwrap_or_else(|| format!("game {}", key.game_id));

                match GameDescriptor::from_owned_key(key) {
                    Ok(game) => {
                        self.games.push(game);

                        loaded += 1;
                    }

                    Err(err) => self.reject(name, err)
                }
            }

            page += 1;
        }

        tracing::info!("Loaded {loaded} games from the library");

        Ok(loaded)
    }

    /// Load single game by its publisher and slug
    pub fn load_game(&mut self, publisher: &str, slug: &str) -> anyhow::Result<()> {
        let game_id = self.storefront().game_id_by_slug(publisher, slug)?;
        let data = self.storefront().game(game_id)?;

        self.games.push(GameDescriptor::from_game_data(data)?);

        Ok(())
    }

    /// Load all the games listed on the publisher's page
    ///
    /// Return amount of loaded games
    pub fn load_publisher_games(&mut self, publisher: &str) -> anyhow::Result<usize> {
        let page = self.storefront().publisher_page(publisher)?;
        let game_ids = parse_publisher_game_ids(&page)?;

        tracing::debug!("Found {} games on the `{publisher}` page", game_ids.len());

        let mut loaded = 0;

        for game_id in game_ids {
            let game = self.storefront()
                .game(game_id)
                .map_err(anyhow::Error::from)
                .and_then(|data| Ok(GameDescriptor::from_game_data(data)?));

            match game {
                Ok(game) => {
                    self.games.push(game);

                    loaded += 1;
                }

                Err(err) => self.reject(format!("game {game_id}"), err)
            }
        }

        Ok(loaded)
    }
}

/// Get ids of the games linked from the publisher's page
///
/// Games are linked as `<a class="game_link" data-label="game:1234:...">`
pub fn parse_publisher_game_ids(html: &str) -> anyhow::Result<Vec<u64>> {
    let document = scraper::Html::parse_document(html);

    let selector = scraper::Selector::parse("a.game_link")
        .map_err(|err| anyhow::anyhow!("Invalid game link selector: {err}"))?;

    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for link in document.select(&selector) {
        let label = link.value().attr("data-label").unwrap_or_default();

        match label.split(':').nth(1).map(str::parse::<u64>) {
            Some(Ok(id)) => {
                if seen.insert(id) {
                    ids.push(id);
                }
            }

            _ => tracing::warn!("Skipping game link with unexpected label `{label}`")
        }
    }

    Ok(ids)
}
