//! The three chess.com extractors.
//!
//! Every extractor re-reads the leaderboard on its own, then fans out one
//! follow-up request chain per player. Streams are lazy: no request is made
//! until the first poll. Items come out in leaderboard order even when
//! [`ExtractorConfig::concurrency`] allows several requests in flight.
//! The first error is yielded and ends the stream.

use futures::future;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::config::ExtractorConfig;
use crate::error::AppError;
use crate::models::{
    ArchiveIndex, GameRecord, LeaderboardEntry, Leaderboards, MonthlyArchive, OnlineStatus,
    PlayerProfileRecord, PlayerStatusRecord, json_kind,
};
use crate::pipeline::Resource;
use crate::traits::Fetcher;

pub const PLAYERS_ONLINE_STATUS: &str = "players_online_status";
pub const PLAYERS_PROFILES: &str = "players_profiles";
pub const PLAYERS_GAMES: &str = "players_games";

/// Produces leaderboard-derived record streams from the published-data API.
pub struct ChessExtractor<F: Fetcher> {
    fetcher: F,
    config: ExtractorConfig,
}

impl<F: Fetcher> ChessExtractor<F> {
    pub fn new(fetcher: F, config: ExtractorConfig) -> Self {
        Self { fetcher, config }
    }

    /// Top `status_limit` players, each with a live `is_online` flag.
    pub fn players_online_status(
        &self,
    ) -> impl Stream<Item = Result<PlayerStatusRecord, AppError>> + '_ {
        let records = self
            .leaderboard(self.config.status_limit)
            .map(move |entry| async move {
                let entry = entry?;
                let url = self.endpoint(&["player", entry.username(), "is-online"])?;
                let status: OnlineStatus = self.fetch_json(&url).await?;
                Ok(PlayerStatusRecord::new(entry, status.is_online()))
            })
            .buffered(self.concurrency());

        stop_after_error(records)
    }

    /// Full profile object of each of the top `profile_limit` players.
    ///
    /// A profile body that is not a JSON object is skipped.
    pub fn players_profiles(
        &self,
    ) -> impl Stream<Item = Result<PlayerProfileRecord, AppError>> + '_ {
        let records = self
            .leaderboard(self.config.profile_limit)
            .map(move |entry| async move {
                let entry = entry?;
                let url = self.endpoint(&["player", entry.username()])?;
                match self.fetch_json::<Value>(&url).await? {
                    Value::Object(fields) => Ok(Some(PlayerProfileRecord::new(fields))),
                    other => {
                        tracing::warn!(
                            username = %entry.username(),
                            kind = json_kind(&other),
                            "Skipping profile that is not an object"
                        );
                        Ok(None)
                    }
                }
            })
            .buffered(self.concurrency());

        stop_after_error(records).try_filter_map(|profile| future::ready(Ok(profile)))
    }

    /// Up to `games_per_player` games from the latest archive month of each
    /// of the top `games_player_limit` players.
    pub fn players_games(&self) -> impl Stream<Item = Result<GameRecord, AppError>> + '_ {
        let records = self
            .leaderboard(self.config.games_player_limit)
            .map(move |entry| async move {
                let entry = entry?;
                self.recent_games(entry.username()).await
            })
            .buffered(self.concurrency())
            .map_ok(|games| stream::iter(games.into_iter().map(Ok::<_, AppError>)))
            .try_flatten();

        stop_after_error(records)
    }

    /// The three resources of a full load, in load order.
    pub fn resources(&self) -> Vec<Resource<'_>> {
        vec![
            Resource::new(PLAYERS_ONLINE_STATUS, self.players_online_status()),
            Resource::new(PLAYERS_PROFILES, self.players_profiles()),
            Resource::new(PLAYERS_GAMES, self.players_games()),
        ]
    }

    fn leaderboard(
        &self,
        limit: usize,
    ) -> impl Stream<Item = Result<LeaderboardEntry, AppError>> + '_ {
        stream::once(self.fetch_leaderboard(limit))
            .map_ok(|entries| stream::iter(entries.into_iter().map(Ok::<_, AppError>)))
            .try_flatten()
    }

    async fn fetch_leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, AppError> {
        let url = self.endpoint(&["leaderboards"])?;
        let boards: Leaderboards = self.fetch_json(&url).await?;

        let entries = boards.entries(&self.config.category, limit);

        tracing::info!(
            category = %self.config.category,
            players = entries.len(),
            "Fetched leaderboard"
        );
        Ok(entries)
    }

    async fn recent_games(&self, username: &str) -> Result<Vec<GameRecord>, AppError> {
        let url = self.endpoint(&["player", username, "games", "archives"])?;
        let index: ArchiveIndex = self.fetch_json(&url).await?;

        let Some(latest) = index.latest() else {
            tracing::debug!(%username, "No game archives, skipping player");
            return Ok(Vec::new());
        };

        let month: MonthlyArchive = self.fetch_json(latest).await?;
        let games: Vec<_> = month
            .into_games()
            .into_iter()
            .take(self.config.games_per_player)
            .map(|game| GameRecord::new(username, game))
            .collect();

        tracing::debug!(%username, archive = %latest, games = games.len(), "Fetched recent games");
        Ok(games)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, AppError> {
        let body = self.fetcher.fetch(url).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(%url, error = %e, "Malformed JSON response");
            AppError::SerializationError(e)
        })
    }

    /// Build `{base_url}/{segments...}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<String, AppError> {
        let base = &self.config.base_url;
        let mut url = Url::parse(base)
            .map_err(|e| AppError::ConfigError(format!("Invalid API base URL '{base}': {e}")))?;

        url.path_segments_mut()
            .map_err(|_| AppError::ConfigError(format!("API base URL '{base}' cannot have a path")))?
            .pop_if_empty()
            .extend(segments);

        Ok(url.to_string())
    }

    fn concurrency(&self) -> usize {
        self.config.concurrency.max(1)
    }
}

/// Yield items until (and including) the first error, then end without
/// polling `stream` again.
fn stop_after_error<S, T>(stream: S) -> impl Stream<Item = Result<T, AppError>>
where
    S: Stream<Item = Result<T, AppError>>,
{
    stream::unfold((Box::pin(stream), false), |(mut inner, failed)| async move {
        if failed {
            return None;
        }
        let item = inner.next().await?;
        let failed = item.is_err();
        Some((item, (inner, failed)))
    })
}
