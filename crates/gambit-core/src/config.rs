use crate::error::AppError;

pub const DEFAULT_BASE_URL: &str = "https://api.chess.com/pub";
pub const DEFAULT_CATEGORY: &str = "live_blitz";

/// Windows and endpoints used by [`ChessExtractor`](crate::extract::ChessExtractor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Root of the published-data API, without trailing slash.
    pub base_url: String,
    /// Leaderboard category every extractor reads (e.g. `live_blitz`).
    pub category: String,
    /// Players enriched with their online flag.
    pub status_limit: usize,
    /// Players whose profile is fetched.
    pub profile_limit: usize,
    /// Players whose latest archive month is fetched.
    pub games_player_limit: usize,
    /// Games kept from each player's latest month.
    pub games_per_player: usize,
    /// Per-player follow-up requests allowed in flight at once.
    pub concurrency: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            status_limit: 100,
            profile_limit: 100,
            games_player_limit: 10,
            games_per_player: 5,
            concurrency: 1,
        }
    }
}

impl ExtractorConfig {
    /// Read configuration from environment variables.
    ///
    /// - `GAMBIT_API_BASE_URL` (optional, defaults to the public chess.com API)
    /// - `GAMBIT_LEADERBOARD_CATEGORY` (optional, defaults to `live_blitz`)
    /// - `GAMBIT_CONCURRENCY` (optional, defaults to 1)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("GAMBIT_API_BASE_URL") {
            let trimmed = raw.trim().trim_end_matches('/');
            url::Url::parse(trimmed).map_err(|e| {
                AppError::ConfigError(format!("Invalid GAMBIT_API_BASE_URL '{raw}': {e}"))
            })?;
            config.base_url = trimmed.to_string();
        }

        if let Some(raw) = lookup("GAMBIT_LEADERBOARD_CATEGORY") {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(AppError::ConfigError(
                    "GAMBIT_LEADERBOARD_CATEGORY must not be empty".into(),
                ));
            }
            config.category = trimmed.to_string();
        }

        if let Some(raw) = lookup("GAMBIT_CONCURRENCY") {
            let parsed: usize = raw.trim().parse().map_err(|_| {
                AppError::ConfigError(format!(
                    "Invalid GAMBIT_CONCURRENCY '{raw}': must be a positive integer"
                ))
            })?;
            if parsed == 0 {
                return Err(AppError::ConfigError(
                    "GAMBIT_CONCURRENCY must be at least 1".into(),
                ));
            }
            config.concurrency = parsed;
        }

        Ok(config)
    }
}
