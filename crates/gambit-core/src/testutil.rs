//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use crate::error::AppError;
use crate::pipeline::{LoadInfo, LoadPackage};
use crate::traits::{Destination, Fetcher};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

enum Route {
    Body(String),
    /// Served once, then the URL is unrouted.
    Error(AppError),
}

/// Mock fetcher that serves canned bodies keyed by exact URL.
///
/// Unrouted URLs fail with `HttpError("HTTP 404 for <url>")`.
#[derive(Clone, Default)]
pub struct MockFetcher {
    routes: Arc<Mutex<HashMap<String, Route>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.into(), Route::Body(body.into()));
        self
    }

    pub fn with_json(self, url: impl Into<String>, body: Value) -> Self {
        self.with_body(url, body.to_string())
    }

    pub fn with_error(self, url: impl Into<String>, error: AppError) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.into(), Route::Error(error));
        self
    }

    /// Every URL fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.calls.lock().unwrap().push(url.to_string());

        let mut routes = self.routes.lock().unwrap();
        match routes.remove(url) {
            Some(Route::Body(body)) => {
                routes.insert(url.to_string(), Route::Body(body.clone()));
                Ok(body)
            }
            Some(Route::Error(e)) => Err(e),
            None => Err(AppError::HttpError(format!("HTTP 404 for {url}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// MockDestination
// ---------------------------------------------------------------------------

/// Mock destination that records every package it is asked to load.
#[derive(Clone, Default)]
pub struct MockDestination {
    pub loaded: Arc<Mutex<Vec<LoadPackage>>>,
    load_error: Arc<Mutex<Option<AppError>>>,
}

impl MockDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Destination that fails the next load.
    pub fn with_error(error: AppError) -> Self {
        Self {
            loaded: Arc::new(Mutex::new(Vec::new())),
            load_error: Arc::new(Mutex::new(Some(error))),
        }
    }
}

impl Destination for MockDestination {
    async fn load(&self, package: &LoadPackage) -> Result<LoadInfo, AppError> {
        let mut err = self.load_error.lock().unwrap();
        if let Some(e) = err.take() {
            return Err(e);
        }
        self.loaded.lock().unwrap().push(package.clone());
        Ok(package.summary())
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// A `/leaderboards` body whose `live_blitz` list holds the given players.
pub fn leaderboard_json(usernames: &[&str]) -> Value {
    let entries: Vec<Value> = usernames
        .iter()
        .enumerate()
        .map(|(i, username)| {
            json!({
                "player_id": 1000 + i,
                "@id": format!("https://api.chess.com/pub/player/{username}"),
                "url": format!("https://www.chess.com/member/{username}"),
                "username": username,
                "score": 3300 - i,
                "rank": i + 1,
            })
        })
        .collect();
    json!({ "daily": [], "live_blitz": entries })
}
