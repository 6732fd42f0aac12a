use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// A JSON object with upstream key order preserved.
pub type JsonObject = Map<String, Value>;

// ---------------------------------------------------------------------------
// Upstream payloads
// ---------------------------------------------------------------------------

/// Response of `GET /leaderboards`: one ranked list per game category.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Leaderboards {
    categories: JsonObject,
}

impl Leaderboards {
    /// Entries among the first `limit` positions of a category, in rank order.
    ///
    /// A missing category (or one that is not a list) yields no entries.
    /// Entries without a string `username` are skipped but still count
    /// towards `limit`.
    pub fn entries(&self, category: &str, limit: usize) -> Vec<LeaderboardEntry> {
        let items = match self.categories.get(category) {
            Some(Value::Array(items)) => items,
            Some(other) => {
                tracing::warn!(
                    %category,
                    kind = json_kind(other),
                    "Leaderboard category is not a list"
                );
                return Vec::new();
            }
            None => {
                tracing::debug!(%category, "Leaderboard category missing");
                return Vec::new();
            }
        };

        items
            .iter()
            .take(limit)
            .enumerate()
            .filter_map(|(position, item)| {
                let entry = match item {
                    Value::Object(fields) => LeaderboardEntry::from_object(fields.clone()),
                    _ => None,
                };
                if entry.is_none() {
                    tracing::warn!(
                        %category,
                        position,
                        "Skipping leaderboard entry without username"
                    );
                }
                entry
            })
            .collect()
    }
}

/// One ranked player in a leaderboard category.
///
/// All upstream fields are kept verbatim; `username` is lifted out because
/// every follow-up request is keyed by it.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    username: String,
    fields: JsonObject,
}

impl LeaderboardEntry {
    pub fn from_object(fields: JsonObject) -> Option<Self> {
        let username = fields.get("username")?.as_str()?.to_string();
        Some(Self { username, fields })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn rank(&self) -> Option<u64> {
        self.fields.get("rank").and_then(Value::as_u64)
    }

    pub fn fields(&self) -> &JsonObject {
        &self.fields
    }
}

impl Serialize for LeaderboardEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Response of `GET /player/{username}/is-online`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OnlineStatus {
    #[serde(default)]
    online: Option<bool>,
}

impl OnlineStatus {
    /// Absent or null `online` reads as offline.
    pub fn is_online(&self) -> bool {
        self.online.unwrap_or(false)
    }
}

/// Response of `GET /player/{username}/games/archives`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchiveIndex {
    #[serde(default)]
    archives: Option<Vec<String>>,
}

impl ArchiveIndex {
    /// Monthly archive URLs, oldest first.
    pub fn archives(&self) -> &[String] {
        self.archives.as_deref().unwrap_or_default()
    }

    /// The most recent (last-listed) archive URL.
    pub fn latest(&self) -> Option<&str> {
        self.archives().last().map(String::as_str)
    }
}

/// Response of a monthly archive URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonthlyArchive {
    #[serde(default)]
    games: Option<Vec<JsonObject>>,
}

impl MonthlyArchive {
    pub fn into_games(self) -> Vec<JsonObject> {
        self.games.unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A shaped record ready to become one warehouse row.
pub trait Record {
    fn into_row(self) -> JsonObject;
}

/// Leaderboard entry plus the player's live online flag.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStatusRecord {
    username: String,
    is_online: bool,
    fields: JsonObject,
}

impl PlayerStatusRecord {
    pub fn new(entry: LeaderboardEntry, is_online: bool) -> Self {
        let LeaderboardEntry {
            username,
            mut fields,
        } = entry;
        fields.insert("is_online".to_string(), Value::Bool(is_online));
        Self {
            username,
            is_online,
            fields,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_online(&self) -> bool {
        self.is_online
    }

    pub fn fields(&self) -> &JsonObject {
        &self.fields
    }
}

impl Serialize for PlayerStatusRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl Record for PlayerStatusRecord {
    fn into_row(self) -> JsonObject {
        self.fields
    }
}

/// A player profile exactly as the profile endpoint returned it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct PlayerProfileRecord {
    fields: JsonObject,
}

impl PlayerProfileRecord {
    pub fn new(fields: JsonObject) -> Self {
        Self { fields }
    }

    pub fn username(&self) -> Option<&str> {
        self.str_field("username")
    }

    pub fn player_id(&self) -> Option<i64> {
        self.fields.get("player_id").and_then(Value::as_i64)
    }

    /// Account status, e.g. `premium` or `closed:fair_play_violations`.
    pub fn status(&self) -> Option<&str> {
        self.str_field("status")
    }

    /// API URL of the player's country resource.
    pub fn country(&self) -> Option<&str> {
        self.str_field("country")
    }

    pub fn followers(&self) -> Option<u64> {
        self.fields.get("followers").and_then(Value::as_u64)
    }

    /// Unix timestamp of the last login.
    pub fn last_online(&self) -> Option<i64> {
        self.fields.get("last_online").and_then(Value::as_i64)
    }

    /// Unix timestamp of account creation.
    pub fn joined(&self) -> Option<i64> {
        self.fields.get("joined").and_then(Value::as_i64)
    }

    pub fn fields(&self) -> &JsonObject {
        &self.fields
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

impl Serialize for PlayerProfileRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl Record for PlayerProfileRecord {
    fn into_row(self) -> JsonObject {
        self.fields
    }
}

/// One game from a player's latest monthly archive.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    player_username: String,
    fields: JsonObject,
}

impl GameRecord {
    pub fn new(player_username: &str, mut game: JsonObject) -> Self {
        game.insert(
            "player_username".to_string(),
            Value::String(player_username.to_string()),
        );
        Self {
            player_username: player_username.to_string(),
            fields: game,
        }
    }

    /// Whose archive this game came from.
    pub fn player_username(&self) -> &str {
        &self.player_username
    }

    pub fn url(&self) -> Option<&str> {
        self.fields.get("url").and_then(Value::as_str)
    }

    pub fn time_class(&self) -> Option<&str> {
        self.fields.get("time_class").and_then(Value::as_str)
    }

    pub fn end_time(&self) -> Option<i64> {
        self.fields.get("end_time").and_then(Value::as_i64)
    }

    pub fn fields(&self) -> &JsonObject {
        &self.fields
    }
}

impl Serialize for GameRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl Record for GameRecord {
    fn into_row(self) -> JsonObject {
        self.fields
    }
}

impl Record for JsonObject {
    fn into_row(self) -> JsonObject {
        self
    }
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
