use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Movie vs series discriminator. Fixed for the lifetime of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Movie,
    #[serde(alias = "tv")]
    Series,
}

impl ContentKind {
    /// Backend table holding records of this kind.
    pub fn table(self) -> &'static str {
        match self {
            ContentKind::Movie => "movies",
            ContentKind::Series => "series",
        }
    }

    /// Path segment TMDB uses for this kind.
    pub fn tmdb_segment(self) -> &'static str {
        match self {
            ContentKind::Movie => "movie",
            ContentKind::Series => "tv",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Movie => "movie",
            ContentKind::Series => "series",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "movie" => Ok(ContentKind::Movie),
            "series" | "tv" => Ok(ContentKind::Series),
            _ => Err(anyhow::anyhow!("content kind must be 'movie' or 'series'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovieStatus {
    Watched,
    Watching,
    #[default]
    ToWatch,
}

impl MovieStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MovieStatus::Watched => "watched",
            MovieStatus::Watching => "watching",
            MovieStatus::ToWatch => "to_watch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesStatus {
    Completed,
    Watching,
    #[default]
    ToWatch,
}

impl SeriesStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SeriesStatus::Completed => "completed",
            SeriesStatus::Watching => "watching",
            SeriesStatus::ToWatch => "to_watch",
        }
    }
}

/// Fields shared by movie and series records.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordBase {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub tmdb_id: Option<i64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genre: String,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDraft {
    #[serde(flatten)]
    pub base: RecordBase,
    #[serde(default, deserialize_with = "null_as_default")]
    pub director: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: MovieStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDraft {
    #[serde(flatten)]
    pub base: RecordBase,
    #[serde(default, deserialize_with = "null_as_default")]
    pub creator: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: SeriesStatus,
    #[serde(default = "first", deserialize_with = "null_as_first")]
    pub current_season: u32,
    #[serde(default = "first", deserialize_with = "null_as_first")]
    pub current_episode: u32,
    #[serde(default)]
    pub total_seasons: Option<u32>,
}

/// An editable record before it reaches the backend. The variant decides which
/// kind-specific fields exist, so a movie can never carry `creator` and a
/// series can never carry `director`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DraftRecord {
    Movie(MovieDraft),
    Series(SeriesDraft),
}

impl DraftRecord {
    pub fn kind(&self) -> ContentKind {
        match self {
            DraftRecord::Movie(_) => ContentKind::Movie,
            DraftRecord::Series(_) => ContentKind::Series,
        }
    }

    pub fn base(&self) -> &RecordBase {
        match self {
            DraftRecord::Movie(m) => &m.base,
            DraftRecord::Series(s) => &s.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut RecordBase {
        match self {
            DraftRecord::Movie(m) => &mut m.base,
            DraftRecord::Series(s) => &mut s.base,
        }
    }

    pub fn status_key(&self) -> &'static str {
        match self {
            DraftRecord::Movie(m) => m.status.as_str(),
            DraftRecord::Series(s) => s.status.as_str(),
        }
    }
}

/// A row as returned by the backend: the record shape plus storage id and owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord<T> {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub record: T,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PersistedRecord {
    Movie(StoredRecord<MovieDraft>),
    Series(StoredRecord<SeriesDraft>),
}

impl PersistedRecord {
    pub fn from_row(kind: ContentKind, row: Value) -> serde_json::Result<Self> {
        Ok(match kind {
            ContentKind::Movie => PersistedRecord::Movie(serde_json::from_value(row)?),
            ContentKind::Series => PersistedRecord::Series(serde_json::from_value(row)?),
        })
    }

    pub fn id(&self) -> &str {
        match self {
            PersistedRecord::Movie(r) => &r.id,
            PersistedRecord::Series(r) => &r.id,
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            PersistedRecord::Movie(_) => ContentKind::Movie,
            PersistedRecord::Series(_) => ContentKind::Series,
        }
    }

    pub fn base(&self) -> &RecordBase {
        match self {
            PersistedRecord::Movie(r) => &r.record.base,
            PersistedRecord::Series(r) => &r.record.base,
        }
    }

    pub fn status_key(&self) -> &'static str {
        match self {
            PersistedRecord::Movie(r) => r.record.status.as_str(),
            PersistedRecord::Series(r) => r.record.status.as_str(),
        }
    }
}

fn first() -> u32 {
    1
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_first<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(1))
}

// Backends hand out either uuid strings or bigint ids.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unsupported record id: {other}"
        ))),
    }
}
