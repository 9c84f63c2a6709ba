use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::models::{null_as_default, ContentKind};

const TMDB_BASE: &str = "https://api.themoviedb.org/3";
const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
const NO_POSTER: &str = "/images/no-poster.png";
const LANGUAGE: &str = "pt-BR";

#[async_trait]
pub trait TmdbApi: Send + Sync {
    /// First page of search results, in TMDB order.
    async fn search(&self, query: &str, kind: ContentKind) -> Result<Vec<CatalogResult>>;
    /// Details with credits appended.
    async fn fetch_details(&self, id: i64, kind: ContentKind) -> Result<ContentDetail>;
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
}

/// One search hit. Movies fill `title`/`release_date`, series fill
/// `name`/`first_air_date`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogResult {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub overview: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vote_average: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub number_of_seasons: Option<u32>,
}

impl CatalogResult {
    /// The kind's own name field.
    pub fn name_for(&self, kind: ContentKind) -> Option<&str> {
        match kind {
            ContentKind::Movie => self.title.as_deref(),
            ContentKind::Series => self.name.as_deref(),
        }
    }

    /// The kind's own date field.
    pub fn date_for(&self, kind: ContentKind) -> Option<&str> {
        match kind {
            ContentKind::Movie => self.release_date.as_deref(),
            ContentKind::Series => self.first_air_date.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentDetail {
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genres: Vec<Named>,
    #[serde(default)]
    pub credits: Option<Credits>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_by: Vec<Named>,
    #[serde(default)]
    pub number_of_seasons: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Named {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credits {
    #[serde(default, deserialize_with = "null_as_default")]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrewMember {
    pub job: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PosterSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl PosterSize {
    fn width(self) -> &'static str {
        match self {
            PosterSize::Small => "w92",
            PosterSize::Medium => "w185",
            PosterSize::Large => "w500",
        }
    }
}

pub fn poster_url(path: Option<&str>, size: PosterSize) -> String {
    match path.filter(|p| !p.is_empty()) {
        Some(p) => format!("{IMAGE_BASE}/{}{p}", size.width()),
        None => NO_POSTER.to_string(),
    }
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .context("request failed")?;
        let status = res.status();
        let text = res.text().await.context("reading body failed")?;
        if !status.is_success() {
            // Strip the key before the URL ends up in logs.
            let shown = url.split("api_key=").next().unwrap_or(url);
            return Err(anyhow!("{} -> {}: {}", shown, status, text));
        }
        let parsed: T = serde_json::from_str(&text).context("JSON parse failed")?;
        Ok(parsed)
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn search(&self, query: &str, kind: ContentKind) -> Result<Vec<CatalogResult>> {
        #[derive(Deserialize)]
        struct SearchResponse {
            #[serde(default)]
            results: Vec<CatalogResult>,
        }

        let url = format!(
            "{TMDB_BASE}/search/{}?query={}&language={LANGUAGE}&api_key={}",
            kind.tmdb_segment(),
            urlencoding::encode(query),
            self.api_key
        );
        let data: SearchResponse = self.get_json(&url).await?;
        Ok(data.results)
    }

    async fn fetch_details(&self, id: i64, kind: ContentKind) -> Result<ContentDetail> {
        let url = format!(
            "{TMDB_BASE}/{}/{id}?append_to_response=credits&language={LANGUAGE}&api_key={}",
            kind.tmdb_segment(),
            self.api_key
        );
        self.get_json(&url).await
    }
}
