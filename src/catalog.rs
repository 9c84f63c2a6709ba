use serde::Serialize;
use tracing::{debug, warn};

use crate::models::ContentKind;
use crate::notify::{Notice, Notifier};
use crate::reconcile::extract_year;
use crate::tmdb::{poster_url, CatalogResult, PosterSize, TmdbApi};

/// Searches the catalog. Never fails: a blank query returns nothing without a
/// request, and a missing client or an upstream error returns nothing plus a
/// notice, so callers tell "failed" from "no results" only through `notices`.
pub async fn search_catalog(
    tmdb: Option<&dyn TmdbApi>,
    query: &str,
    kind: ContentKind,
    notices: &dyn Notifier,
) -> Vec<CatalogResult> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    let Some(tmdb) = tmdb else {
        warn!("Search requested but TMDB_API_KEY is not configured");
        notices.notify(Notice::search_disabled());
        return Vec::new();
    };
    match tmdb.search(query, kind).await {
        Ok(results) => {
            debug!(query = %query, kind = %kind, hits = results.len(), "Catalog search");
            results
        }
        Err(e) => {
            warn!("TMDB search for '{}' ({}) failed: {:#}", query, kind, e);
            notices.notify(Notice::search_failed());
            Vec::new()
        }
    }
}

/// 0-10 average vote to 0-5 stars, halves rounded up (3.5 -> 4).
/// Display only; never written to a record.
pub fn vote_to_stars(vote: f64) -> u8 {
    if !vote.is_finite() {
        return 0;
    }
    (vote / 2.0).round().clamp(0.0, 5.0) as u8
}

/// What the search list shows for one result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: i64,
    pub name: String,
    pub year: Option<i32>,
    pub poster_url: String,
    pub vote_average: f64,
    pub stars: u8,
    pub result: CatalogResult,
}

impl SearchHit {
    pub fn new(result: CatalogResult, kind: ContentKind) -> Self {
        let name = result
            .name_for(kind)
            .or(result.title.as_deref())
            .or(result.name.as_deref())
            .unwrap_or_default()
            .to_string();
        Self {
            id: result.id,
            name,
            year: extract_year(result.date_for(kind)),
            poster_url: poster_url(result.poster_path.as_deref(), PosterSize::Small),
            vote_average: result.vote_average,
            stars: vote_to_stars(result.vote_average),
            result,
        }
    }
}
