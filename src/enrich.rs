use serde::Serialize;
use tracing::{info, warn};

use crate::models::{ContentKind, DraftRecord};
use crate::reconcile::{reconcile, PLACEHOLDER};
use crate::tmdb::{CatalogResult, ContentDetail, TmdbApi};

/// Which path produced a draft. `Basic` means the detail fetch was skipped or
/// failed and only search-result fields were mapped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", content = "draft", rename_all = "lowercase")]
pub enum DraftOutcome {
    Enriched(DraftRecord),
    Basic(DraftRecord),
}

impl DraftOutcome {
    pub fn draft(&self) -> &DraftRecord {
        match self {
            DraftOutcome::Enriched(d) | DraftOutcome::Basic(d) => d,
        }
    }

    pub fn into_draft(self) -> DraftRecord {
        match self {
            DraftOutcome::Enriched(d) | DraftOutcome::Basic(d) => d,
        }
    }

    pub fn is_enriched(&self) -> bool {
        matches!(self, DraftOutcome::Enriched(_))
    }
}

/// Builds the draft for a selected result, then tries one detail fetch.
pub async fn prepare_draft(
    tmdb: Option<&dyn TmdbApi>,
    result: &CatalogResult,
    kind: ContentKind,
) -> DraftOutcome {
    let draft = reconcile(result, kind);
    let Some(tmdb) = tmdb else {
        warn!("TMDB not configured, keeping basic draft for {}", result.id);
        return DraftOutcome::Basic(draft);
    };
    match tmdb.fetch_details(result.id, kind).await {
        Ok(detail) => {
            info!("Enriched {} {} from TMDB details", kind, result.id);
            DraftOutcome::Enriched(apply_detail(draft, &detail))
        }
        Err(e) => {
            warn!(
                "TMDB details for {} {} failed, keeping basic draft: {:#}",
                kind, result.id, e
            );
            DraftOutcome::Basic(draft)
        }
    }
}

pub fn apply_detail(mut draft: DraftRecord, detail: &ContentDetail) -> DraftRecord {
    match &mut draft {
        DraftRecord::Movie(movie) => movie.director = director_of(detail),
        DraftRecord::Series(series) => {
            series.creator = creators_of(detail);
            if series.total_seasons.is_none() {
                series.total_seasons = detail.number_of_seasons;
            }
        }
    }
    let base = draft.base_mut();
    base.genre = or_placeholder(join_names(detail.genres.iter().map(|g| g.name.as_str())));
    base.notes = detail.overview.clone().unwrap_or_default();
    draft
}

/// First crew member credited as "Director".
pub fn director_of(detail: &ContentDetail) -> String {
    detail
        .credits
        .as_ref()
        .and_then(|c| c.crew.iter().find(|p| p.job.as_deref() == Some("Director")))
        .map(|p| p.name.clone())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

pub fn creators_of(detail: &ContentDetail) -> String {
    or_placeholder(join_names(detail.created_by.iter().map(|c| c.name.as_str())))
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn or_placeholder(s: String) -> String {
    if s.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        s
    }
}
