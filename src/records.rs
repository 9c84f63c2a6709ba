use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::fmt;
use tracing::{info, warn};

use crate::models::{ContentKind, DraftRecord, PersistedRecord};
use crate::supabase::{BackendApi, Session};

/// Input the user has to fix. Surfaces as a 400 rather than an upstream error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ValidationError {}

/// The record to change does not exist for this owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordNotFound {
    pub kind: ContentKind,
    pub id: String,
}

impl fmt::Display for RecordNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no {} with id {}", self.kind, self.id)
    }
}

impl std::error::Error for RecordNotFound {}

pub(crate) fn invalid(message: impl Into<String>) -> anyhow::Error {
    ValidationError(message.into()).into()
}

#[derive(Debug, Clone)]
pub enum Submission {
    Create(DraftRecord),
    Update { id: String, draft: DraftRecord },
}

impl Submission {
    pub fn draft(&self) -> &DraftRecord {
        match self {
            Submission::Create(draft) | Submission::Update { draft, .. } => draft,
        }
    }
}

pub fn validate(draft: &DraftRecord) -> Result<()> {
    let base = draft.base();
    if base.title.trim().is_empty() {
        return Err(invalid("title is required"));
    }
    if let Some(rating) = base.rating {
        if !(1..=5).contains(&rating) {
            return Err(invalid(format!("rating must be between 1 and 5, got {rating}")));
        }
    }
    if let DraftRecord::Series(series) = draft {
        if series.current_season == 0 || series.current_episode == 0 {
            return Err(invalid("current season and episode start at 1"));
        }
        if let Some(total) = series.total_seasons {
            if series.current_season > total {
                return Err(invalid(format!(
                    "current season {} is past the last season ({total})",
                    series.current_season
                )));
            }
        }
    }
    Ok(())
}

/// Row sent to the kind's table: the kind-specific shape plus owner, without
/// an id and without the `type` discriminator.
pub fn storage_payload(draft: &DraftRecord, owner: &str) -> Result<Map<String, Value>> {
    let value = match draft {
        DraftRecord::Movie(movie) => serde_json::to_value(movie),
        DraftRecord::Series(series) => serde_json::to_value(series),
    }
    .context("Failed to serialize record")?;
    let Value::Object(mut row) = value else {
        anyhow::bail!("record did not serialize to an object");
    };
    row.remove("id");
    row.insert("title".to_string(), Value::String(draft.base().title.trim().to_string()));
    row.insert("user_id".to_string(), Value::String(owner.to_string()));
    Ok(row)
}

pub async fn submit(
    backend: &dyn BackendApi,
    session: &Session,
    submission: Submission,
) -> Result<()> {
    validate(submission.draft())?;
    match submission {
        Submission::Create(draft) => {
            let kind = draft.kind();
            let row = storage_payload(&draft, &session.user_id)?;
            backend.insert(session, kind, vec![row]).await?;
            info!("Added {} '{}'", kind, draft.base().title);
        }
        Submission::Update { id, draft } => {
            let kind = draft.kind();
            let row = storage_payload(&draft, &session.user_id)?;
            if !backend.update(session, kind, &id, row).await? {
                warn!("Update of {} {} matched no row", kind, id);
                return Err(RecordNotFound { kind, id }.into());
            }
            info!("Updated {} {} '{}'", kind, id, draft.base().title);
        }
    }
    Ok(())
}

pub async fn delete_record(
    backend: &dyn BackendApi,
    session: &Session,
    kind: ContentKind,
    id: &str,
) -> Result<()> {
    backend.delete(session, kind, id).await?;
    info!("Deleted {} {}", kind, id);
    Ok(())
}

/// Both tables for the session's owner. Rows that do not fit the record
/// shape are logged and skipped.
pub async fn list_collection(
    backend: &dyn BackendApi,
    session: &Session,
) -> Result<Vec<PersistedRecord>> {
    let mut records = Vec::new();
    for kind in [ContentKind::Movie, ContentKind::Series] {
        for row in backend.select(session, kind).await? {
            match PersistedRecord::from_row(kind, row) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping malformed {} row: {}", kind, e),
            }
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MovieDraft, MovieStatus, RecordBase, SeriesDraft, SeriesStatus};

    fn movie(title: &str) -> DraftRecord {
        DraftRecord::Movie(MovieDraft {
            base: RecordBase {
                title: title.to_string(),
                year: Some(2002),
                genre: "Crime, Drama".to_string(),
                ..RecordBase::default()
            },
            director: "Fernando Meirelles".to_string(),
            status: MovieStatus::Watched,
        })
    }

    fn series(current: u32, total: Option<u32>) -> DraftRecord {
        DraftRecord::Series(SeriesDraft {
            base: RecordBase {
                title: "Sintonia".to_string(),
                ..RecordBase::default()
            },
            creator: "KondZilla".to_string(),
            status: SeriesStatus::Watching,
            current_season: current,
            current_episode: 2,
            total_seasons: total,
        })
    }

    #[test]
    fn rejects_blank_title() {
        let err = validate(&movie("   ")).unwrap_err();
        assert!(err.downcast_ref::<ValidationError>().is_some());
    }

    #[test]
    fn rejects_rating_out_of_range() {
        let mut draft = movie("Cidade de Deus");
        draft.base_mut().rating = Some(6);
        assert!(validate(&draft).is_err());
        draft.base_mut().rating = Some(0);
        assert!(validate(&draft).is_err());
        draft.base_mut().rating = Some(5);
        assert!(validate(&draft).is_ok());
    }

    #[test]
    fn rejects_season_past_total() {
        assert!(validate(&series(3, Some(2))).is_err());
        assert!(validate(&series(0, None)).is_err());
        assert!(validate(&series(2, Some(2))).is_ok());
        assert!(validate(&series(7, None)).is_ok());
    }

    #[test]
    fn movie_payload_has_owner_and_no_series_fields() {
        let row = storage_payload(&movie(" Cidade de Deus "), "user-1").expect("payload");
        assert_eq!(row["user_id"], "user-1");
        assert_eq!(row["title"], "Cidade de Deus");
        assert_eq!(row["director"], "Fernando Meirelles");
        assert_eq!(row["status"], "watched");
        for absent in ["id", "type", "creator", "current_season", "current_episode", "total_seasons"] {
            assert!(!row.contains_key(absent), "unexpected field {absent}");
        }
    }

    #[test]
    fn series_payload_has_no_director() {
        let row = storage_payload(&series(1, Some(3)), "user-2").expect("payload");
        assert!(!row.contains_key("director"));
        assert!(!row.contains_key("type"));
        assert_eq!(row["creator"], "KondZilla");
        assert_eq!(row["current_season"], 1);
        assert_eq!(row["total_seasons"], 3);
    }
}
