//! JSON export and import of a whole collection.
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::models::{ContentKind, DraftRecord};
use crate::records::{invalid, storage_payload, validate};
use crate::supabase::{BackendApi, Session};

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub version: String,
    pub timestamp: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub movies: Vec<Value>,
    pub series: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub movies: usize,
    pub series: usize,
}

/// Rows ready to insert, already re-owned.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportPlan {
    pub movies: Vec<Map<String, Value>>,
    pub series: Vec<Map<String, Value>>,
}

pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("cineminha-export-{}.json", now.format("%Y-%m-%d"))
}

pub async fn export_collection(
    backend: &dyn BackendApi,
    session: &Session,
    now: DateTime<Utc>,
) -> Result<ExportBundle> {
    let movies = backend.select(session, ContentKind::Movie).await?;
    let series = backend.select(session, ContentKind::Series).await?;
    info!(
        "Exporting {} movies and {} series for {}",
        movies.len(),
        series.len(),
        session.user_id
    );
    Ok(ExportBundle {
        version: EXPORT_VERSION.to_string(),
        timestamp: now.to_rfc3339(),
        user_id: session.user_id.clone(),
        movies,
        series,
    })
}

/// Checks the whole document and rewrites ownership. Each entry goes through
/// the same typing and validation as a submitted draft, so fields of the other
/// kind are dropped and a bad entry anywhere rejects the import before the
/// first insert.
pub fn plan_import(document: &Value, owner: &str) -> Result<ImportPlan> {
    let Some(doc) = document.as_object() else {
        return Err(invalid("import file must be a JSON object"));
    };
    if doc.get("version").map_or(true, Value::is_null) {
        return Err(invalid("invalid import file: missing version"));
    }
    let movies = entries(doc, ContentKind::Movie, owner)?;
    let series = entries(doc, ContentKind::Series, owner)?;
    Ok(ImportPlan { movies, series })
}

fn entries(
    doc: &Map<String, Value>,
    kind: ContentKind,
    owner: &str,
) -> Result<Vec<Map<String, Value>>> {
    let key = kind.table();
    let Some(list) = doc.get(key).and_then(Value::as_array) else {
        return Err(invalid(format!("invalid import file: missing '{key}' list")));
    };
    list.iter()
        .enumerate()
        .map(|(i, entry)| {
            let Some(obj) = entry.as_object() else {
                return Err(invalid(format!("{key}[{i}] is not an object")));
            };
            let has_title = obj
                .get("title")
                .and_then(Value::as_str)
                .is_some_and(|t| !t.trim().is_empty());
            if !has_title {
                return Err(invalid(format!("{key}[{i}] has no title")));
            }
            let mut fields = obj.clone();
            fields.insert("type".to_string(), Value::String(kind.as_str().to_string()));
            let draft: DraftRecord = serde_json::from_value(Value::Object(fields))
                .map_err(|e| invalid(format!("{key}[{i}] is malformed: {e}")))?;
            validate(&draft).map_err(|e| invalid(format!("{key}[{i}]: {e}")))?;
            storage_payload(&draft, owner)
        })
        .collect()
}

/// Appends the document's records to the collection; existing records stay.
/// Movies are written first, so a failed series insert leaves them in place.
pub async fn import_collection(
    backend: &dyn BackendApi,
    session: &Session,
    document: &Value,
) -> Result<ImportSummary> {
    let plan = plan_import(document, &session.user_id)?;
    let summary = ImportSummary {
        movies: plan.movies.len(),
        series: plan.series.len(),
    };
    backend
        .insert(session, ContentKind::Movie, plan.movies)
        .await?;
    if let Err(e) = backend
        .insert(session, ContentKind::Series, plan.series)
        .await
    {
        if summary.movies > 0 {
            error!(
                "Partial import for {}: {} movies were written but the series insert failed: {:#}",
                session.user_id, summary.movies, e
            );
        }
        return Err(e);
    }
    info!(
        "Imported {} movies and {} series for {}",
        summary.movies, summary.series, session.user_id
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ValidationError;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn file_name_uses_export_date() {
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 22, 15, 0).unwrap();
        assert_eq!(export_file_name(now), "cineminha-export-2025-03-09.json");
    }

    #[test]
    fn import_strips_ids_and_reassigns_owner() {
        let doc = json!({
            "version": "1.0",
            "userId": "someone-else",
            "movies": [{
                "id": 7,
                "created_at": "2024-01-01T00:00:00Z",
                "user_id": "someone-else",
                "title": "O Som ao Redor",
                "director": "Kleber Mendonça Filho",
                "status": "watched"
            }],
            "series": []
        });
        let plan = plan_import(&doc, "me").expect("plan");
        assert_eq!(plan.movies.len(), 1);
        assert!(plan.series.is_empty());
        let row = &plan.movies[0];
        assert!(!row.contains_key("id"));
        assert!(!row.contains_key("created_at"));
        assert_eq!(row["user_id"], "me");
        assert_eq!(row["director"], "Kleber Mendonça Filho");
    }

    #[test]
    fn import_requires_all_sections() {
        for doc in [
            json!({ "movies": [], "series": [] }),
            json!({ "version": "1.0", "series": [] }),
            json!({ "version": "1.0", "movies": [] }),
            json!([]),
        ] {
            let err = plan_import(&doc, "me").unwrap_err();
            assert!(err.downcast_ref::<ValidationError>().is_some(), "{doc}");
        }
    }

    #[test]
    fn one_bad_entry_rejects_everything() {
        let doc = json!({
            "version": "1.0",
            "movies": [{ "title": "Ok" }],
            "series": [{ "title": "Ok" }, { "status": "watching" }]
        });
        let err = plan_import(&doc, "me").unwrap_err();
        assert_eq!(err.to_string(), "series[1] has no title");
    }

    #[test]
    fn import_drops_fields_of_the_other_kind() {
        let doc = json!({
            "version": "1.0",
            "movies": [{ "title": "Bacurau", "creator": "x", "current_season": 9 }],
            "series": [{ "title": "Sintonia", "director": "y", "status": "watching" }]
        });
        let plan = plan_import(&doc, "me").expect("plan");
        let movie = &plan.movies[0];
        assert!(!movie.contains_key("creator"));
        assert!(!movie.contains_key("current_season"));
        assert!(!movie.contains_key("type"));
        assert_eq!(movie["status"], "to_watch");
        let series = &plan.series[0];
        assert!(!series.contains_key("director"));
        assert_eq!(series["status"], "watching");
        assert_eq!(series["current_episode"], 1);
    }

    #[test]
    fn import_rejects_entries_a_draft_would_reject() {
        for movie in [
            json!({ "title": "Bacurau", "rating": 42 }),
            json!({ "title": "Bacurau", "status": "bogus" }),
        ] {
            let doc = json!({ "version": "1.0", "movies": [movie], "series": [] });
            let err = plan_import(&doc, "me").unwrap_err();
            assert!(err.downcast_ref::<ValidationError>().is_some(), "{doc}");
            assert!(err.to_string().starts_with("movies[0]"), "{err}");
        }
    }

    #[derive(Default)]
    struct SeriesTableDown {
        inserted: std::sync::Mutex<Vec<ContentKind>>,
    }

    #[async_trait::async_trait]
    impl BackendApi for SeriesTableDown {
        async fn sign_in(&self, _: &str, _: &str) -> Result<Option<Session>> {
            Ok(None)
        }
        async fn sign_up(&self, _: &str, _: &str) -> Result<crate::supabase::SignUpOutcome> {
            anyhow::bail!("unused")
        }
        async fn current_user(&self, _: &str) -> Result<Option<String>> {
            Ok(None)
        }
        async fn select(&self, _: &Session, _: ContentKind) -> Result<Vec<Value>> {
            Ok(Vec::new())
        }
        async fn insert(
            &self,
            _: &Session,
            kind: ContentKind,
            _: Vec<Map<String, Value>>,
        ) -> Result<()> {
            if kind == ContentKind::Series {
                anyhow::bail!("Insert into series failed. Status: 503");
            }
            self.inserted.lock().unwrap().push(kind);
            Ok(())
        }
        async fn update(
            &self,
            _: &Session,
            _: ContentKind,
            _: &str,
            _: Map<String, Value>,
        ) -> Result<bool> {
            Ok(false)
        }
        async fn delete(&self, _: &Session, _: ContentKind, _: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_series_insert_keeps_movies_and_errors() {
        let backend = SeriesTableDown::default();
        let session = Session {
            access_token: "t".to_string(),
            user_id: "me".to_string(),
        };
        let doc = json!({
            "version": "1.0",
            "movies": [{ "title": "Bacurau" }],
            "series": [{ "title": "Sintonia" }]
        });
        let err = import_collection(&backend, &session, &doc).await.unwrap_err();
        assert!(err.downcast_ref::<ValidationError>().is_none());
        assert_eq!(
            backend.inserted.lock().unwrap().as_slice(),
            &[ContentKind::Movie]
        );
    }
}
