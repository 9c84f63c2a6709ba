//! Maps a catalog search result onto an editable draft. Pure, never fails.
use crate::genres::genre_names;
use crate::models::{
    ContentKind, DraftRecord, MovieDraft, MovieStatus, RecordBase, SeriesDraft, SeriesStatus,
};
use crate::tmdb::CatalogResult;

/// Stands in for a director or creator the catalog did not provide.
pub const PLACEHOLDER: &str = "Não informado";

/// Year from the leading four digits of an ISO date. Empty, short or
/// non-numeric input gives `None`.
pub fn extract_year(date: Option<&str>) -> Option<i32> {
    let head = date?.trim().get(..4)?;
    if !head.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    head.parse().ok()
}

pub fn reconcile(result: &CatalogResult, kind: ContentKind) -> DraftRecord {
    let base = RecordBase {
        title: result.name_for(kind).unwrap_or_default().to_string(),
        year: extract_year(result.date_for(kind)),
        tmdb_id: Some(result.id),
        poster_path: result.poster_path.clone().filter(|p| !p.is_empty()),
        genre: genre_names(&result.genre_ids),
        rating: None,
        notes: String::new(),
    };
    match kind {
        ContentKind::Movie => DraftRecord::Movie(MovieDraft {
            base,
            director: PLACEHOLDER.to_string(),
            status: MovieStatus::ToWatch,
        }),
        ContentKind::Series => DraftRecord::Series(SeriesDraft {
            base,
            creator: PLACEHOLDER.to_string(),
            status: SeriesStatus::ToWatch,
            current_season: 1,
            current_episode: 1,
            total_seasons: result.number_of_seasons,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie_result() -> CatalogResult {
        CatalogResult {
            id: 603,
            title: Some("Matrix".to_string()),
            name: Some("ignored".to_string()),
            release_date: Some("1999-03-30".to_string()),
            first_air_date: Some("2001-01-01".to_string()),
            poster_path: Some("/matrix.jpg".to_string()),
            overview: "Um hacker descobre a verdade.".to_string(),
            vote_average: 8.2,
            genre_ids: vec![28, 999, 878],
            number_of_seasons: None,
        }
    }

    #[test]
    fn year_takes_leading_four_digits() {
        assert_eq!(extract_year(Some("1999-03-30")), Some(1999));
        assert_eq!(extract_year(Some("2024")), Some(2024));
        assert_eq!(extract_year(Some("")), None);
        assert_eq!(extract_year(Some("99")), None);
        assert_eq!(extract_year(Some("abcd-01-01")), None);
        assert_eq!(extract_year(None), None);
    }

    #[test]
    fn movie_uses_title_and_release_date() {
        let draft = reconcile(&movie_result(), ContentKind::Movie);
        let DraftRecord::Movie(movie) = draft else {
            panic!("expected movie draft");
        };
        assert_eq!(movie.base.title, "Matrix");
        assert_eq!(movie.base.year, Some(1999));
        assert_eq!(movie.base.tmdb_id, Some(603));
        assert_eq!(movie.base.genre, "Ação, Ficção Científica");
        assert_eq!(movie.base.rating, None);
        assert_eq!(movie.base.notes, "");
        assert_eq!(movie.director, PLACEHOLDER);
        assert_eq!(movie.status, MovieStatus::ToWatch);
    }

    #[test]
    fn series_uses_name_and_first_air_date() {
        let result = CatalogResult {
            id: 70523,
            name: Some("Dark".to_string()),
            first_air_date: Some("2017-12-01".to_string()),
            genre_ids: vec![18, 9648],
            number_of_seasons: Some(3),
            ..CatalogResult::default()
        };
        let DraftRecord::Series(series) = reconcile(&result, ContentKind::Series) else {
            panic!("expected series draft");
        };
        assert_eq!(series.base.title, "Dark");
        assert_eq!(series.base.year, Some(2017));
        assert_eq!(series.creator, PLACEHOLDER);
        assert_eq!(series.status, SeriesStatus::ToWatch);
        assert_eq!(series.current_season, 1);
        assert_eq!(series.current_episode, 1);
        assert_eq!(series.total_seasons, Some(3));
    }

    #[test]
    fn missing_date_leaves_year_absent() {
        let result = CatalogResult {
            id: 1,
            title: Some("Sem data".to_string()),
            release_date: Some(String::new()),
            ..CatalogResult::default()
        };
        let draft = reconcile(&result, ContentKind::Movie);
        assert_eq!(draft.base().year, None);
    }

    #[test]
    fn average_vote_never_becomes_rating() {
        let mut result = movie_result();
        result.vote_average = 10.0;
        assert_eq!(reconcile(&result, ContentKind::Movie).base().rating, None);
    }

    #[test]
    fn cross_kind_fields_are_not_serialized() {
        let movie = serde_json::to_value(reconcile(&movie_result(), ContentKind::Movie))
            .expect("movie json");
        assert!(movie.get("creator").is_none());
        assert!(movie.get("total_seasons").is_none());

        let series = serde_json::to_value(reconcile(&movie_result(), ContentKind::Series))
            .expect("series json");
        assert!(series.get("director").is_none());
        assert_eq!(series["title"], "ignored");
        assert_eq!(series["year"], 2001);
        assert_eq!(series["total_seasons"], serde_json::Value::Null);
    }
}
