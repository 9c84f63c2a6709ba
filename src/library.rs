//! Filtering, sorting and aggregate counts over a user's collection.
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::{ContentKind, MovieStatus, PersistedRecord, SeriesStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindFilter {
    #[default]
    All,
    Movie,
    #[serde(alias = "tv")]
    Series,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    TitleAsc,
    TitleDesc,
    YearDesc,
    YearAsc,
    RatingDesc,
    RatingAsc,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionQuery {
    #[serde(default)]
    pub q: String,
    /// A status value, or "all".
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: KindFilter,
    /// Unsorted (backend order, newest first) when absent.
    #[serde(default)]
    pub sort: Option<SortOrder>,
}

impl CollectionQuery {
    pub fn matches(&self, record: &PersistedRecord) -> bool {
        let needle = self.q.trim().to_lowercase();
        let title_ok = needle.is_empty() || record.base().title.to_lowercase().contains(&needle);
        let status_ok = match self.status.as_deref() {
            None | Some("") | Some("all") => true,
            Some(status) => record.status_key() == status,
        };
        let kind_ok = match self.kind {
            KindFilter::All => true,
            KindFilter::Movie => record.kind() == ContentKind::Movie,
            KindFilter::Series => record.kind() == ContentKind::Series,
        };
        title_ok && status_ok && kind_ok
    }

    pub fn apply(&self, records: Vec<PersistedRecord>) -> Vec<PersistedRecord> {
        let mut kept: Vec<_> = records.into_iter().filter(|r| self.matches(r)).collect();
        if let Some(order) = self.sort {
            kept.sort_by(|a, b| compare(a, b, order));
        }
        kept
    }
}

fn compare(a: &PersistedRecord, b: &PersistedRecord, order: SortOrder) -> Ordering {
    let (a, b) = (a.base(), b.base());
    match order {
        SortOrder::TitleAsc => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortOrder::TitleDesc => b.title.to_lowercase().cmp(&a.title.to_lowercase()),
        SortOrder::YearAsc => missing_last(a.year, b.year, false),
        SortOrder::YearDesc => missing_last(a.year, b.year, true),
        SortOrder::RatingAsc => missing_last(a.rating, b.rating, false),
        SortOrder::RatingDesc => missing_last(a.rating, b.rating, true),
    }
}

// Records without a value go to the end in either direction.
fn missing_last<T: Ord>(a: Option<T>, b: Option<T>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionStats {
    pub total_movies: usize,
    pub total_series: usize,
    pub watched_movies: usize,
    pub watching_series: usize,
    pub top_genre: String,
    pub avg_rating: f64,
}

pub fn collection_stats(records: &[PersistedRecord]) -> CollectionStats {
    let mut stats = CollectionStats::default();
    let mut genre_counts: Vec<(&str, usize)> = Vec::new();
    let mut rating_sum = 0u32;
    let mut rated = 0u32;

    for record in records {
        match record {
            PersistedRecord::Movie(m) => {
                stats.total_movies += 1;
                if m.record.status == MovieStatus::Watched {
                    stats.watched_movies += 1;
                }
            }
            PersistedRecord::Series(s) => {
                stats.total_series += 1;
                if s.record.status == SeriesStatus::Watching {
                    stats.watching_series += 1;
                }
            }
        }
        let base = record.base();
        if let Some(rating) = base.rating.filter(|r| *r > 0) {
            rating_sum += u32::from(rating);
            rated += 1;
        }
        if !base.genre.is_empty() {
            match genre_counts.iter_mut().find(|(g, _)| *g == base.genre) {
                Some((_, count)) => *count += 1,
                None => genre_counts.push((base.genre.as_str(), 1)),
            }
        }
    }

    if rated > 0 {
        let avg = f64::from(rating_sum) / f64::from(rated);
        stats.avg_rating = (avg * 10.0).round() / 10.0;
    }
    // Earliest genre wins a tie.
    let mut best: Option<(&str, usize)> = None;
    for (genre, count) in genre_counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((genre, count));
        }
    }
    stats.top_genre = best.map(|(g, _)| g.to_string()).unwrap_or_default();
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MovieDraft, RecordBase, SeriesDraft, StoredRecord};

    fn base(title: &str, year: Option<i32>, rating: Option<u8>, genre: &str) -> RecordBase {
        RecordBase {
            title: title.to_string(),
            year,
            rating,
            genre: genre.to_string(),
            ..RecordBase::default()
        }
    }

    fn movie(id: &str, base: RecordBase, status: MovieStatus) -> PersistedRecord {
        PersistedRecord::Movie(StoredRecord {
            id: id.to_string(),
            user_id: "u".to_string(),
            created_at: None,
            record: MovieDraft {
                base,
                director: String::new(),
                status,
            },
        })
    }

    fn series(id: &str, base: RecordBase, status: SeriesStatus) -> PersistedRecord {
        PersistedRecord::Series(StoredRecord {
            id: id.to_string(),
            user_id: "u".to_string(),
            created_at: None,
            record: SeriesDraft {
                base,
                creator: String::new(),
                status,
                current_season: 1,
                current_episode: 1,
                total_seasons: None,
            },
        })
    }

    fn sample() -> Vec<PersistedRecord> {
        vec![
            movie("1", base("Bacurau", Some(2019), Some(5), "Drama"), MovieStatus::Watched),
            movie("2", base("auto da Compadecida", Some(2000), None, "Comédia"), MovieStatus::ToWatch),
            series("3", base("Cidade Invisível", None, Some(3), "Fantasia"), SeriesStatus::Watching),
            series("4", base("Irmandade", Some(2019), Some(4), "Drama"), SeriesStatus::Completed),
        ]
    }

    fn ids(records: &[PersistedRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id()).collect()
    }

    #[test]
    fn filters_by_title_case_insensitively() {
        let query = CollectionQuery {
            q: "CIDADE".to_string(),
            ..CollectionQuery::default()
        };
        assert_eq!(ids(&query.apply(sample())), vec!["3"]);
    }

    #[test]
    fn filters_by_status_and_kind() {
        let query = CollectionQuery {
            status: Some("watching".to_string()),
            ..CollectionQuery::default()
        };
        assert_eq!(ids(&query.apply(sample())), vec!["3"]);

        let query = CollectionQuery {
            kind: KindFilter::Movie,
            status: Some("all".to_string()),
            ..CollectionQuery::default()
        };
        assert_eq!(ids(&query.apply(sample())), vec!["1", "2"]);
    }

    #[test]
    fn sorts_titles_ignoring_case() {
        let query = CollectionQuery {
            sort: Some(SortOrder::TitleAsc),
            ..CollectionQuery::default()
        };
        assert_eq!(ids(&query.apply(sample())), vec!["2", "1", "3", "4"]);
    }

    #[test]
    fn missing_years_and_ratings_sort_last() {
        let query = CollectionQuery {
            sort: Some(SortOrder::YearDesc),
            ..CollectionQuery::default()
        };
        assert_eq!(ids(&query.apply(sample())), vec!["1", "4", "2", "3"]);

        let query = CollectionQuery {
            sort: Some(SortOrder::RatingAsc),
            ..CollectionQuery::default()
        };
        assert_eq!(ids(&query.apply(sample())), vec!["3", "4", "1", "2"]);
    }

    #[test]
    fn stats_count_and_average() {
        let stats = collection_stats(&sample());
        assert_eq!(stats.total_movies, 2);
        assert_eq!(stats.total_series, 2);
        assert_eq!(stats.watched_movies, 1);
        assert_eq!(stats.watching_series, 1);
        assert_eq!(stats.top_genre, "Drama");
        assert_eq!(stats.avg_rating, 4.0);
    }

    #[test]
    fn stats_for_empty_collection() {
        let stats = collection_stats(&[]);
        assert_eq!(stats, CollectionStats::default());
    }

    #[test]
    fn top_genre_tie_goes_to_first_seen() {
        let records = vec![
            movie("1", base("A", None, Some(2), "Terror"), MovieStatus::ToWatch),
            movie("2", base("B", None, Some(3), "Romance"), MovieStatus::ToWatch),
        ];
        let stats = collection_stats(&records);
        assert_eq!(stats.top_genre, "Terror");
        assert_eq!(stats.avg_rating, 2.5);
    }
}
