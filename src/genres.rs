//! Fixed TMDB genre id -> display name table (pt-BR names, movie and TV ids).
use once_cell::sync::Lazy;
use std::collections::HashMap;

static GENRES: Lazy<HashMap<i64, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (28, "Ação"),
        (12, "Aventura"),
        (16, "Animação"),
        (35, "Comédia"),
        (80, "Crime"),
        (99, "Documentário"),
        (18, "Drama"),
        (10751, "Família"),
        (14, "Fantasia"),
        (36, "História"),
        (27, "Terror"),
        (10402, "Música"),
        (9648, "Mistério"),
        (10749, "Romance"),
        (878, "Ficção Científica"),
        (10770, "Cinema TV"),
        (53, "Thriller"),
        (10752, "Guerra"),
        (37, "Faroeste"),
        (10759, "Ação & Aventura"),
        (10762, "Kids"),
        (10763, "Notícias"),
        (10764, "Reality"),
        (10765, "Sci-Fi & Fantasia"),
        (10766, "Novela"),
        (10767, "Talk"),
        (10768, "Guerra & Política"),
    ])
});

pub fn genre_name(id: i64) -> Option<&'static str> {
    GENRES.get(&id).copied()
}

/// Joins the names of known ids with ", ", keeping first-seen order.
/// Repeated and unknown ids are skipped.
pub fn genre_names(ids: &[i64]) -> String {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if seen.contains(id) {
            continue;
        }
        seen.push(*id);
    }
    seen.into_iter()
        .filter_map(genre_name)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_input_order() {
        assert_eq!(genre_names(&[18, 28, 35]), "Drama, Ação, Comédia");
    }

    #[test]
    fn drops_unknown_ids_without_empty_segments() {
        assert_eq!(genre_names(&[1, 18, 424242, 53]), "Drama, Thriller");
        assert_eq!(genre_names(&[7, 8]), "");
        assert_eq!(genre_names(&[]), "");
    }

    #[test]
    fn repeated_ids_render_once() {
        assert_eq!(genre_names(&[18, 18, 10765, 18]), "Drama, Sci-Fi & Fantasia");
    }

    #[test]
    fn tv_only_ids_resolve() {
        assert_eq!(genre_name(10759), Some("Ação & Aventura"));
        assert_eq!(genre_name(0), None);
    }
}
