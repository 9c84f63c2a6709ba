//! Search TMDB and print the draft a selected result turns into.
//! Usage:
//!   cargo run --bin draft_props -- movie "cidade de deus"
//!   cargo run --bin draft_props -- series "dark" 2
//! The optional last argument picks a search hit (0-based, default 0).
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{anyhow, Context, Result};
use cineminha::catalog::{search_catalog, SearchHit};
use cineminha::enrich::prepare_draft;
use cineminha::models::ContentKind;
use cineminha::notify::NoticeLog;
use cineminha::tmdb::{TmdbApi, TmdbClient};
use dotenvy::dotenv;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: cargo run --bin draft_props -- movie <query> [index]");
        eprintln!("       cargo run --bin draft_props -- series <query> [index]");
        std::process::exit(1);
    }

    let kind: ContentKind = args[1].parse()?;
    let query = &args[2];
    let index: usize = match args.get(3) {
        Some(raw) => raw.parse().context("index must be a non-negative integer")?,
        None => 0,
    };

    let api_key = env::var("TMDB_API_KEY").context("TMDB_API_KEY not set")?;
    let client = TmdbClient::new(api_key);
    let tmdb: &dyn TmdbApi = &client;

    let notices = NoticeLog::new();
    let results = search_catalog(Some(tmdb), query, kind, &notices).await;
    for notice in notices.take() {
        eprintln!("notice: {}", notice.message);
    }
    for (i, result) in results.iter().enumerate() {
        let hit = SearchHit::new(result.clone(), kind);
        println!(
            "{i:>2}. {} ({}) {}/5",
            hit.name,
            hit.year.map(|y| y.to_string()).unwrap_or_else(|| "?".to_string()),
            hit.stars
        );
    }

    let selected = results
        .get(index)
        .ok_or_else(|| anyhow!("no search hit at index {index}"))?;
    let outcome = prepare_draft(Some(tmdb), selected, kind).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
