pub mod app;
pub mod catalog;
pub mod config;
pub mod enrich;
pub mod genres;
pub mod library;
pub mod models;
pub mod notify;
pub mod reconcile;
pub mod records;
pub mod supabase;
pub mod tmdb;
pub mod transfer;
