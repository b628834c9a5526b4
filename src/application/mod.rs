pub mod auth;
pub mod error;
pub mod ingest;
pub mod render;
pub mod repos;
pub mod sitemap;
pub mod tagging;
pub mod topics;
