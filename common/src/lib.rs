// Common library for shared code across the gadi CLI and API

pub mod config;
pub mod db;
pub mod errors;
pub mod export;
pub mod gii;
pub mod ingest;
pub mod models;
pub mod retry;
pub mod schemas;
pub mod slug;
pub mod telemetry;
