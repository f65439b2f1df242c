// src/lib.rs
pub mod api;
pub mod banner;
pub mod config;
pub mod delivery;
pub mod errors;
pub mod judge;
pub mod models;
pub mod moderation;
pub mod report;
pub mod router;
