// src/api/handlers/mod.rs
mod health;
mod interactions;

pub use health::health_check;
pub use interactions::{interactions, to_event, RawInteraction};
