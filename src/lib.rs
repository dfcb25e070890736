//! Tripgate - Per-Client Request Rate Limiting
//!
//! This crate implements a fixed-window, in-memory rate limiter keyed by
//! client identifier, along with the HTTP surface that guards a travel
//! assistant's chat API with it. State is owned by a single process; expired
//! windows are reclaimed by a background task.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
