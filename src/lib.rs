//! Pukul Tikus
//!
//! Whack-a-mole game core with a score/save backend.
//!
//! # Features
//!
//! - `server` - axum HTTP API over SQLite for scores, leaderboard and saves (enabled by default)
//! - `client` - reqwest API client with multi-address fallback (enabled by default)
//!
//! The game core (`game`, `store`) has no I/O of its own: a [`game::session::GameSession`]
//! is advanced with `tick(dt)` and reports what happened through drained events.

pub mod config;
pub mod game;
pub mod metrics;
pub mod net;
pub mod store;

#[cfg(feature = "server")]
pub mod server;
