//! `Petnook` Core Library
//!
//! Shared functionality for `Petnook` components:
//! - Configuration resolution and hierarchy
//! - `SQLite` pool helpers and the shared `DatabaseError`
//! - A clock seam so time-boxed state can be tested deterministically
//! - Common error types and tracing setup

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod tracing_init;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
