//! Petnook Moderation Library
//!
//! The abuse mitigation core behind the Petnook apps:
//! - `SQLite` storage for the attempt ledger, user punishment fields, content
//!   visibility and in-app notifications
//! - Sliding-window rate limiting for login, signup and email verification
//! - The ban / chat-restriction state machine with lazy expiry
//! - De-duplicating admin notification dispatch
//! - Moderation console actions used by the `petnook-admin` binary

pub mod console;
pub mod notifications;
pub mod punishment;
pub mod rate_limit;
pub mod storage;
