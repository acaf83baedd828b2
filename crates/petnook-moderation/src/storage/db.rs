//! `SQLite` database for moderation state.

use std::path::Path;
use std::sync::Arc;

use sqlx::{Pool, Sqlite};
use tokio::sync::{broadcast, watch};
use tracing::info;

use petnook_core::db::{DatabaseError, open_pool, open_pool_in_memory};

use super::models::LedgerChange;

/// Capacity of the ledger change feed. Slow subscribers that fall further
/// behind than this see a lag and recompute from scratch.
const LEDGER_FEED_CAPACITY: usize = 256;

/// Handle to the moderation database.
///
/// Cheap to clone; clones share the pool, the ledger change feed and the
/// close signal.
#[derive(Clone)]
pub struct ModerationDatabase {
    pool: Pool<Sqlite>,
    ledger_tx: broadcast::Sender<LedgerChange>,
    closed_tx: Arc<watch::Sender<bool>>,
}

impl ModerationDatabase {
    /// Open or create a database at the given path.
    pub async fn open(path: &Path) -> Result<Self, DatabaseError> {
        let pool = open_pool(path).await?;
        let db = Self::with_pool(pool);
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        let pool = open_pool_in_memory().await?;
        let db = Self::with_pool(pool);
        db.run_migrations().await?;
        Ok(db)
    }

    fn with_pool(pool: Pool<Sqlite>) -> Self {
        let (ledger_tx, _) = broadcast::channel(LEDGER_FEED_CAPACITY);
        let (closed_tx, _) = watch::channel(false);
        Self {
            pool,
            ledger_tx,
            closed_tx: Arc::new(closed_tx),
        }
    }

    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;

        info!("Moderation database migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close the pool. Every later query fails with a connection error and
    /// every [`closed_signal`](Self::closed_signal) receiver is woken.
    pub async fn close(&self) {
        self.pool.close().await;
        self.closed_tx.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Watch the attempt ledger. Every successful insert or delete publishes
    /// one [`LedgerChange`].
    pub fn subscribe_ledger(&self) -> broadcast::Receiver<LedgerChange> {
        self.ledger_tx.subscribe()
    }

    /// Flips to `true` once [`close`](Self::close) has run.
    ///
    /// Subscribe before checking [`is_closed`](Self::is_closed) so a close in
    /// between is still observed through `changed()`.
    pub fn closed_signal(&self) -> watch::Receiver<bool> {
        self.closed_tx.subscribe()
    }

    pub(super) fn publish_ledger_change(&self, change: LedgerChange) {
        // No receivers is the common case and not an error.
        let _ = self.ledger_tx.send(change);
    }
}
