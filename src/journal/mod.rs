//! Order Journal contract (spec §4.8): a persistent document store for
//! ladder order records, queried and written per-record. Two concrete
//! implementations are provided: an in-memory store for tests and the
//! simulated adapter's paper-trading mode, and a JSON-file-backed store for
//! single-node deployment — expanded from the teacher's single whole-engine
//! `persistence::{save_state, load_state}` blob into per-record CRUD.

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::errors::Result;
use crate::types::{OrderRecord, Side};

/// Selects the live (non-processed) ladder orders for one market.
#[derive(Debug, Clone)]
pub struct JournalQuery {
    pub purpose: String,
    pub pair: String,
    pub exchange: String,
}

impl JournalQuery {
    pub fn ladder(pair: impl Into<String>, exchange: impl Into<String>) -> Self {
        JournalQuery {
            purpose: "ladder".to_string(),
            pair: pair.into(),
            exchange: exchange.into(),
        }
    }
}

#[async_trait]
pub trait OrderJournal: Send + Sync {
    /// Returns every record at `query` with `is_processed == false`, ordered
    /// by `(side, ladder_index)` so callers can walk a side ascending
    /// without re-sorting.
    async fn query_live(&self, query: &JournalQuery) -> Result<Vec<OrderRecord>>;

    /// Whole-record write, atomic per record. Replaces any existing record
    /// sharing the same `order_id`.
    async fn save(&self, record: &OrderRecord) -> Result<()>;

    /// Convenience accessor used by the Reconciler's previous-index lookup.
    async fn find(
        &self,
        pair: &str,
        exchange: &str,
        side: Side,
        ladder_index: i64,
    ) -> Result<Option<OrderRecord>>;
}
