//! In-memory journal: the test double used by the property/scenario suite
//! and by `SimAdapter`-backed paper trading. Grounded on the teacher's
//! `InternalInventory` in spirit (a plain `HashMap` guarded by a `Mutex`)
//! but keyed per-record rather than per-coin net position.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{JournalQuery, OrderJournal};
use crate::errors::Result;
use crate::types::{OrderRecord, Side};

#[derive(Default)]
pub struct MemoryJournal {
    records: Mutex<HashMap<String, OrderRecord>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        MemoryJournal::default()
    }

    /// Test/debug helper: snapshot every record regardless of `is_processed`.
    pub fn all(&self) -> Vec<OrderRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl OrderJournal for MemoryJournal {
    async fn query_live(&self, query: &JournalQuery) -> Result<Vec<OrderRecord>> {
        let records = self.records.lock().unwrap();
        let mut live: Vec<OrderRecord> = records
            .values()
            .filter(|r| {
                !r.is_processed
                    && r.purpose == query.purpose
                    && r.pair == query.pair
                    && r.exchange == query.exchange
            })
            .cloned()
            .collect();
        live.sort_by_key(|r| (r.side.as_str().to_string(), r.ladder_index));
        Ok(live)
    }

    async fn save(&self, record: &OrderRecord) -> Result<()> {
        self.records
            .lock()
            .unwrap()
            .insert(record.order_id.clone(), record.clone());
        Ok(())
    }

    async fn find(
        &self,
        pair: &str,
        exchange: &str,
        side: Side,
        ladder_index: i64,
    ) -> Result<Option<OrderRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records
            .values()
            .find(|r| {
                !r.is_processed
                    && r.pair == pair
                    && r.exchange == exchange
                    && r.side == side
                    && r.ladder_index == ladder_index
            })
            .cloned())
    }
}
