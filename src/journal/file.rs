//! JSON-file-backed journal for local/single-node deployment. Grounded on
//! the teacher's `persistence::{save_state, load_state}` (one
//! `serde_json::to_string_pretty` blob written with `std::fs`), expanded
//! from a whole-engine snapshot into per-record CRUD and moved onto
//! `tokio::fs` so a flush never blocks the executor thread.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{JournalQuery, OrderJournal};
use crate::errors::{LadderError, Result};
use crate::types::{OrderRecord, Side};

pub struct FileJournal {
    path: PathBuf,
    records: Mutex<HashMap<String, OrderRecord>>,
}

impl FileJournal {
    /// Loads an existing journal file if present, otherwise starts empty.
    /// Mirrors the teacher's `load_state`: a missing or unparsable file is
    /// logged and treated as a fresh start rather than a startup failure.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<HashMap<String, OrderRecord>>(&content) {
                Ok(records) => {
                    log::info!(
                        "loaded journal from {:?}: {} records",
                        path,
                        records.len()
                    );
                    records
                }
                Err(e) => {
                    log::error!("failed to parse journal file {:?}: {}", path, e);
                    HashMap::new()
                }
            },
            Err(_) => {
                log::info!("journal file {:?} not found, starting empty", path);
                HashMap::new()
            }
        };
        FileJournal {
            path,
            records: Mutex::new(records),
        }
    }

    async fn flush(&self, records: &HashMap<String, OrderRecord>) -> Result<()> {
        let content = serde_json::to_string_pretty(records)
            .map_err(|e| LadderError::transient(format!("journal serialize failed: {e}")))?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| LadderError::transient(format!("journal write failed: {e}")))
    }
}

#[async_trait]
impl OrderJournal for FileJournal {
    async fn query_live(&self, query: &JournalQuery) -> Result<Vec<OrderRecord>> {
        let records = self.records.lock().await;
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
        let mut records = self.records.lock().await;
        records.insert(record.order_id.clone(), record.clone());
        self.flush(&records).await
    }

    async fn find(
        &self,
        pair: &str,
        exchange: &str,
        side: Side,
        ladder_index: i64,
    ) -> Result<Option<OrderRecord>> {
        let records = self.records.lock().await;
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

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn save_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.json");

        let journal = FileJournal::open(&path).await;
        let record = OrderRecord::new_virtual(
            "BTC/USDT",
            "bitfinex",
            Side::Buy,
            0,
            dec!(99),
            dec!(0.1),
            dec!(9.9),
        );
        journal.save(&record).await.unwrap();

        let reopened = FileJournal::open(&path).await;
        let live = reopened
            .query_live(&JournalQuery::ladder("BTC/USDT", "bitfinex"))
            .await
            .unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].order_id, record.order_id);
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent.json");
        let journal = FileJournal::open(&path).await;
        let live = journal
            .query_live(&JournalQuery::ladder("BTC/USDT", "bitfinex"))
            .await
            .unwrap();
        assert!(live.is_empty());
    }
}
