//! A concrete Bitfinex-style REST adapter: HMAC-SHA256-authenticated,
//! nonce-sequenced, `BASE/QUOTE` pairs normalized to the venue's
//! concatenated-no-separator form (`BTCUSDT`). Grounded on the teacher's
//! `LiveExchange` (`reqwest::Client`, a cached market/currency table behind
//! a `CACHE_DURATION` guard, `post_info`/`post_exchange` request helpers)
//! with the signing scheme swapped: the teacher signs Hyperliquid EIP-712
//! wallet actions, which does not fit an `apikey/apisecret/apipassword`
//! venue, so the HMAC-SHA256 request signing from
//! `examples/P0W-crypto-strategies` is used instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;

use super::{
    AdapterFeatures, Balance, ExchangeAdapter, MarketInfo, OpenOrder, OrderStatus,
    PlaceOrderResult, Rates,
};
use crate::errors::{LadderError, Result};
use crate::pricing::round_to_significant_digits;
use crate::types::Side;

type HmacSha256 = Hmac<Sha256>;

const CACHE_DURATION: Duration = Duration::from_secs(10);

pub struct BitfinexAdapter {
    base_url: String,
    api_key: String,
    api_secret: String,
    client: reqwest::Client,
    nonce: AtomicU64,
    market_cache: Mutex<Option<(MarketInfo, Instant)>>,
}

impl BitfinexAdapter {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        BitfinexAdapter {
            base_url: "https://api.bitfinex.com".to_string(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            client: reqwest::Client::new(),
            nonce: AtomicU64::new(Self::seed_nonce()),
            market_cache: Mutex::new(None),
        }
    }

    fn seed_nonce() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn next_nonce(&self) -> u64 {
        self.nonce.fetch_add(1, Ordering::SeqCst)
    }

    /// `BASE/QUOTE` -> venue-native concatenated symbol.
    fn venue_pair(pair: &str) -> String {
        pair.replace('/', "").to_uppercase()
    }

    fn sign(&self, path: &str, nonce: u64, body: &str) -> String {
        let payload = format!("/api{path}{nonce}{body}");
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC accepts a key of any size");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    async fn post_signed(&self, path: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        let nonce = self.next_nonce();
        let body_str = body.to_string();
        let signature = self.sign(path, nonce, &body_str);

        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("bfx-apikey", &self.api_key)
            .header("bfx-nonce", nonce.to_string())
            .header("bfx-signature", signature)
            .header("content-type", "application/json")
            .body(body_str)
            .send()
            .await
            .map_err(|e| LadderError::transient(format!("request to {path} failed: {e}")))?;

        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| LadderError::transient(format!("malformed response from {path}: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct WireOrder {
    id: u64,
    #[serde(rename = "price")]
    price: String,
    #[serde(rename = "amount")]
    amount: String,
    #[serde(rename = "amount_orig")]
    amount_orig: String,
    status: String,
}

fn parse_status(raw: &str) -> OrderStatus {
    if raw.contains("EXECUTED") {
        OrderStatus::Filled
    } else if raw.contains("PARTIALLY FILLED") {
        OrderStatus::PartFilled
    } else if raw.contains("CANCELED") {
        OrderStatus::Cancelled
    } else {
        OrderStatus::New
    }
}

fn wire_to_open_order(w: WireOrder) -> OpenOrder {
    let amount: Decimal = w.amount.parse().unwrap_or_default();
    let amount_orig: Decimal = w.amount_orig.parse().unwrap_or_default();
    let side = if amount_orig.is_sign_negative() {
        Side::Sell
    } else {
        Side::Buy
    };
    let amount_left = amount.abs();
    let amount_orig_abs = amount_orig.abs();
    OpenOrder {
        order_id: w.id.to_string(),
        side,
        price: w.price.parse().unwrap_or_default(),
        amount: amount_orig_abs,
        amount_executed: amount_orig_abs - amount_left,
        amount_left,
        status: parse_status(&w.status),
    }
}

#[async_trait]
impl ExchangeAdapter for BitfinexAdapter {
    async fn place_order(
        &self,
        side: Side,
        pair: &str,
        price: Decimal,
        amount: Decimal,
    ) -> Result<PlaceOrderResult> {
        let signed_amount = match side {
            Side::Buy => amount,
            Side::Sell => -amount,
        };
        let body = serde_json::json!({
            "type": "EXCHANGE LIMIT",
            "symbol": format!("t{}", Self::venue_pair(pair)),
            "price": round_to_significant_digits(price, 5).to_string(),
            "amount": signed_amount.to_string(),
        });

        let resp = self.post_signed("/v2/auth/w/order/submit", body).await?;
        let order_id = resp
            .get(4)
            .and_then(|notify| notify.get(4))
            .and_then(|data| data.get(0))
            .and_then(|order| order.get(0))
            .and_then(|id| id.as_u64())
            .map(|id| id.to_string());
        let message = resp
            .get(7)
            .and_then(|status| status.as_str())
            .map(|s| s.to_string());

        Ok(PlaceOrderResult { order_id, message })
    }

    async fn cancel_order(&self, order_id: &str, _side: Side, _pair: &str) -> Result<bool> {
        let id: u64 = order_id
            .parse()
            .map_err(|_| LadderError::BusinessConstraint(format!("non-numeric order id {order_id}")))?;
        let body = serde_json::json!({ "id": id });
        let resp = self.post_signed("/v2/auth/w/order/cancel", body).await?;
        Ok(resp.get(6).and_then(|s| s.as_str()) == Some("SUCCESS"))
    }

    async fn cancel_all_orders(&self, pair: &str) -> Result<bool> {
        let open = self.get_open_orders(pair).await?;
        if open.is_empty() {
            return Ok(true);
        }
        let mut all_ok = true;
        for order in open {
            if !self.cancel_order(&order.order_id, order.side, pair).await? {
                all_ok = false;
            }
        }
        Ok(all_ok)
    }

    async fn get_open_orders(&self, pair: &str) -> Result<Vec<OpenOrder>> {
        let symbol = format!("t{}", Self::venue_pair(pair));
        let body = serde_json::json!({});
        let resp = self
            .post_signed(&format!("/v2/auth/r/orders/{symbol}"), body)
            .await?;
        let wires: Vec<WireOrder> = serde_json::from_value(resp)
            .map_err(|e| LadderError::transient(format!("malformed open-orders response: {e}")))?;
        Ok(wires.into_iter().map(wire_to_open_order).collect())
    }

    async fn get_order_details(&self, order_id: &str, pair: &str) -> Result<Option<OpenOrder>> {
        Ok(self
            .get_open_orders(pair)
            .await?
            .into_iter()
            .find(|o| o.order_id == order_id))
    }

    async fn get_balances(&self, nonzero_only: bool) -> Result<Vec<Balance>> {
        let body = serde_json::json!({});
        let resp = self.post_signed("/v2/auth/r/wallets", body).await?;
        let rows = resp
            .as_array()
            .cloned()
            .ok_or_else(|| LadderError::transient("malformed wallets response"))?;

        let mut balances = Vec::new();
        for row in rows {
            let code = row.get(1).and_then(|v| v.as_str()).unwrap_or("").to_string();
            let total: Decimal = row
                .get(2)
                .and_then(|v| v.as_f64())
                .map(|f| Decimal::try_from(f).unwrap_or_default())
                .unwrap_or_default();
            let free: Decimal = row
                .get(4)
                .and_then(|v| v.as_f64())
                .map(|f| Decimal::try_from(f).unwrap_or_default())
                .unwrap_or(total);
            if nonzero_only && total.is_zero() {
                continue;
            }
            balances.push(Balance {
                frozen: total - free,
                free,
                total,
                code,
            });
        }
        Ok(balances)
    }

    async fn get_rates(&self, pair: &str) -> Result<Rates> {
        let symbol = format!("t{}", Self::venue_pair(pair));
        let resp = self
            .client
            .get(format!("{}/v2/ticker/{}", self.base_url, symbol))
            .send()
            .await
            .map_err(|e| LadderError::transient(format!("ticker request failed: {e}")))?
            .json::<Vec<f64>>()
            .await
            .map_err(|e| LadderError::transient(format!("malformed ticker response: {e}")))?;

        let get = |idx: usize| -> Decimal {
            resp.get(idx)
                .copied()
                .and_then(|f| Decimal::try_from(f).ok())
                .unwrap_or_default()
        };
        Ok(Rates {
            bid: get(0),
            ask: get(2),
            volume: get(7),
            high: get(8),
            low: get(9),
        })
    }

    async fn market_info(&self, pair: &str) -> Result<MarketInfo> {
        if let Some((cached, at)) = self.market_cache.lock().unwrap().clone() {
            if at.elapsed() < CACHE_DURATION {
                return Ok(cached);
            }
        }
        let symbol = Self::venue_pair(pair);
        let resp = self
            .client
            .get(format!(
                "{}/v2/conf/pub:info:pair",
                self.base_url
            ))
            .send()
            .await
            .map_err(|e| LadderError::transient(format!("market info request failed: {e}")))?
            .json::<serde_json::Value>()
            .await
            .map_err(|e| LadderError::transient(format!("malformed market info response: {e}")))?;

        let entry = resp
            .get(0)
            .and_then(|pairs| pairs.as_array())
            .and_then(|pairs| {
                pairs.iter().find(|p| p.get(0).and_then(|s| s.as_str()) == Some(symbol.as_str()))
            });

        let min_amount = entry
            .and_then(|e| e.get(1))
            .and_then(|d| d.get(3))
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<Decimal>().ok())
            .unwrap_or_else(|| Decimal::new(1, 4));
        let max_amount = entry
            .and_then(|e| e.get(1))
            .and_then(|d| d.get(4))
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<Decimal>().ok())
            .unwrap_or_else(|| Decimal::new(1_000_000, 0));

        let info = MarketInfo {
            coin1_decimals: 8,
            coin2_decimals: 5,
            coin1_min_amount: min_amount,
            coin1_max_amount: max_amount,
        };
        *self.market_cache.lock().unwrap() = Some((info.clone(), Instant::now()));
        Ok(info)
    }

    fn features(&self) -> AdapterFeatures {
        AdapterFeatures {
            open_orders_cache_sec: 2,
            order_number_limit: Some(5000),
            supports_order_detail: true,
        }
    }
}
