//! Scheduler (spec §4.1): drives the engine's iterations on a randomized
//! interval instead of a fixed tick, so many ladder instances polling the
//! same venue don't thunder together. Grounded on the teacher's `main.rs`
//! spawned-task-per-concern wiring; the fixed 100ms sleep loop there is
//! replaced with spec §4.1's `[min, max]` jittered interval, a reentrancy
//! guard, and an inactive-poll shortcut the teacher has no equivalent for.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

const MIN_INTERVAL_FLOOR_MS: u64 = 10_000;
const INTERVAL_SPREAD_MS: u64 = 5_000;
const INACTIVE_POLL_MS: u64 = 3_000;

/// `[min, max]` tick bounds per spec §4.1:
/// `min = max(10_000ms, open_orders_cache_sec * 1000)`, `max = min + 5_000ms`.
pub fn interval_bounds(open_orders_cache_sec: u64) -> (u64, u64) {
    let min = MIN_INTERVAL_FLOOR_MS.max(open_orders_cache_sec * 1000);
    (min, min + INTERVAL_SPREAD_MS)
}

fn next_delay(bounds: (u64, u64), rng: &mut impl Rng) -> Duration {
    let (min, max) = bounds;
    Duration::from_millis(rng.gen_range(min..=max))
}

/// Drives `tick` at randomized intervals until `shutdown` is set. `tick`
/// returns whether the strategy is currently active; when inactive the
/// scheduler polls every `INACTIVE_POLL_MS` instead of waiting out a full
/// interval, so a re-enabled strategy resumes promptly.
///
/// `previousFinished`-style reentrancy: if `tick` is still running when its
/// own delay would otherwise have elapsed, the next call simply waits for it
/// — callers only ever see one `tick` in flight at a time because this loop
/// awaits completion before computing the next delay.
pub async fn run<F, Fut>(
    open_orders_cache_sec: u64,
    shutdown: Arc<AtomicBool>,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let bounds = interval_bounds(open_orders_cache_sec);
    let mut rng = rand::thread_rng();

    while !shutdown.load(Ordering::Relaxed) {
        let active = tick().await;

        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        let delay = if active {
            next_delay(bounds, &mut rng)
        } else {
            Duration::from_millis(INACTIVE_POLL_MS)
        };
        sleep(delay).await;
    }
}
