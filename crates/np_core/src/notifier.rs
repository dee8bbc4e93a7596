//! Cross-device synchronization of UI state over long polling.
//!
//! One [`UpdateNotifier`] is owned by the server and shared with every
//! handler. Producers mutate the state under a single lock and then wake
//! all waiting pollers; each poller decides against its own watermark
//! whether the new state is something it has not seen yet.
//!
//! Consecutive mutations between two polls coalesce: a poller only ever
//! sees the latest state and the nonce of the latest mutation.
//!
//! The pending meal draft lives in the same state so that queueing an item
//! and leaving meal mode can never interleave: the draft is empty whenever
//! meal mode is off.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info};

use crate::types::{timestamp_now, NewFoodEntry, Snapshot, Timestamp};
use crate::{Error, Result};

pub const MIN_AMOUNT: f64 = 0.0;
pub const MAX_AMOUNT: f64 = 500.0;

/// Smallest step used to keep `last_update` strictly increasing when the
/// wall clock stalls or goes backwards.
const TICK: f64 = 1e-6;

#[derive(Debug)]
struct SharedState {
    last_update: Timestamp,
    nonce: Option<String>,
    current_amount: f64,
    amount_updated_at: Timestamp,
    meal_mode_active: bool,
    meal_items: Vec<NewFoodEntry>,
}

impl SharedState {
    fn publish(&mut self, nonce: Option<String>) -> Timestamp {
        self.last_update = advance(self.last_update);
        self.nonce = nonce;
        self.last_update
    }

    fn is_newer(&self, since: Timestamp, amount_since: Timestamp) -> bool {
        self.last_update > since || self.amount_updated_at > amount_since
    }

    fn snapshot(&self, since: Timestamp, amount_since: Timestamp) -> Snapshot {
        let updated = self.last_update > since;
        Snapshot {
            updated,
            timestamp: self.last_update,
            nonce: if updated { self.nonce.clone() } else { None },
            amount_changed: self.amount_updated_at > amount_since,
            current_amount: self.current_amount,
            meal_mode_active: self.meal_mode_active,
            server_timestamp: timestamp_now(),
        }
    }
}

fn advance(previous: Timestamp) -> Timestamp {
    let now = timestamp_now();
    if now > previous {
        now
    } else {
        previous + TICK
    }
}

/// Checks that an amount lies in `[MIN_AMOUNT, MAX_AMOUNT]`.
pub fn validate_amount(amount: f64) -> Result<f64> {
    if !amount.is_finite() {
        return Err(Error::InvalidAmount("Invalid amount".to_string()));
    }
    if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&amount) {
        return Err(Error::InvalidAmount(format!(
            "Amount must be between {} and {}",
            MIN_AMOUNT, MAX_AMOUNT
        )));
    }
    Ok(amount)
}

/// Reads an amount from a JSON value. Numbers and numeric strings are
/// accepted, everything else is rejected.
pub fn parse_amount(value: Option<&Value>) -> Result<f64> {
    let amount = match value {
        None | Some(Value::Null) => {
            return Err(Error::InvalidAmount("No amount provided".to_string()))
        }
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    let amount = amount.ok_or_else(|| Error::InvalidAmount("Invalid amount".to_string()))?;
    validate_amount(amount)
}

pub struct UpdateNotifier {
    state: Mutex<SharedState>,
    changed: Notify,
}

impl UpdateNotifier {
    pub fn new(initial_amount: f64) -> Result<Self> {
        let initial_amount = validate_amount(initial_amount)?;
        let now = timestamp_now();
        Ok(Self {
            state: Mutex::new(SharedState {
                last_update: now,
                nonce: None,
                current_amount: initial_amount,
                amount_updated_at: now,
                meal_mode_active: false,
                meal_items: Vec::new(),
            }),
            changed: Notify::new(),
        })
    }

    /// Publish that data changed, tagging the change with `nonce`.
    pub async fn mark_updated(&self, nonce: Option<String>) {
        let at = self.state.lock().await.publish(nonce);
        self.changed.notify_waiters();
        debug!(last_update = at, "Marked updated");
    }

    /// Store a new shared amount and publish it. Out of range amounts leave
    /// the state untouched.
    pub async fn set_amount(&self, new_amount: f64, nonce: Option<String>) -> Result<f64> {
        let new_amount = validate_amount(new_amount)?;
        let (old_amount, at) = {
            let mut state = self.state.lock().await;
            let old_amount = state.current_amount;
            state.current_amount = new_amount;
            let at = state.publish(nonce);
            state.amount_updated_at = at;
            (old_amount, at)
        };
        self.changed.notify_waiters();
        info!(old_amount, new_amount, last_update = at, "Amount changed");
        Ok(new_amount)
    }

    /// Switch meal mode. The update carries no nonce so every client,
    /// including the one that made the change, reacts to it.
    ///
    /// Leaving meal mode discards the draft; the discarded items are returned.
    pub async fn set_meal_mode(&self, active: bool) -> Vec<NewFoodEntry> {
        let (discarded, at) = {
            let mut state = self.state.lock().await;
            state.meal_mode_active = active;
            let discarded = if active {
                Vec::new()
            } else {
                std::mem::take(&mut state.meal_items)
            };
            (discarded, state.publish(None))
        };
        self.changed.notify_waiters();
        info!(active, discarded = discarded.len(), last_update = at, "Meal mode changed");
        discarded
    }

    /// Add an item to the meal draft if meal mode is on, publishing the
    /// change with `nonce`. Returns the number of pending items, or `None`
    /// when meal mode is off and nothing was queued.
    pub async fn queue_meal_item(&self, item: NewFoodEntry, nonce: Option<String>) -> Option<usize> {
        let pending = {
            let mut state = self.state.lock().await;
            if !state.meal_mode_active {
                return None;
            }
            state.meal_items.push(item);
            state.publish(nonce);
            state.meal_items.len()
        };
        self.changed.notify_waiters();
        Some(pending)
    }

    /// Meal mode flag and pending items, read together.
    pub async fn meal_draft(&self) -> (bool, Vec<NewFoodEntry>) {
        let state = self.state.lock().await;
        (state.meal_mode_active, state.meal_items.clone())
    }

    /// Wait until something newer than the watermarks is published or
    /// `timeout` elapses, then return the current state.
    pub async fn poll(&self, since: Timestamp, amount_since: Timestamp, timeout: Duration) -> Snapshot {
        // Register interest before reading the state so a publish racing
        // with the check below still wakes us.
        let notified = self.changed.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        {
            let state = self.state.lock().await;
            if state.is_newer(since, amount_since) {
                debug!(since, last_update = state.last_update, "Immediate poll response");
                return state.snapshot(since, amount_since);
            }
        }

        if tokio::time::timeout(timeout, notified).await.is_err() {
            debug!(since, "Poll timed out");
        }

        self.state.lock().await.snapshot(since, amount_since)
    }

    pub async fn current_amount(&self) -> f64 {
        self.state.lock().await.current_amount
    }

    pub async fn meal_mode(&self) -> bool {
        self.state.lock().await.meal_mode_active
    }

    pub async fn last_update(&self) -> Timestamp {
        self.state.lock().await.last_update
    }
}
