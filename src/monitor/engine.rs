//! The tick loop

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::stats::{self, Alert, AlertThresholds};
use crate::store::RecordStore;

use super::diff::diff_snapshots;
use super::events::{ChangeEvent, EventRing};

/// Whether the last tick reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorState {
    pub connection: ConnectionState,
    /// Completed ticks, failed ones included.
    pub ticks: u64,
    /// When the store was last successfully read.
    pub last_fetch: Option<DateTime<Utc>>,
    pub records: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub alerts: Vec<Alert>,
    /// Recent events, oldest first.
    pub recent_events: Vec<ChangeEvent>,
    /// Events observed by the tick that produced this state.
    pub last_tick_events: Vec<ChangeEvent>,
}

/// Receives one state per tick. The `monitor` command logs events
/// line by line; `live` redraws a dashboard.
pub trait RenderPort: Send + Sync {
    fn render(&self, state: &MonitorState);
}

/// Periodic full-snapshot diffing against one table.
pub struct ChangeMonitor {
    store: Arc<dyn RecordStore>,
    table: String,
    thresholds: AlertThresholds,
    ring: EventRing,
    previous: Option<Vec<crate::model::Record>>,
    connection: ConnectionState,
    ticks: u64,
    last_fetch: Option<DateTime<Utc>>,
    last_tick_events: Vec<ChangeEvent>,
}

impl ChangeMonitor {
    pub fn new(
        store: Arc<dyn RecordStore>,
        table: impl Into<String>,
        ring_capacity: usize,
        thresholds: AlertThresholds,
    ) -> Self {
        Self {
            store,
            table: table.into(),
            thresholds,
            ring: EventRing::new(ring_capacity),
            previous: None,
            connection: ConnectionState::Disconnected,
            ticks: 0,
            last_fetch: None,
            last_tick_events: Vec::new(),
        }
    }

    /// One fetch+diff cycle. A failed fetch marks the state
    /// disconnected and keeps the previous snapshot; the next tick
    /// retries.
    pub async fn tick(&mut self) -> MonitorState {
        match self.store.fetch_all(&self.table).await {
            Ok(current) => {
                let now = Utc::now();
                let events = match &self.previous {
                    Some(previous) => diff_snapshots(previous, &current, now),
                    None => Vec::new(),
                };
                for event in &events {
                    self.ring.push(event.clone());
                }
                self.last_tick_events = events;
                self.previous = Some(current);
                self.connection = ConnectionState::Connected;
                self.last_fetch = Some(now);
            }
            Err(_) => {
                self.connection = ConnectionState::Disconnected;
                self.last_tick_events = Vec::new();
            }
        }

        self.ticks += 1;
        self.state()
    }

    /// State assembled from the last good snapshot.
    pub fn state(&self) -> MonitorState {
        let records = self.previous.as_deref().unwrap_or(&[]);
        MonitorState {
            connection: self.connection,
            ticks: self.ticks,
            last_fetch: self.last_fetch,
            records: records.len(),
            by_status: stats::count_by_status(records),
            by_priority: stats::count_by_priority(records),
            alerts: stats::alerts(records, &self.thresholds, Utc::now()),
            recent_events: self.ring.to_vec(),
            last_tick_events: self.last_tick_events.clone(),
        }
    }

    /// Runs ticks on a fixed interval until the stop signal flips to
    /// true (or its sender goes away). Each tick is awaited to
    /// completion before the next is scheduled.
    pub async fn run(
        &mut self,
        interval: Duration,
        render: &dyn RenderPort,
        mut stop: watch::Receiver<bool>,
    ) {
        loop {
            let state = self.tick().await;
            render.render(&state);

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
            if *stop.borrow() {
                break;
            }
        }
    }
}
